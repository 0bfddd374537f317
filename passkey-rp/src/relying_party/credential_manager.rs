//! Credential management: the operations an authenticated user performs on
//! their own registered passkeys.

use crate::{
    challenge_store::ChallengeStore,
    credential_store::{CredentialRecord, CredentialStore},
    errors::CredentialManagerError,
    user_lookup::{RpUser, UserLookup},
};

use super::RelyingParty;

impl<C, S, U> RelyingParty<C, S, U>
where
    C: ChallengeStore + Send + Sync,
    S: CredentialStore + Send + Sync,
    U: UserLookup + Send + Sync,
{
    /// All of `user`'s credentials, ascending by creation time.
    pub async fn list_credentials(
        &self,
        user: &RpUser,
    ) -> Result<Vec<CredentialRecord>, CredentialManagerError> {
        Ok(self.credentials.find_by_user(&user.id).await?)
    }

    /// Change the user-assigned label of one of `user`'s credentials.
    ///
    /// Fails with [`CredentialManagerError::NotFound`] when `user` owns no
    /// credential with that ID; whether it exists under another account is
    /// not revealed.
    pub async fn rename_credential(
        &mut self,
        user: &RpUser,
        credential_id: &[u8],
        name: String,
    ) -> Result<CredentialRecord, CredentialManagerError> {
        Ok(self
            .credentials
            .rename(&user.id, credential_id, name)
            .await?)
    }

    /// Remove one of `user`'s credentials.
    ///
    /// Deleting the last credential is allowed; whether an account must
    /// keep a sign-in method is a product decision made above this crate.
    pub async fn delete_credential(
        &mut self,
        user: &RpUser,
        credential_id: &[u8],
    ) -> Result<(), CredentialManagerError> {
        Ok(self.credentials.delete(&user.id, credential_id).await?)
    }
}
