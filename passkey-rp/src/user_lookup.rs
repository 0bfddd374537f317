//! The seam to the surrounding account system.

use passkey_rp_types::{webauthn::PublicKeyCredentialUserEntity, Bytes};

use crate::errors::StoreError;

/// The slice of an account this crate needs: the opaque webauthn user
/// handle plus the display fields that go into creation options.
///
/// The handle must not carry personally identifying information; account
/// systems typically mint a random 16–64 byte value per user and keep the
/// email-to-handle mapping to themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpUser {
    /// The opaque user handle, at most 64 bytes.
    pub id: Bytes,

    /// A human-palatable account identifier, e.g. an email address.
    pub name: String,

    /// A human-palatable display name.
    pub display_name: String,
}

impl RpUser {
    /// The user entity form embedded in credential creation options.
    pub fn entity(&self) -> PublicKeyCredentialUserEntity {
        PublicKeyCredentialUserEntity {
            id: self.id.clone(),
            name: self.name.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Read-only account resolution, owned by the surrounding system.
///
/// Ceremonies use it to resolve authentication hints and to return the
/// owning user after a verified assertion; session minting stays with the
/// caller.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
#[async_trait::async_trait]
pub trait UserLookup {
    /// Resolve a user handle to an account.
    async fn find_by_id(&self, user_handle: &[u8]) -> Result<Option<RpUser>, StoreError>;

    /// Resolve an email address to an account.
    async fn find_by_email(&self, email: &str) -> Result<Option<RpUser>, StoreError>;
}

#[cfg(any(test, feature = "testable"))]
impl MockUserLookup {
    /// A mock directory holding exactly one account.
    pub fn single_user(user: RpUser, email: &str) -> Self {
        let mut mock = MockUserLookup::new();
        let email = email.to_owned();
        let by_email = user.clone();
        mock.expect_find_by_email()
            .returning(move |candidate| Ok((candidate == email).then(|| by_email.clone())));
        mock.expect_find_by_id()
            .returning(move |handle| Ok((handle == user.id.as_slice()).then(|| user.clone())));
        mock
    }

    /// A mock directory that knows nobody.
    pub fn empty() -> Self {
        let mut mock = MockUserLookup::new();
        mock.expect_find_by_email().returning(|_| Ok(None));
        mock.expect_find_by_id().returning(|_| Ok(None));
        mock
    }
}
