//! Persistence of registered credentials.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coset::{iana, CoseKey};
use passkey_rp_types::{
    webauthn::{AuthenticatorTransport, PublicKeyCredentialDescriptor},
    Bytes,
};
use uuid::Uuid;

use crate::errors::StoreError;

/// One registered authenticator for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    /// System-generated surrogate identifier. Not the authenticator's
    /// credential ID.
    pub id: Uuid,

    /// The authenticator-chosen credential ID, globally unique across all
    /// accounts.
    pub credential_id: Bytes,

    /// The user handle of the owning account. The owner exclusively
    /// controls rename and delete.
    pub user_handle: Bytes,

    /// The credential public key in COSE form, `alg` included.
    pub public_key: CoseKey,

    /// The key's COSE algorithm, recorded at registration and used to pick
    /// the verification routine at authentication.
    pub algorithm: iana::Algorithm,

    /// Last observed value of the authenticator's signature counter; zero
    /// when the authenticator does not implement counters.
    pub sign_count: u32,

    /// Whether the credential was backed up (synced) at registration.
    pub backed_up: bool,

    /// Transport hints reported by the client at registration, echoed back
    /// in allow lists.
    pub transports: Option<Vec<AuthenticatorTransport>>,

    /// User-assigned label, mutable through the credential manager.
    pub name: Option<String>,

    /// Registration time.
    pub created_at: DateTime<Utc>,

    /// Completion time of the most recent authentication ceremony.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// The descriptor form used in exclusion and allow lists.
    pub fn descriptor(&self) -> PublicKeyCredentialDescriptor {
        PublicKeyCredentialDescriptor::public_key(
            self.credential_id.clone(),
            self.transports.clone(),
        )
    }
}

/// Storage for registered credentials.
///
/// Implementations back this with whatever holds the account data; the
/// in-memory [`MemoryCredentialStore`] serves single-process deployments
/// and tests. Fallible backends surface [`StoreError::Unavailable`] after a
/// bounded timeout rather than blocking indefinitely.
#[async_trait::async_trait]
pub trait CredentialStore {
    /// Find a credential by its authenticator-chosen ID, whoever owns it.
    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<CredentialRecord>, StoreError>;

    /// All credentials of one account, ascending by creation time.
    async fn find_by_user(&self, user_handle: &[u8])
        -> Result<Vec<CredentialRecord>, StoreError>;

    /// Persist a newly registered credential.
    ///
    /// Fails with [`StoreError::DuplicateCredentialId`] when any account
    /// already holds the same `credential_id`; backends should enforce this
    /// with a uniqueness constraint, not a read-then-write.
    async fn save(&mut self, record: CredentialRecord) -> Result<(), StoreError>;

    /// Commit a successful authentication: advance the signature counter
    /// and stamp `last_used_at`.
    ///
    /// The counter condition must be checked and applied atomically (one
    /// transaction): the write only happens when `sign_count` is strictly
    /// greater than the stored value, or both are zero (counter-less
    /// authenticators). A losing update fails with
    /// [`StoreError::SignCountRegression`] so racing assertions replaying
    /// one captured counter cannot both commit.
    async fn record_authentication(
        &mut self,
        credential_id: &[u8],
        sign_count: u32,
        used_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Set the user-assigned label of a credential owned by `user_handle`.
    ///
    /// Fails with [`StoreError::NotFound`] when no such credential exists
    /// *or* it belongs to someone else; callers cannot tell these apart.
    async fn rename(
        &mut self,
        user_handle: &[u8],
        credential_id: &[u8],
        name: String,
    ) -> Result<CredentialRecord, StoreError>;

    /// Remove a credential owned by `user_handle`. Deleting the last
    /// credential of an account is allowed; minimum-credential policy is a
    /// product decision above this crate.
    async fn delete(&mut self, user_handle: &[u8], credential_id: &[u8])
        -> Result<(), StoreError>;
}

/// In-memory credential store keyed by credential ID.
pub type MemoryCredentialStore = HashMap<Bytes, CredentialRecord>;

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.get(&Bytes::from(credential_id)).cloned())
    }

    async fn find_by_user(
        &self,
        user_handle: &[u8],
    ) -> Result<Vec<CredentialRecord>, StoreError> {
        let mut records: Vec<CredentialRecord> = self
            .values()
            .filter(|record| record.user_handle.as_slice() == user_handle)
            .cloned()
            .collect();
        // Uuid tiebreak keeps the order deterministic for same-instant rows.
        records.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(records)
    }

    async fn save(&mut self, record: CredentialRecord) -> Result<(), StoreError> {
        if self.contains_key(&record.credential_id) {
            return Err(StoreError::DuplicateCredentialId);
        }
        HashMap::insert(self, record.credential_id.clone(), record);
        Ok(())
    }

    async fn record_authentication(
        &mut self,
        credential_id: &[u8],
        sign_count: u32,
        used_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self
            .get_mut(&Bytes::from(credential_id))
            .ok_or(StoreError::NotFound)?;
        let counterless = sign_count == 0 && record.sign_count == 0;
        if !counterless && sign_count <= record.sign_count {
            return Err(StoreError::SignCountRegression);
        }
        record.sign_count = sign_count;
        record.last_used_at = Some(used_at);
        Ok(())
    }

    async fn rename(
        &mut self,
        user_handle: &[u8],
        credential_id: &[u8],
        name: String,
    ) -> Result<CredentialRecord, StoreError> {
        let record = self
            .get_mut(&Bytes::from(credential_id))
            .filter(|record| record.user_handle.as_slice() == user_handle)
            .ok_or(StoreError::NotFound)?;
        record.name = Some(name);
        Ok(record.clone())
    }

    async fn delete(
        &mut self,
        user_handle: &[u8],
        credential_id: &[u8],
    ) -> Result<(), StoreError> {
        let owned = self
            .get(&Bytes::from(credential_id))
            .is_some_and(|record| record.user_handle.as_slice() == user_handle);
        if !owned {
            return Err(StoreError::NotFound);
        }
        self.remove(&Bytes::from(credential_id));
        Ok(())
    }
}

#[cfg(any(feature = "tokio", test))]
#[async_trait::async_trait]
impl<S: CredentialStore + Send + Sync> CredentialStore for std::sync::Arc<tokio::sync::Mutex<S>> {
    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<CredentialRecord>, StoreError> {
        self.lock().await.find_by_credential_id(credential_id).await
    }

    async fn find_by_user(
        &self,
        user_handle: &[u8],
    ) -> Result<Vec<CredentialRecord>, StoreError> {
        self.lock().await.find_by_user(user_handle).await
    }

    async fn save(&mut self, record: CredentialRecord) -> Result<(), StoreError> {
        self.lock().await.save(record).await
    }

    async fn record_authentication(
        &mut self,
        credential_id: &[u8],
        sign_count: u32,
        used_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.lock()
            .await
            .record_authentication(credential_id, sign_count, used_at)
            .await
    }

    async fn rename(
        &mut self,
        user_handle: &[u8],
        credential_id: &[u8],
        name: String,
    ) -> Result<CredentialRecord, StoreError> {
        self.lock()
            .await
            .rename(user_handle, credential_id, name)
            .await
    }

    async fn delete(
        &mut self,
        user_handle: &[u8],
        credential_id: &[u8],
    ) -> Result<(), StoreError> {
        self.lock().await.delete(user_handle, credential_id).await
    }
}

#[cfg(test)]
mod tests {
    use coset::CoseKeyBuilder;
    use passkey_rp_types::rand::random_vec;

    use super::*;

    fn record_for(user: &[u8], credential_id: Vec<u8>) -> CredentialRecord {
        let key = CoseKeyBuilder::new_ec2_pub_key(
            iana::EllipticCurve::P_256,
            random_vec(32),
            random_vec(32),
        )
        .algorithm(iana::Algorithm::ES256)
        .build();
        CredentialRecord {
            id: Uuid::new_v4(),
            credential_id: credential_id.into(),
            user_handle: user.to_vec().into(),
            public_key: key,
            algorithm: iana::Algorithm::ES256,
            sign_count: 0,
            backed_up: false,
            transports: None,
            name: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn save_rejects_duplicate_credential_ids_across_users() {
        let mut store = MemoryCredentialStore::new();
        store.save(record_for(b"alice", vec![1; 16])).await.unwrap();

        let err = store
            .save(record_for(b"bob", vec![1; 16]))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateCredentialId);
    }

    #[tokio::test]
    async fn find_by_user_is_ordered_and_scoped() {
        let mut store = MemoryCredentialStore::new();
        let mut first = record_for(b"alice", vec![1; 16]);
        let mut second = record_for(b"alice", vec![2; 16]);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        // Insert newest first to prove ordering comes from the store.
        store.save(second.clone()).await.unwrap();
        store.save(first.clone()).await.unwrap();
        store.save(record_for(b"bob", vec![3; 16])).await.unwrap();

        let records = store.find_by_user(b"alice").await.unwrap();
        assert_eq!(records, vec![first, second]);
    }

    #[tokio::test]
    async fn record_authentication_enforces_monotonicity_atomically() {
        let mut store = MemoryCredentialStore::new();
        let mut record = record_for(b"alice", vec![7; 16]);
        record.sign_count = 5;
        store.save(record).await.unwrap();
        let now = Utc::now();

        assert_eq!(
            store.record_authentication(&[7; 16], 5, now).await,
            Err(StoreError::SignCountRegression)
        );
        assert_eq!(
            store.record_authentication(&[7; 16], 4, now).await,
            Err(StoreError::SignCountRegression)
        );
        store.record_authentication(&[7; 16], 6, now).await.unwrap();

        let stored = store
            .find_by_credential_id(&[7; 16])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sign_count, 6);
        assert_eq!(stored.last_used_at, Some(now));
    }

    #[tokio::test]
    async fn counterless_authenticators_stay_at_zero() {
        let mut store = MemoryCredentialStore::new();
        store.save(record_for(b"alice", vec![9; 16])).await.unwrap();

        store
            .record_authentication(&[9; 16], 0, Utc::now())
            .await
            .unwrap();
        let stored = store
            .find_by_credential_id(&[9; 16])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sign_count, 0);
        assert!(stored.last_used_at.is_some());
    }

    #[tokio::test]
    async fn rename_and_delete_are_owner_scoped() {
        let mut store = MemoryCredentialStore::new();
        store.save(record_for(b"alice", vec![4; 16])).await.unwrap();

        assert_eq!(
            store
                .rename(b"bob", &[4; 16], "work laptop".to_owned())
                .await,
            Err(StoreError::NotFound)
        );
        let renamed = store
            .rename(b"alice", &[4; 16], "work laptop".to_owned())
            .await
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("work laptop"));

        assert_eq!(
            store.delete(b"bob", &[4; 16]).await,
            Err(StoreError::NotFound)
        );
        store.delete(b"alice", &[4; 16]).await.unwrap();
        assert_eq!(store.find_by_credential_id(&[4; 16]).await, Ok(None));
    }
}
