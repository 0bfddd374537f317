//! Issuance and single-use consumption of ceremony challenges.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use passkey_rp_types::{rand::random_vec, Bytes};

use crate::errors::ChallengeError;

/// Length of the random challenge value. 32 bytes regardless of caller; the
/// spec floor is 16 and more costs nothing.
const VALUE_LEN: usize = 32;

/// Length of the opaque challenge handle returned to clients.
const ID_LEN: usize = 16;

/// Which ceremony a challenge may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePurpose {
    /// Issued by `begin_registration`, consumable by `verify_registration`.
    Registration,
    /// Issued by `begin_authentication`, consumable by
    /// `verify_authentication`.
    Authentication,
}

/// One issued, not-yet-consumed challenge.
///
/// The `id` is the handle clients echo back; the `value` is what ends up in
/// client data under the authenticator's signature. Clients never supply
/// challenge bytes directly, they only name a server-side entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    /// Opaque random handle, distinct from the value.
    pub id: Bytes,
    /// The random bytes the client must sign over.
    pub value: Bytes,
    /// The ceremony this challenge may complete.
    pub purpose: ChallengePurpose,
    /// The user this ceremony is bound to; `None` for username-less
    /// (discoverable credential) authentication.
    pub user_handle: Option<Bytes>,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Past this instant the challenge only fails.
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// Issue a fresh challenge from the thread-local CSPRNG.
    pub fn issue(purpose: ChallengePurpose, user_handle: Option<Bytes>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            id: random_vec(ID_LEN).into(),
            value: random_vec(VALUE_LEN).into(),
            purpose,
            user_handle,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// Whether the challenge is past its lifetime at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Storage for issued challenges.
///
/// `take` is the consumption primitive and must be atomic: under concurrent
/// requests racing on one id, at most one caller may receive the challenge.
/// For the in-memory store `&mut self` gives that for free; transactional
/// backends should delete-returning or update a consumed marker in one
/// statement.
#[async_trait::async_trait]
pub trait ChallengeStore {
    /// Save a freshly issued challenge.
    async fn save(&mut self, challenge: Challenge) -> Result<(), ChallengeError>;

    /// Remove and return the challenge named by `id`.
    ///
    /// An expired entry is still removed but returned as
    /// [`ChallengeError::Expired`]; unknown or already-taken ids are
    /// [`ChallengeError::NotFound`].
    async fn take(&mut self, id: &[u8]) -> Result<Challenge, ChallengeError>;

    /// Drop expired entries, returning how many went. Stores are expected
    /// to run this opportunistically; `take` stays correct without it.
    async fn prune_expired(&mut self) -> Result<usize, ChallengeError>;
}

/// In-memory challenge store.
///
/// Suitable for single-process deployments and tests.
pub type MemoryChallengeStore = HashMap<Bytes, Challenge>;

#[async_trait::async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn save(&mut self, challenge: Challenge) -> Result<(), ChallengeError> {
        HashMap::insert(self, challenge.id.clone(), challenge);
        Ok(())
    }

    async fn take(&mut self, id: &[u8]) -> Result<Challenge, ChallengeError> {
        let challenge = self
            .remove(&Bytes::from(id))
            .ok_or(ChallengeError::NotFound)?;
        if challenge.is_expired_at(Utc::now()) {
            return Err(ChallengeError::Expired);
        }
        Ok(challenge)
    }

    async fn prune_expired(&mut self) -> Result<usize, ChallengeError> {
        let now = Utc::now();
        let before = self.len();
        self.retain(|_, challenge| !challenge.is_expired_at(now));
        Ok(before - self.len())
    }
}

#[cfg(any(feature = "tokio", test))]
#[async_trait::async_trait]
impl<S: ChallengeStore + Send + Sync> ChallengeStore for std::sync::Arc<tokio::sync::Mutex<S>> {
    async fn save(&mut self, challenge: Challenge) -> Result<(), ChallengeError> {
        self.lock().await.save(challenge).await
    }

    async fn take(&mut self, id: &[u8]) -> Result<Challenge, ChallengeError> {
        self.lock().await.take(id).await
    }

    async fn prune_expired(&mut self) -> Result<usize, ChallengeError> {
        self.lock().await.prune_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn take_succeeds_exactly_once() {
        let mut store = MemoryChallengeStore::new();
        let challenge = Challenge::issue(
            ChallengePurpose::Registration,
            Some(Bytes::from(vec![1, 2, 3])),
            Duration::minutes(5),
        );
        let id = challenge.id.clone();
        store.save(challenge.clone()).await.unwrap();

        assert_eq!(store.take(&id).await, Ok(challenge));
        assert_eq!(store.take(&id).await, Err(ChallengeError::NotFound));
    }

    #[tokio::test]
    async fn expired_challenge_fails_even_on_first_take() {
        let mut store = MemoryChallengeStore::new();
        let challenge =
            Challenge::issue(ChallengePurpose::Authentication, None, Duration::minutes(-1));
        let id = challenge.id.clone();
        store.save(challenge).await.unwrap();

        assert_eq!(store.take(&id).await, Err(ChallengeError::Expired));
        // And it was consumed, not resurrected.
        assert_eq!(store.take(&id).await, Err(ChallengeError::NotFound));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let mut store = MemoryChallengeStore::new();
        assert_eq!(store.take(b"missing").await, Err(ChallengeError::NotFound));
    }

    #[tokio::test]
    async fn prune_removes_only_expired_entries() {
        let mut store = MemoryChallengeStore::new();
        let live =
            Challenge::issue(ChallengePurpose::Registration, None, Duration::minutes(5));
        let dead =
            Challenge::issue(ChallengePurpose::Registration, None, Duration::minutes(-5));
        let live_id = live.id.clone();
        store.save(live).await.unwrap();
        store.save(dead).await.unwrap();

        assert_eq!(store.prune_expired().await, Ok(1));
        assert!(store.take(&live_id).await.is_ok());
    }

    #[tokio::test]
    async fn issued_values_are_fresh_and_sized() {
        let a = Challenge::issue(ChallengePurpose::Registration, None, Duration::minutes(5));
        let b = Challenge::issue(ChallengePurpose::Registration, None, Duration::minutes(5));
        assert_eq!(a.value.len(), 32);
        assert_eq!(a.id.len(), 16);
        assert_ne!(a.value, b.value);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn shared_store_consumes_once_across_clones() {
        let store = std::sync::Arc::new(tokio::sync::Mutex::new(MemoryChallengeStore::new()));
        let challenge =
            Challenge::issue(ChallengePurpose::Authentication, None, Duration::minutes(5));
        let id = challenge.id.clone();

        let mut writer = store.clone();
        writer.save(challenge).await.unwrap();

        let mut first = store.clone();
        let mut second = store;
        assert!(first.take(&id).await.is_ok());
        assert_eq!(second.take(&id).await, Err(ChallengeError::NotFound));
    }
}
