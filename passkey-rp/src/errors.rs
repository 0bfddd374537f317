//! Error kinds for ceremony and store operations.
//!
//! Callers branch on kinds, so every operation family gets its own enum
//! rather than one stringly error type. Conversions between the layers live
//! here too, keeping the mapping policy in one place.

use serde::Serialize;
use typeshare::typeshare;

use passkey_rp_types::ctap2::ParseError;

/// Failures raised by a [`crate::ChallengeStore`].
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ChallengeError {
    /// The challenge id is unknown or was already consumed.
    NotFound,
    /// The challenge existed but its lifetime had elapsed. It is consumed
    /// regardless; retrying with the same id yields [`Self::NotFound`].
    Expired,
    /// The backing store could not answer; the challenge was not consumed
    /// and the operation may be retried.
    StorageUnavailable,
}

/// Failures raised by a [`crate::CredentialStore`] or [`crate::UserLookup`].
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum StoreError {
    /// The backing store could not answer within its deadline. Retryable.
    Unavailable,
    /// An insert collided with an existing credential ID, any owner.
    DuplicateCredentialId,
    /// A conditional sign-count update lost: the stored counter was already
    /// at or past the presented value.
    SignCountRegression,
    /// The addressed record does not exist (or is not owned by the caller,
    /// which must stay indistinguishable).
    NotFound,
}

/// Failures converting a COSE public key into a usable verifying key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CoseKeyError {
    /// The key's algorithm is not one this crate can verify.
    UnsupportedAlgorithm,
    /// The key is structurally broken or not a point on its stated curve.
    InvalidKey,
}

/// Terminal outcomes of a registration ceremony.
///
/// Every failure consumes the ceremony's challenge; there is no retry with
/// the same challenge. Only [`Self::StorageUnavailable`] is retryable, with
/// a fresh ceremony.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum RegistrationError {
    /// The challenge was unknown, expired, already consumed, or bound to a
    /// different user.
    ChallengeInvalid,
    /// The client data carried the wrong ceremony type, challenge or origin.
    ClientDataMismatch,
    /// The attestation object or its authenticator data failed to decode,
    /// or an accepted statement failed its own verification.
    MalformedAttestation,
    /// The authenticator data flags or RP ID binding failed policy.
    AuthenticatorDataInvalid,
    /// The attestation statement format is outside the accepted policy.
    UnsupportedAttestationFormat,
    /// The credential's public key algorithm is not in the configured list.
    UnsupportedAlgorithm,
    /// The credential ID already exists, for any account.
    CredentialAlreadyRegistered,
    /// A backing store could not answer. Retryable, without leaking whether
    /// any credential exists.
    StorageUnavailable,
}

impl From<ChallengeError> for RegistrationError {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::NotFound | ChallengeError::Expired => Self::ChallengeInvalid,
            ChallengeError::StorageUnavailable => Self::StorageUnavailable,
        }
    }
}

impl From<StoreError> for RegistrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateCredentialId => Self::CredentialAlreadyRegistered,
            _ => Self::StorageUnavailable,
        }
    }
}

impl From<ParseError> for RegistrationError {
    fn from(_: ParseError) -> Self {
        Self::MalformedAttestation
    }
}

impl From<CoseKeyError> for RegistrationError {
    fn from(err: CoseKeyError) -> Self {
        match err {
            CoseKeyError::UnsupportedAlgorithm => Self::UnsupportedAlgorithm,
            CoseKeyError::InvalidKey => Self::MalformedAttestation,
        }
    }
}

/// Terminal outcomes of an authentication ceremony.
///
/// As with registration, every failure consumes the challenge and only
/// [`Self::StorageUnavailable`] is retryable.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum AuthenticationError {
    /// The challenge was unknown, expired, already consumed, or scoped to a
    /// user who does not own the presented credential.
    ChallengeInvalid,
    /// The client data carried the wrong ceremony type, challenge or origin.
    ClientDataMismatch,
    /// The authenticator data failed to decode, or its flags or RP ID
    /// binding failed policy.
    AuthenticatorDataInvalid,
    /// No stored credential matches the presented credential ID. Also used
    /// when ownership checks fail, so existence is never leaked.
    CredentialNotFound,
    /// The assertion signature did not verify against the stored key.
    SignatureInvalid,
    /// The signature verified but the counter did not advance: the private
    /// key has likely been cloned. Security critical; always terminal.
    PossibleCloneDetected,
    /// The account hint resolved to nobody with registered passkeys. The
    /// one deliberate existence leak of this API, confined to
    /// [`crate::RelyingParty::begin_authentication`].
    NoPasskeysRegistered,
    /// A backing store could not answer. Retryable.
    StorageUnavailable,
}

impl From<ChallengeError> for AuthenticationError {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::NotFound | ChallengeError::Expired => Self::ChallengeInvalid,
            ChallengeError::StorageUnavailable => Self::StorageUnavailable,
        }
    }
}

impl From<StoreError> for AuthenticationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SignCountRegression => Self::PossibleCloneDetected,
            StoreError::NotFound => Self::CredentialNotFound,
            _ => Self::StorageUnavailable,
        }
    }
}

impl From<ParseError> for AuthenticationError {
    fn from(_: ParseError) -> Self {
        Self::AuthenticatorDataInvalid
    }
}

impl From<CoseKeyError> for AuthenticationError {
    fn from(_: CoseKeyError) -> Self {
        // A stored key that stopped converting is an integrity fault; treat
        // it as a failed verification rather than leaking store internals.
        Self::SignatureInvalid
    }
}

/// Outcomes of the credential management operations.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CredentialManagerError {
    /// The caller owns no credential with that ID.
    NotFound,
    /// A backing store could not answer. Retryable.
    StorageUnavailable,
}

impl From<StoreError> for CredentialManagerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            _ => Self::StorageUnavailable,
        }
    }
}
