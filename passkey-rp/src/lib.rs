//! # Passkey RP
//!
//! A webauthn [Relying Party] ceremony core supporting passkeys.
//!
//! This crate owns the server side of the two webauthn ceremonies —
//! issuing challenges, verifying attestation and assertion responses, and
//! managing the resulting credentials — behind three pluggable seams:
//! a [`ChallengeStore`], a [`CredentialStore`] and a [`UserLookup`]. The
//! [`RelyingParty`] struct wires those together with an explicit
//! [`RpConfig`], so several relying parties with different origins can run
//! (and be tested) in one process.
//!
//! Transport concerns — HTTP routing, status-code mapping, session token
//! minting — stay with the caller; every operation returns a typed error
//! kind the transport layer can branch on.
//!
//! [Relying Party]: https://w3c.github.io/webauthn/#relying-party

mod challenge_store;
mod config;
mod credential_store;
mod errors;
mod relying_party;
mod user_lookup;

use coset::{
    iana::{self, EnumI64},
    CoseKey,
};
use p256::{
    ecdsa::VerifyingKey,
    elliptic_curve::{generic_array::GenericArray, sec1::FromEncodedPoint},
    EncodedPoint, PublicKey,
};

pub use self::{
    challenge_store::{Challenge, ChallengePurpose, ChallengeStore, MemoryChallengeStore},
    config::RpConfig,
    credential_store::{CredentialRecord, CredentialStore, MemoryCredentialStore},
    errors::{
        AuthenticationError, ChallengeError, CoseKeyError, CredentialManagerError,
        RegistrationError, StoreError,
    },
    relying_party::{AuthenticationOptions, RegistrationOptions, RelyingParty},
    user_lookup::{RpUser, UserLookup},
};

#[cfg(any(test, feature = "testable"))]
pub use self::user_lookup::MockUserLookup;

/// Convert a COSE public key into a [`VerifyingKey`] for ES256 signature
/// checks.
///
/// Registration runs this before a record is stored, so every stored key is
/// known to verify; authentication runs it again on the stored key.
pub fn verifying_key_from_cose_key(key: &CoseKey) -> Result<VerifyingKey, CoseKeyError> {
    if !matches!(
        key.alg,
        Some(coset::RegisteredLabelWithPrivate::Assigned(
            iana::Algorithm::ES256
        ))
    ) {
        return Err(CoseKeyError::UnsupportedAlgorithm);
    }
    if !matches!(
        key.kty,
        coset::RegisteredLabel::Assigned(iana::KeyType::EC2)
    ) {
        return Err(CoseKeyError::InvalidKey);
    }

    let (mut x, mut y) = (None, None);
    for (label, value) in &key.params {
        let coset::Label::Int(i) = label else {
            continue;
        };
        match iana::Ec2KeyParameter::from_i64(*i) {
            Some(iana::Ec2KeyParameter::Crv) => {
                let expected = iana::EllipticCurve::P_256.to_i64();
                if value.as_integer() != Some(expected.into()) {
                    return Err(CoseKeyError::InvalidKey);
                }
            }
            Some(iana::Ec2KeyParameter::X) => {
                if value.as_bytes().and_then(|v| x.replace(v)).is_some() {
                    log::warn!("COSE key has multiple entries for the X coordinate");
                }
            }
            Some(iana::Ec2KeyParameter::Y) => {
                if value.as_bytes().and_then(|v| y.replace(v)).is_some() {
                    log::warn!("COSE key has multiple entries for the Y coordinate");
                }
            }
            _ => (),
        }
    }
    let (Some(x), Some(y)) = (x, y) else {
        return Err(CoseKeyError::InvalidKey);
    };
    if x.len() != 32 || y.len() != 32 {
        return Err(CoseKeyError::InvalidKey);
    }

    let point = EncodedPoint::from_affine_coordinates(
        GenericArray::from_slice(x.as_slice()),
        GenericArray::from_slice(y.as_slice()),
        false,
    );
    let Some(public_key): Option<PublicKey> = PublicKey::from_encoded_point(&point).into() else {
        return Err(CoseKeyError::InvalidKey);
    };
    Ok(VerifyingKey::from(&public_key))
}
