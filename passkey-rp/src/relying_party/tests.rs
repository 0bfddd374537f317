use chrono::Duration;
use ciborium::{cbor, value::Value};
use coset::{iana, CoseKey, CoseKeyBuilder};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use url::Url;
use uuid::Uuid;

use passkey_rp_types::{
    crypto,
    ctap2::{AttestedCredentialData, AuthenticatorData, Flags},
    encoding,
    rand::random_vec,
    webauthn::{
        encode_attestation_object, AttestationFormat, AuthenticatedPublicKeyCredential,
        AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorTransport,
        CreatedPublicKeyCredential, PublicKeyCredential, PublicKeyCredentialType,
    },
    Bytes,
};

use crate::{
    credential_store::CredentialStore,
    errors::{AuthenticationError, CredentialManagerError, RegistrationError},
    user_lookup::MockUserLookup,
    MemoryChallengeStore, MemoryCredentialStore, RpConfig, RpUser,
};

use super::{AuthenticationOptions, RegistrationOptions, RelyingParty};

const RP_ID: &str = "rp.example";
const ORIGIN: &str = "https://rp.example";
const ALICE_EMAIL: &str = "alice@rp.example";

type TestRelyingParty = RelyingParty<MemoryChallengeStore, MemoryCredentialStore, MockUserLookup>;

fn test_config() -> RpConfig {
    RpConfig::new(RP_ID, "Example", Url::parse(ORIGIN).unwrap())
}

fn alice() -> RpUser {
    RpUser {
        id: vec![0xa1; 16].into(),
        name: ALICE_EMAIL.to_owned(),
        display_name: "Alice".to_owned(),
    }
}

fn bob() -> RpUser {
    RpUser {
        id: vec![0xb0; 16].into(),
        name: "bob@rp.example".to_owned(),
        display_name: "Bob".to_owned(),
    }
}

fn relying_party() -> TestRelyingParty {
    relying_party_with(test_config())
}

fn relying_party_with(config: RpConfig) -> TestRelyingParty {
    RelyingParty::new(
        config,
        MemoryChallengeStore::new(),
        MemoryCredentialStore::new(),
        MockUserLookup::single_user(alice(), ALICE_EMAIL),
    )
}

/// Knobs for building deliberately wrong attestation responses.
struct AttestationTweaks {
    ty: &'static str,
    origin: &'static str,
    rp_id: &'static str,
    fmt: AttestationFormat,
    flags: Flags,
    include_x5c: bool,
}

impl Default for AttestationTweaks {
    fn default() -> Self {
        Self {
            ty: "webauthn.create",
            origin: ORIGIN,
            rp_id: RP_ID,
            fmt: AttestationFormat::None,
            flags: Flags::UP | Flags::UV,
            include_x5c: false,
        }
    }
}

/// Knobs for building deliberately wrong assertion responses.
struct AssertionTweaks {
    ty: &'static str,
    origin: &'static str,
    rp_id: &'static str,
    counter: u32,
    flags: Flags,
    corrupt_signature: bool,
    user_handle: Option<Bytes>,
}

impl Default for AssertionTweaks {
    fn default() -> Self {
        Self {
            ty: "webauthn.get",
            origin: ORIGIN,
            rp_id: RP_ID,
            counter: 0,
            flags: Flags::UP | Flags::UV,
            corrupt_signature: false,
            user_handle: None,
        }
    }
}

/// A software authenticator producing real ES256 signatures, so ceremonies
/// run end to end against the same key material a hardware key would hold.
struct SoftAuthenticator {
    key: SigningKey,
    credential_id: Vec<u8>,
    /// Counter value stamped into the next attestation or assertion.
    counter: u32,
}

impl SoftAuthenticator {
    fn new() -> Self {
        Self {
            key: SigningKey::random(&mut rand::thread_rng()),
            credential_id: random_vec(16),
            counter: 0,
        }
    }

    fn cose_public_key(&self) -> CoseKey {
        let point = self.key.verifying_key().to_encoded_point(false);
        CoseKeyBuilder::new_ec2_pub_key(
            iana::EllipticCurve::P_256,
            point.x().unwrap().as_slice().to_vec(),
            point.y().unwrap().as_slice().to_vec(),
        )
        .algorithm(iana::Algorithm::ES256)
        .build()
    }

    fn client_data_json(ty: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
        format!(
            r#"{{"type":"{ty}","challenge":"{}","origin":"{origin}","crossOrigin":false}}"#,
            encoding::base64url(challenge)
        )
        .into_bytes()
    }

    fn attest(&self, options: &RegistrationOptions) -> CreatedPublicKeyCredential {
        self.attest_with(options, AttestationTweaks::default())
    }

    fn attest_with(
        &self,
        options: &RegistrationOptions,
        tweaks: AttestationTweaks,
    ) -> CreatedPublicKeyCredential {
        let client_data =
            Self::client_data_json(tweaks.ty, &options.public_key.challenge, tweaks.origin);
        let auth_data = AuthenticatorData::new(tweaks.rp_id, self.counter)
            .with_flags(tweaks.flags)
            .with_attested_credential_data(
                AttestedCredentialData::new(
                    [0u8; 16],
                    self.credential_id.clone(),
                    self.cose_public_key(),
                )
                .unwrap(),
            )
            .to_vec();

        let att_stmt = match tweaks.fmt {
            AttestationFormat::Packed => {
                let mut payload = auth_data.clone();
                payload.extend_from_slice(&crypto::sha256(&client_data));
                let signature: Signature = self.key.sign(&payload);
                let signature = Value::Bytes(signature.to_der().as_bytes().to_vec());
                if tweaks.include_x5c {
                    cbor!({ "alg" => -7, "sig" => signature, "x5c" => [Value::Bytes(vec![0xde; 8])] })
                        .unwrap()
                } else {
                    cbor!({ "alg" => -7, "sig" => signature }).unwrap()
                }
            }
            _ => cbor!({}).unwrap(),
        };

        PublicKeyCredential {
            id: encoding::base64url(&self.credential_id),
            raw_id: self.credential_id.clone().into(),
            ty: PublicKeyCredentialType::PublicKey,
            response: AuthenticatorAttestationResponse {
                client_data_json: client_data.into(),
                attestation_object: encode_attestation_object(&tweaks.fmt, att_stmt, &auth_data)
                    .into(),
                transports: Some(vec![AuthenticatorTransport::Internal]),
            },
            authenticator_attachment: None,
        }
    }

    fn assert(&self, options: &AuthenticationOptions) -> AuthenticatedPublicKeyCredential {
        self.assert_with(
            options,
            AssertionTweaks {
                counter: self.counter,
                ..AssertionTweaks::default()
            },
        )
    }

    fn assert_with(
        &self,
        options: &AuthenticationOptions,
        tweaks: AssertionTweaks,
    ) -> AuthenticatedPublicKeyCredential {
        let client_data =
            Self::client_data_json(tweaks.ty, &options.public_key.challenge, tweaks.origin);
        let auth_data = AuthenticatorData::new(tweaks.rp_id, tweaks.counter)
            .with_flags(tweaks.flags)
            .to_vec();

        let mut payload = auth_data.clone();
        payload.extend_from_slice(&crypto::sha256(&client_data));
        let signature: Signature = self.key.sign(&payload);
        let mut signature = signature.to_der().as_bytes().to_vec();
        if tweaks.corrupt_signature {
            // Flipping a low bit of `s` keeps the DER shape intact.
            *signature.last_mut().unwrap() ^= 0x01;
        }

        PublicKeyCredential {
            id: encoding::base64url(&self.credential_id),
            raw_id: self.credential_id.clone().into(),
            ty: PublicKeyCredentialType::PublicKey,
            response: AuthenticatorAssertionResponse {
                client_data_json: client_data.into(),
                authenticator_data: auth_data.into(),
                signature: signature.into(),
                user_handle: tweaks.user_handle,
            },
            authenticator_attachment: None,
        }
    }
}

async fn register(
    rp: &mut TestRelyingParty,
    user: &RpUser,
    authenticator: &SoftAuthenticator,
    label: &str,
) -> crate::CredentialRecord {
    let options = rp.begin_registration(user).await.unwrap();
    rp.verify_registration(
        user,
        &options.challenge_id,
        Some(label.to_owned()),
        &authenticator.attest(&options),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn registration_then_authentication_round_trip() {
    let mut rp = relying_party();
    let user = alice();
    let mut authenticator = SoftAuthenticator::new();
    authenticator.counter = 5;

    let record = register(&mut rp, &user, &authenticator, "yubikey").await;
    assert_eq!(
        record.credential_id.as_slice(),
        authenticator.credential_id.as_slice()
    );
    assert_eq!(record.user_handle, user.id);
    assert_eq!(record.sign_count, 5);
    assert_eq!(record.name.as_deref(), Some("yubikey"));
    assert!(record.last_used_at.is_none());

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    authenticator.counter = 6;
    let authenticated = rp
        .verify_authentication(&options.challenge_id, &authenticator.assert(&options))
        .await
        .unwrap();
    assert_eq!(authenticated, user);

    let stored = rp
        .credential_store()
        .find_by_credential_id(&authenticator.credential_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sign_count, 6);
    assert!(stored.last_used_at.is_some());
}

#[tokio::test]
async fn counterless_authenticators_authenticate_at_zero() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    register(&mut rp, &user, &authenticator, "synced passkey").await;

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    let authenticated = rp
        .verify_authentication(&options.challenge_id, &authenticator.assert(&options))
        .await
        .unwrap();
    assert_eq!(authenticated, user);
}

#[tokio::test]
async fn stalled_or_regressing_counters_mean_a_clone() {
    let mut rp = relying_party();
    let user = alice();
    let mut authenticator = SoftAuthenticator::new();
    authenticator.counter = 5;
    register(&mut rp, &user, &authenticator, "token").await;

    for stale_counter in [5, 4] {
        let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
        let assertion = authenticator.assert_with(
            &options,
            AssertionTweaks {
                counter: stale_counter,
                ..AssertionTweaks::default()
            },
        );
        assert_eq!(
            rp.verify_authentication(&options.challenge_id, &assertion)
                .await,
            Err(AuthenticationError::PossibleCloneDetected)
        );
    }

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    authenticator.counter = 6;
    rp.verify_authentication(&options.challenge_id, &authenticator.assert(&options))
        .await
        .unwrap();
    let stored = rp
        .credential_store()
        .find_by_credential_id(&authenticator.credential_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sign_count, 6);
}

#[tokio::test]
async fn ceremony_challenges_are_single_use() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&user).await.unwrap();
    let attestation = authenticator.attest(&options);
    rp.verify_registration(&user, &options.challenge_id, None, &attestation)
        .await
        .unwrap();

    // Replaying the very same valid response must fail: the challenge is gone.
    let replay = SoftAuthenticator::new().attest(&options);
    assert_eq!(
        rp.verify_registration(&user, &options.challenge_id, None, &replay)
            .await,
        Err(RegistrationError::ChallengeInvalid)
    );
}

#[tokio::test]
async fn failed_verification_still_consumes_the_challenge() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&user).await.unwrap();
    let bad = authenticator.attest_with(
        &options,
        AttestationTweaks {
            origin: "https://evil.example",
            ..AttestationTweaks::default()
        },
    );
    assert_eq!(
        rp.verify_registration(&user, &options.challenge_id, None, &bad)
            .await,
        Err(RegistrationError::ClientDataMismatch)
    );

    // A corrected retry on the same challenge is too late.
    assert_eq!(
        rp.verify_registration(&user, &options.challenge_id, None, &authenticator.attest(&options))
            .await,
        Err(RegistrationError::ChallengeInvalid)
    );
}

#[tokio::test]
async fn expired_challenges_never_verify() {
    let mut rp = relying_party_with(test_config().challenge_ttl(Duration::minutes(-1)));
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&user).await.unwrap();
    assert_eq!(
        rp.verify_registration(&user, &options.challenge_id, None, &authenticator.attest(&options))
            .await,
        Err(RegistrationError::ChallengeInvalid)
    );
}

#[tokio::test]
async fn registration_challenges_are_bound_to_their_user() {
    let mut rp = relying_party();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&alice()).await.unwrap();
    assert_eq!(
        rp.verify_registration(&bob(), &options.challenge_id, None, &authenticator.attest(&options))
            .await,
        Err(RegistrationError::ChallengeInvalid)
    );
}

#[tokio::test]
async fn client_data_mismatches_are_rejected() {
    let user = alice();

    for tweaks in [
        AttestationTweaks {
            ty: "webauthn.get",
            ..AttestationTweaks::default()
        },
        AttestationTweaks {
            origin: "http://rp.example",
            ..AttestationTweaks::default()
        },
        AttestationTweaks {
            origin: "https://rp.example:8443",
            ..AttestationTweaks::default()
        },
    ] {
        let mut rp = relying_party();
        let authenticator = SoftAuthenticator::new();
        let options = rp.begin_registration(&user).await.unwrap();
        assert_eq!(
            rp.verify_registration(
                &user,
                &options.challenge_id,
                None,
                &authenticator.attest_with(&options, tweaks)
            )
            .await,
            Err(RegistrationError::ClientDataMismatch)
        );
    }
}

#[tokio::test]
async fn assertion_for_a_different_challenge_is_rejected() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    register(&mut rp, &user, &authenticator, "token").await;

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    let other = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();

    // Signed over `other`'s challenge value, presented against `options`.
    assert_eq!(
        rp.verify_authentication(&options.challenge_id, &authenticator.assert(&other))
            .await,
        Err(AuthenticationError::ClientDataMismatch)
    );
}

#[tokio::test]
async fn default_ports_compare_equal_in_origins() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&user).await.unwrap();
    let attestation = authenticator.attest_with(
        &options,
        AttestationTweaks {
            origin: "https://rp.example:443",
            ..AttestationTweaks::default()
        },
    );
    rp.verify_registration(&user, &options.challenge_id, None, &attestation)
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_credential_ids_cannot_register_twice() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    register(&mut rp, &user, &authenticator, "first").await;

    // Same physical authenticator, fresh ceremony, even a different user.
    let options = rp.begin_registration(&bob()).await.unwrap();
    assert_eq!(
        rp.verify_registration(&bob(), &options.challenge_id, None, &authenticator.attest(&options))
            .await,
        Err(RegistrationError::CredentialAlreadyRegistered)
    );
}

#[tokio::test]
async fn second_registration_excludes_the_first_credential() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    let record = register(&mut rp, &user, &authenticator, "first").await;

    let options = rp.begin_registration(&user).await.unwrap();
    let excluded = options.public_key.exclude_credentials.unwrap();
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].id, record.credential_id);
}

#[tokio::test]
async fn packed_self_attestation_is_accepted() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&user).await.unwrap();
    let attestation = authenticator.attest_with(
        &options,
        AttestationTweaks {
            fmt: AttestationFormat::Packed,
            ..AttestationTweaks::default()
        },
    );
    rp.verify_registration(&user, &options.challenge_id, None, &attestation)
        .await
        .unwrap();
}

#[tokio::test]
async fn packed_chain_attestation_and_unknown_formats_are_rejected() {
    let user = alice();

    for (tweaks, expected) in [
        (
            AttestationTweaks {
                fmt: AttestationFormat::Packed,
                include_x5c: true,
                ..AttestationTweaks::default()
            },
            RegistrationError::UnsupportedAttestationFormat,
        ),
        (
            AttestationTweaks {
                fmt: AttestationFormat::Other("vendor-x".to_owned()),
                ..AttestationTweaks::default()
            },
            RegistrationError::UnsupportedAttestationFormat,
        ),
        (
            AttestationTweaks {
                fmt: AttestationFormat::Tpm,
                ..AttestationTweaks::default()
            },
            RegistrationError::UnsupportedAttestationFormat,
        ),
    ] {
        let mut rp = relying_party();
        let authenticator = SoftAuthenticator::new();
        let options = rp.begin_registration(&user).await.unwrap();
        assert_eq!(
            rp.verify_registration(
                &user,
                &options.challenge_id,
                None,
                &authenticator.attest_with(&options, tweaks)
            )
            .await,
            Err(expected)
        );
    }
}

#[tokio::test]
async fn missing_user_presence_fails_both_ceremonies() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&user).await.unwrap();
    let attestation = authenticator.attest_with(
        &options,
        AttestationTweaks {
            flags: Flags::UV,
            ..AttestationTweaks::default()
        },
    );
    assert_eq!(
        rp.verify_registration(&user, &options.challenge_id, None, &attestation)
            .await,
        Err(RegistrationError::AuthenticatorDataInvalid)
    );

    register(&mut rp, &user, &authenticator, "token").await;
    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    let assertion = authenticator.assert_with(
        &options,
        AssertionTweaks {
            flags: Flags::UV,
            ..AssertionTweaks::default()
        },
    );
    assert_eq!(
        rp.verify_authentication(&options.challenge_id, &assertion)
            .await,
        Err(AuthenticationError::AuthenticatorDataInvalid)
    );
}

#[tokio::test]
async fn required_user_verification_is_enforced() {
    let mut rp = relying_party_with(test_config().require_user_verification());
    let user = alice();
    let authenticator = SoftAuthenticator::new();

    let options = rp.begin_registration(&user).await.unwrap();
    let attestation = authenticator.attest_with(
        &options,
        AttestationTweaks {
            flags: Flags::UP,
            ..AttestationTweaks::default()
        },
    );
    assert_eq!(
        rp.verify_registration(&user, &options.challenge_id, None, &attestation)
            .await,
        Err(RegistrationError::AuthenticatorDataInvalid)
    );
}

#[tokio::test]
async fn wrong_rp_id_hash_is_rejected() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    register(&mut rp, &user, &authenticator, "token").await;

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    let assertion = authenticator.assert_with(
        &options,
        AssertionTweaks {
            rp_id: "evil.example",
            ..AssertionTweaks::default()
        },
    );
    assert_eq!(
        rp.verify_authentication(&options.challenge_id, &assertion)
            .await,
        Err(AuthenticationError::AuthenticatorDataInvalid)
    );
}

#[tokio::test]
async fn tampered_signatures_do_not_verify() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    register(&mut rp, &user, &authenticator, "token").await;

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    let assertion = authenticator.assert_with(
        &options,
        AssertionTweaks {
            corrupt_signature: true,
            ..AssertionTweaks::default()
        },
    );
    assert_eq!(
        rp.verify_authentication(&options.challenge_id, &assertion)
            .await,
        Err(AuthenticationError::SignatureInvalid)
    );
}

#[tokio::test]
async fn unknown_credentials_cannot_authenticate() {
    let mut rp = relying_party();
    let user = alice();
    register(&mut rp, &user, &SoftAuthenticator::new(), "token").await;

    let options = rp.begin_authentication(None).await.unwrap();
    let stranger = SoftAuthenticator::new();
    assert_eq!(
        rp.verify_authentication(&options.challenge_id, &stranger.assert(&options))
            .await,
        Err(AuthenticationError::CredentialNotFound)
    );
}

#[tokio::test]
async fn scoped_challenges_reject_other_users_credentials() {
    let mut rp = relying_party();
    let user = alice();
    register(&mut rp, &user, &SoftAuthenticator::new(), "token").await;

    // Bob's credential exists in the store but the ceremony is scoped to
    // Alice.
    let bobs_authenticator = SoftAuthenticator::new();
    let bobs_record = crate::CredentialRecord {
        id: Uuid::new_v4(),
        credential_id: bobs_authenticator.credential_id.clone().into(),
        user_handle: bob().id,
        public_key: bobs_authenticator.cose_public_key(),
        algorithm: iana::Algorithm::ES256,
        sign_count: 0,
        backed_up: false,
        transports: None,
        name: None,
        created_at: chrono::Utc::now(),
        last_used_at: None,
    };
    rp.credential_store_mut().save(bobs_record).await.unwrap();

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    assert_eq!(
        rp.verify_authentication(&options.challenge_id, &bobs_authenticator.assert(&options))
            .await,
        Err(AuthenticationError::ChallengeInvalid)
    );
}

#[tokio::test]
async fn claimed_user_handle_must_match_the_owner() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    register(&mut rp, &user, &authenticator, "token").await;

    let options = rp.begin_authentication(None).await.unwrap();
    let assertion = authenticator.assert_with(
        &options,
        AssertionTweaks {
            user_handle: Some(bob().id),
            ..AssertionTweaks::default()
        },
    );
    assert_eq!(
        rp.verify_authentication(&options.challenge_id, &assertion)
            .await,
        Err(AuthenticationError::CredentialNotFound)
    );
}

#[tokio::test]
async fn registration_challenges_cannot_authenticate() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    register(&mut rp, &user, &authenticator, "token").await;

    let registration = rp.begin_registration(&user).await.unwrap();
    let unrelated = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    assert_eq!(
        rp.verify_authentication(&registration.challenge_id, &authenticator.assert(&unrelated))
            .await,
        Err(AuthenticationError::ChallengeInvalid)
    );
}

#[tokio::test]
async fn authentication_hints_reveal_exactly_one_bit() {
    let mut rp = relying_party();

    // Unknown address and known address without passkeys are the same.
    assert_eq!(
        rp.begin_authentication(Some("nobody@rp.example"))
            .await
            .unwrap_err(),
        AuthenticationError::NoPasskeysRegistered
    );
    assert_eq!(
        rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap_err(),
        AuthenticationError::NoPasskeysRegistered
    );

    let record = register(&mut rp, &alice(), &SoftAuthenticator::new(), "token").await;

    let options = rp.begin_authentication(Some(ALICE_EMAIL)).await.unwrap();
    let allowed = options.public_key.allow_credentials.unwrap();
    assert_eq!(allowed.len(), 1);
    assert_eq!(allowed[0].id, record.credential_id);
    assert_eq!(
        allowed[0].transports.as_deref(),
        Some(&[AuthenticatorTransport::Internal][..])
    );
}

#[tokio::test]
async fn discoverable_authentication_carries_no_allow_list() {
    let mut rp = relying_party();
    let user = alice();
    let authenticator = SoftAuthenticator::new();
    register(&mut rp, &user, &authenticator, "token").await;

    let options = rp.begin_authentication(None).await.unwrap();
    assert!(options.public_key.allow_credentials.is_none());

    let authenticated = rp
        .verify_authentication(&options.challenge_id, &authenticator.assert(&options))
        .await
        .unwrap();
    assert_eq!(authenticated, user);
}

#[tokio::test]
async fn credential_manager_lists_renames_and_deletes() {
    let mut rp = relying_party();
    let user = alice();
    let first_authenticator = SoftAuthenticator::new();
    let first = register(&mut rp, &user, &first_authenticator, "first").await;
    let second = register(&mut rp, &user, &SoftAuthenticator::new(), "second").await;

    let listed = rp.list_credentials(&user).await.unwrap();
    assert_eq!(listed, vec![first.clone(), second.clone()]);

    let renamed = rp
        .rename_credential(&user, &first.credential_id, "home key".to_owned())
        .await
        .unwrap();
    assert_eq!(renamed.name.as_deref(), Some("home key"));

    assert_eq!(
        rp.rename_credential(&bob(), &first.credential_id, "stolen".to_owned())
            .await,
        Err(CredentialManagerError::NotFound)
    );

    rp.delete_credential(&user, &first.credential_id)
        .await
        .unwrap();
    let listed = rp.list_credentials(&user).await.unwrap();
    assert_eq!(listed, vec![second]);

    assert_eq!(
        rp.delete_credential(&user, &first.credential_id).await,
        Err(CredentialManagerError::NotFound)
    );
}

#[tokio::test]
async fn options_serialize_the_way_browsers_expect() {
    let mut rp = relying_party();
    let options = rp.begin_registration(&alice()).await.unwrap();

    let json = serde_json::to_value(&options).unwrap();
    assert!(json["challengeId"].is_string());
    let public_key = &json["publicKey"];
    assert!(public_key["challenge"].is_string());
    assert_eq!(public_key["rp"]["id"], RP_ID);
    assert_eq!(public_key["user"]["displayName"], "Alice");
    assert_eq!(public_key["pubKeyCredParams"][0]["alg"], -7);
    assert_eq!(public_key["attestation"], "none");
}
