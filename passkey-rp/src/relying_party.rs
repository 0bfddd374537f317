//! The ceremony orchestrator.

use chrono::Utc;
use ciborium::value::Value;
use coset::iana::{self, EnumI64};
use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use serde::Serialize;
use typeshare::typeshare;
use url::Url;
use uuid::Uuid;

use passkey_rp_types::{
    crypto, encoding,
    ctap2::AuthenticatorData,
    webauthn::{
        AttestationConveyancePreference, AttestationFormat, AttestationObject,
        AuthenticatedPublicKeyCredential, AuthenticatorSelectionCriteria, ClientDataType,
        CollectedClientData, CreatedPublicKeyCredential, PublicKeyCredentialCreationOptions,
        PublicKeyCredentialParameters, PublicKeyCredentialRequestOptions,
        PublicKeyCredentialRpEntity, PublicKeyCredentialType,
    },
    Bytes,
};

use crate::{
    challenge_store::{Challenge, ChallengePurpose, ChallengeStore},
    config::RpConfig,
    credential_store::{CredentialRecord, CredentialStore},
    errors::{AuthenticationError, RegistrationError},
    user_lookup::{RpUser, UserLookup},
    verifying_key_from_cose_key,
};

mod credential_manager;

#[cfg(test)]
mod tests;

/// Timeout hint sent to clients with every set of ceremony options.
const TIMEOUT_HINT_MS: u32 = 60_000;

/// What `begin_registration` hands to the transport layer: the opaque
/// challenge handle the client must echo back, plus the
/// `navigator.credentials.create` payload.
#[typeshare]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    /// Handle naming the server-side challenge entry.
    pub challenge_id: Bytes,

    /// The `publicKey` member for `navigator.credentials.create`.
    pub public_key: PublicKeyCredentialCreationOptions,
}

/// What `begin_authentication` hands to the transport layer.
#[typeshare]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    /// Handle naming the server-side challenge entry.
    pub challenge_id: Bytes,

    /// The `publicKey` member for `navigator.credentials.get`.
    pub public_key: PublicKeyCredentialRequestOptions,
}

/// A webauthn relying party: both ceremonies plus credential management,
/// wired over a challenge store, a credential store and an account lookup.
///
/// Ceremony operations are stateless request/response interactions; all
/// shared state lives in the stores, so one value of this type (or several,
/// over shared stores) can serve concurrent ceremonies for the same user.
pub struct RelyingParty<C, S, U> {
    config: RpConfig,
    challenges: C,
    credentials: S,
    users: U,
}

/// Why client data was rejected. Collapsed to one public error kind; kept
/// apart internally for logging.
#[derive(Debug)]
enum ClientDataIssue {
    Parse,
    CeremonyType,
    Challenge,
    Origin,
}

impl<C, S, U> RelyingParty<C, S, U>
where
    C: ChallengeStore + Send + Sync,
    S: CredentialStore + Send + Sync,
    U: UserLookup + Send + Sync,
{
    /// Create a relying party over the given stores and account lookup.
    pub fn new(config: RpConfig, challenges: C, credentials: S, users: U) -> Self {
        Self {
            config,
            challenges,
            credentials,
            users,
        }
    }

    /// Read access to the configuration.
    pub fn config(&self) -> &RpConfig {
        &self.config
    }

    /// Read access to the credential store.
    pub fn credential_store(&self) -> &S {
        &self.credentials
    }

    /// Exclusive access to the credential store.
    pub fn credential_store_mut(&mut self) -> &mut S {
        &mut self.credentials
    }

    /// Start a registration ceremony for `user`.
    ///
    /// Issues a registration-purpose challenge bound to the user and builds
    /// creation options carrying the relying party identity, the user
    /// entity, the configured algorithm preferences and an exclusion list
    /// of the user's existing credentials, so one physical authenticator
    /// cannot be registered twice for the same account.
    pub async fn begin_registration(
        &mut self,
        user: &RpUser,
    ) -> Result<RegistrationOptions, RegistrationError> {
        let exclude: Vec<_> = self
            .credentials
            .find_by_user(&user.id)
            .await?
            .iter()
            .map(CredentialRecord::descriptor)
            .collect();

        let challenge = Challenge::issue(
            ChallengePurpose::Registration,
            Some(user.id.clone()),
            self.config.challenge_ttl,
        );
        self.challenges.save(challenge.clone()).await?;

        Ok(RegistrationOptions {
            challenge_id: challenge.id,
            public_key: PublicKeyCredentialCreationOptions {
                rp: PublicKeyCredentialRpEntity {
                    id: Some(self.config.rp_id.clone()),
                    name: self.config.rp_name.clone(),
                },
                user: user.entity(),
                challenge: challenge.value,
                pub_key_cred_params: self
                    .config
                    .algorithms
                    .iter()
                    .map(|&alg| PublicKeyCredentialParameters {
                        ty: PublicKeyCredentialType::PublicKey,
                        alg,
                    })
                    .collect(),
                timeout: Some(TIMEOUT_HINT_MS),
                exclude_credentials: (!exclude.is_empty()).then_some(exclude),
                authenticator_selection: Some(AuthenticatorSelectionCriteria {
                    user_verification: self.config.user_verification,
                    ..Default::default()
                }),
                attestation: AttestationConveyancePreference::None,
            },
        })
    }

    /// Verify a registration response and store the new credential.
    ///
    /// The consumed challenge must be registration-purpose and bound to
    /// `user`; the client data must carry the `webauthn.create` type, the
    /// challenge value and the configured origin; the attestation object
    /// must decode, bind to the configured RP ID with the user-present flag
    /// (and user-verified, if required), carry a key this relying party can
    /// verify, and satisfy the attestation policy. The new `credential_id`
    /// must not exist for any account.
    pub async fn verify_registration(
        &mut self,
        user: &RpUser,
        challenge_id: &[u8],
        label: Option<String>,
        credential: &CreatedPublicKeyCredential,
    ) -> Result<CredentialRecord, RegistrationError> {
        let challenge = self.challenges.take(challenge_id).await?;
        if challenge.purpose != ChallengePurpose::Registration
            || challenge.user_handle.as_ref().map(Bytes::as_slice) != Some(user.id.as_slice())
        {
            return Err(RegistrationError::ChallengeInvalid);
        }

        let response = &credential.response;
        if let Err(issue) = self.check_client_data(
            &response.client_data_json,
            ClientDataType::Create,
            &challenge.value,
        ) {
            log::debug!("registration client data rejected: {issue:?}");
            return Err(RegistrationError::ClientDataMismatch);
        }

        let object = AttestationObject::from_slice(&response.attestation_object)?;

        if !object.auth_data.is_for_rp_id(&self.config.rp_id)
            || !object.auth_data.flags.user_present()
        {
            return Err(RegistrationError::AuthenticatorDataInvalid);
        }
        if self.config.user_verification.is_required() && !object.auth_data.flags.user_verified() {
            return Err(RegistrationError::AuthenticatorDataInvalid);
        }

        let attested = object
            .auth_data
            .attested_credential_data
            .as_ref()
            .ok_or(RegistrationError::MalformedAttestation)?;
        if attested.credential_id() != credential.raw_id.as_slice() {
            return Err(RegistrationError::MalformedAttestation);
        }

        let algorithm = object
            .credential_algorithm()
            .ok_or(RegistrationError::MalformedAttestation)?;
        if !self.config.algorithms.contains(&algorithm) {
            return Err(RegistrationError::UnsupportedAlgorithm);
        }
        // Rejecting an unusable key here beats storing a credential that
        // can never complete an authentication ceremony.
        let verifying_key = verifying_key_from_cose_key(&attested.key)?;

        let client_data_hash = crypto::sha256(&response.client_data_json);
        match &object.fmt {
            AttestationFormat::None => {
                // "none" conveys exactly an empty statement map.
                if !object.att_stmt.as_map().map_or(false, Vec::is_empty) {
                    return Err(RegistrationError::MalformedAttestation);
                }
            }
            AttestationFormat::Packed => {
                check_packed_self_attestation(&object, &verifying_key, algorithm, &client_data_hash)?;
            }
            other => {
                log::debug!("rejecting attestation statement format {:?}", other.as_str());
                return Err(RegistrationError::UnsupportedAttestationFormat);
            }
        }

        if self
            .credentials
            .find_by_credential_id(attested.credential_id())
            .await?
            .is_some()
        {
            return Err(RegistrationError::CredentialAlreadyRegistered);
        }

        let record = CredentialRecord {
            id: Uuid::new_v4(),
            credential_id: attested.credential_id().to_vec().into(),
            user_handle: user.id.clone(),
            public_key: attested.key.clone(),
            algorithm,
            sign_count: object.auth_data.counter,
            backed_up: object.auth_data.flags.backed_up(),
            transports: response.transports.clone(),
            name: label,
            created_at: Utc::now(),
            last_used_at: None,
        };
        self.credentials.save(record.clone()).await?;
        Ok(record)
    }

    /// Start an authentication ceremony, optionally scoped by an account
    /// hint.
    ///
    /// With an email hint the user's credentials become the allow list;
    /// an unknown address and an address without passkeys are both
    /// [`AuthenticationError::NoPasskeysRegistered`] — the one deliberate
    /// existence leak of this API. Without a hint the options carry no
    /// allow list and any discoverable credential scoped to the RP may
    /// answer.
    pub async fn begin_authentication(
        &mut self,
        email: Option<&str>,
    ) -> Result<AuthenticationOptions, AuthenticationError> {
        let (user_handle, allow_credentials) = match email {
            Some(email) => {
                let user = self
                    .users
                    .find_by_email(email)
                    .await?
                    .ok_or(AuthenticationError::NoPasskeysRegistered)?;
                let records = self.credentials.find_by_user(&user.id).await?;
                if records.is_empty() {
                    return Err(AuthenticationError::NoPasskeysRegistered);
                }
                let allow = records.iter().map(CredentialRecord::descriptor).collect();
                (Some(user.id), Some(allow))
            }
            None => (None, None),
        };

        let challenge = Challenge::issue(
            ChallengePurpose::Authentication,
            user_handle,
            self.config.challenge_ttl,
        );
        self.challenges.save(challenge.clone()).await?;

        Ok(AuthenticationOptions {
            challenge_id: challenge.id,
            public_key: PublicKeyCredentialRequestOptions {
                challenge: challenge.value,
                timeout: Some(TIMEOUT_HINT_MS),
                rp_id: Some(self.config.rp_id.clone()),
                allow_credentials,
                user_verification: self.config.user_verification,
            },
        })
    }

    /// Verify an assertion response and return the owning user.
    ///
    /// Session issuance from the returned user is the caller's business.
    /// Beyond the challenge, client data and authenticator data checks,
    /// the assertion signature must verify over
    /// `authenticator_data || SHA-256(client_data_json)` with the key
    /// recorded at registration, and the signature counter must advance
    /// when counters are in use: a stalled or regressing counter means a
    /// cloned private key and fails the ceremony even though the signature
    /// itself is valid.
    pub async fn verify_authentication(
        &mut self,
        challenge_id: &[u8],
        credential: &AuthenticatedPublicKeyCredential,
    ) -> Result<RpUser, AuthenticationError> {
        let challenge = self.challenges.take(challenge_id).await?;
        if challenge.purpose != ChallengePurpose::Authentication {
            return Err(AuthenticationError::ChallengeInvalid);
        }

        let response = &credential.response;
        if let Err(issue) = self.check_client_data(
            &response.client_data_json,
            ClientDataType::Get,
            &challenge.value,
        ) {
            log::debug!("authentication client data rejected: {issue:?}");
            return Err(AuthenticationError::ClientDataMismatch);
        }

        let record = self
            .credentials
            .find_by_credential_id(&credential.raw_id)
            .await?
            .ok_or(AuthenticationError::CredentialNotFound)?;

        if let Some(scoped_to) = &challenge.user_handle {
            if *scoped_to != record.user_handle {
                return Err(AuthenticationError::ChallengeInvalid);
            }
        }
        if let Some(claimed) = &response.user_handle {
            if *claimed != record.user_handle {
                return Err(AuthenticationError::CredentialNotFound);
            }
        }

        let auth_data = AuthenticatorData::from_slice(&response.authenticator_data)?;
        if !auth_data.is_for_rp_id(&self.config.rp_id) || !auth_data.flags.user_present() {
            return Err(AuthenticationError::AuthenticatorDataInvalid);
        }
        if self.config.user_verification.is_required() && !auth_data.flags.user_verified() {
            return Err(AuthenticationError::AuthenticatorDataInvalid);
        }

        let verifying_key = verifying_key_from_cose_key(&record.public_key)?;
        let signature = Signature::from_der(&response.signature)
            .map_err(|_| AuthenticationError::SignatureInvalid)?;
        let mut payload = response.authenticator_data.to_vec();
        payload.extend_from_slice(&crypto::sha256(&response.client_data_json));
        verifying_key
            .verify(&payload, &signature)
            .map_err(|_| AuthenticationError::SignatureInvalid)?;

        // Counters are in use once either side has seen a non-zero value;
        // from then on the presented counter must strictly increase.
        let counters_in_use = auth_data.counter != 0 || record.sign_count != 0;
        if counters_in_use && auth_data.counter <= record.sign_count {
            log::warn!(
                "signature counter did not advance for credential {}: possible cloned authenticator",
                record.id
            );
            return Err(AuthenticationError::PossibleCloneDetected);
        }
        self.credentials
            .record_authentication(&record.credential_id, auth_data.counter, Utc::now())
            .await?;

        self.users
            .find_by_id(&record.user_handle)
            .await?
            .ok_or(AuthenticationError::CredentialNotFound)
    }

    /// Check the parsed client data against this ceremony's expectations:
    /// ceremony type, challenge value (constant time) and exact origin.
    fn check_client_data(
        &self,
        raw: &[u8],
        expected_type: ClientDataType,
        challenge_value: &[u8],
    ) -> Result<(), ClientDataIssue> {
        let client_data: CollectedClientData =
            serde_json::from_slice(raw).map_err(|_| ClientDataIssue::Parse)?;

        if client_data.ty != expected_type {
            return Err(ClientDataIssue::CeremonyType);
        }

        let presented = encoding::try_from_base64url(&client_data.challenge)
            .ok_or(ClientDataIssue::Challenge)?;
        if !constant_time_eq(&presented, challenge_value) {
            return Err(ClientDataIssue::Challenge);
        }

        let origin = Url::parse(&client_data.origin).map_err(|_| ClientDataIssue::Origin)?;
        if !same_origin(&origin, &self.config.origin) {
            return Err(ClientDataIssue::Origin);
        }

        Ok(())
    }
}

/// Exact origin equality on scheme, host and port. `Url` fills in known
/// default ports, so `https://rp.example` equals `https://rp.example:443`.
fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Byte equality without an early exit on the first mismatch. The length
/// check short-circuits, which is fine: challenge lengths are public.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verify a `packed` attestation statement under the self-attestation
/// policy: no certificate chain, the stated algorithm agreeing with the
/// credential key, and the statement signature verifying with that same
/// key over `authenticator_data || client_data_hash`.
///
/// Statements carrying an `x5c` chain need vendor trust decisions this
/// crate does not make; extend the policy explicitly rather than widening
/// this function.
fn check_packed_self_attestation(
    object: &AttestationObject,
    verifying_key: &VerifyingKey,
    algorithm: iana::Algorithm,
    client_data_hash: &[u8; 32],
) -> Result<(), RegistrationError> {
    if object.statement_member("x5c").is_some() {
        return Err(RegistrationError::UnsupportedAttestationFormat);
    }

    let stated = object
        .statement_member("alg")
        .and_then(Value::as_integer)
        .ok_or(RegistrationError::MalformedAttestation)?;
    if stated != algorithm.to_i64().into() {
        return Err(RegistrationError::MalformedAttestation);
    }

    let signature = object
        .statement_member("sig")
        .and_then(Value::as_bytes)
        .ok_or(RegistrationError::MalformedAttestation)?;
    let signature =
        Signature::from_der(signature).map_err(|_| RegistrationError::MalformedAttestation)?;

    let mut payload = object.auth_data_bytes.to_vec();
    payload.extend_from_slice(client_data_hash);
    verifying_key
        .verify(&payload, &signature)
        .map_err(|_| RegistrationError::MalformedAttestation)
}
