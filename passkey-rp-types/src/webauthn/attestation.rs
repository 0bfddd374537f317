//! Types specific to credential creation (the registration ceremony).

use ciborium::value::Value;
use coset::{iana, CoseKey};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::{
    ctap2::AuthenticatorData,
    utils::serde::{i64_to_iana, ignore_unknown, ignore_unknown_opt_vec},
    webauthn::{
        AuthenticatorAttachment, AuthenticatorTransport, PublicKeyCredentialDescriptor,
        UserVerificationRequirement,
    },
    Bytes,
};

/// The `publicKey` member handed to `navigator.credentials.create`.
///
/// A relying party produces this; it never parses one. Fields this crate's
/// ceremonies cannot act on (hints, enterprise attestation, extensions) are
/// deliberately absent.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialcreationoptions>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[typeshare]
pub struct PublicKeyCredentialCreationOptions {
    /// The relying party responsible for the request.
    pub rp: PublicKeyCredentialRpEntity,

    /// The account the new credential will belong to.
    pub user: PublicKeyCredentialUserEntity,

    /// The challenge the authenticator signs over, alongside other data.
    pub challenge: Bytes,

    /// Key types and algorithms the relying party accepts, ordered from
    /// most to least preferred.
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,

    /// A hint, in milliseconds, for how long the client should wait.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// Credentials the user already owns, so the same authenticator is not
    /// registered twice for one account.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown_opt_vec"
    )]
    pub exclude_credentials: Option<Vec<PublicKeyCredentialDescriptor>>,

    /// Requirements the authenticator must or should satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,

    /// The relying party's preference on attestation conveyance.
    #[serde(default, deserialize_with = "ignore_unknown")]
    pub attestation: AttestationConveyancePreference,
}

/// Relying party attributes for credential creation.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialrpentity>
#[derive(Debug, Serialize, Deserialize, Clone)]
#[typeshare]
pub struct PublicKeyCredentialRpEntity {
    /// The RP ID the credential will be scoped to; defaults to the
    /// requesting origin's effective domain when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// A human-palatable name for the relying party, display only.
    pub name: String,
}

/// User account attributes for credential creation.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialuserentity>
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
#[typeshare]
pub struct PublicKeyCredentialUserEntity {
    /// The user handle: an opaque byte sequence of at most 64 bytes which
    /// must not carry personally identifying information. Authentication
    /// and authorization decisions are made on this member, never on the
    /// display fields.
    pub id: Bytes,

    /// A human-palatable account identifier, e.g. an email address.
    pub name: String,

    /// A human-palatable display name, e.g. "Alex Müller".
    pub display_name: String,
}

/// One acceptable key type / signature algorithm pair.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialparameters>
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[typeshare]
pub struct PublicKeyCredentialParameters {
    /// The credential type to create.
    #[serde(rename = "type", deserialize_with = "ignore_unknown")]
    pub ty: super::PublicKeyCredentialType,

    /// The COSE algorithm the generated key pair must support.
    #[serde(with = "i64_to_iana")]
    #[typeshare(serialized_as = "I54")] // i64 overflows in js
    pub alg: iana::Algorithm,
}

impl PublicKeyCredentialParameters {
    /// Parameters for an ES256 (ECDSA P-256, SHA-256) public key, the one
    /// algorithm every authenticator in the field supports.
    pub fn es256() -> Self {
        Self {
            ty: super::PublicKeyCredentialType::PublicKey,
            alg: iana::Algorithm::ES256,
        }
    }
}

/// Requirements regarding authenticator attributes at creation.
///
/// <https://w3c.github.io/webauthn/#dictdef-authenticatorselectioncriteria>
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[typeshare]
pub struct AuthenticatorSelectionCriteria {
    /// Restrict eligible authenticators to one attachment modality.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown"
    )]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,

    /// The extent to which a client-side discoverable credential is wanted.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown"
    )]
    pub resident_key: Option<ResidentKeyRequirement>,

    /// Webauthn Level 1 spelling of `resident_key == Required`, kept for
    /// older clients.
    #[serde(default)]
    pub require_resident_key: bool,

    /// User verification requirement for the `create()` operation.
    #[serde(default, deserialize_with = "ignore_unknown")]
    pub user_verification: UserVerificationRequirement,
}

/// The relying party's requirement for client-side discoverable credentials.
///
/// <https://w3c.github.io/webauthn/#enumdef-residentkeyrequirement>
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[typeshare(serialized_as = "String")]
pub enum ResidentKeyRequirement {
    /// Prefer a server-side credential.
    Discouraged,

    /// Prefer a discoverable credential but accept either.
    Preferred,

    /// The client must create a discoverable credential or fail.
    Required,
}

/// The relying party's preference regarding [attestation conveyance].
///
/// <https://w3c.github.io/webauthn/#enumdef-attestationconveyancepreference>
///
/// [attestation conveyance]: https://w3c.github.io/webauthn/#attestation-conveyance
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[typeshare(serialized_as = "String")]
pub enum AttestationConveyancePreference {
    /// No interest in attestation; clients strip identifying statements.
    /// The default, and the fallback for unknown values.
    #[default]
    None,

    /// A verifiable statement is wanted but the client chooses how.
    Indirect,

    /// The statement as generated by the authenticator.
    Direct,

    /// A statement that may uniquely identify the authenticator; only for
    /// controlled enterprise deployments.
    Enterprise,
}

/// The authenticator's response to a credential creation request.
///
/// <https://w3c.github.io/webauthn/#iface-authenticatorattestationresponse>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[typeshare]
pub struct AuthenticatorAttestationResponse {
    /// The JSON serialization of the client data. The exact bytes must be
    /// preserved since hashes and signatures were computed over them.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Bytes,

    /// The attestation object: a CBOR map carrying the authenticator data
    /// and an attestation statement, decodable via [`AttestationObject`].
    pub attestation_object: Bytes,

    /// Transports the authenticator is believed to support, as reported by
    /// the client's `getTransports()`. Unknown values are dropped.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown_opt_vec"
    )]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

/// An attestation statement format identifier, as found in the `fmt` member
/// of an attestation object.
///
/// Identifiers outside the IANA registry are preserved in
/// [`Self::Other`] so policy code can name what it rejected.
///
/// <https://www.iana.org/assignments/webauthn/webauthn.xhtml#webauthn-attestation-statement-format-ids>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationFormat {
    /// No attestation statement is conveyed.
    None,
    /// The webauthn-optimized `packed` format; self attestation when no
    /// certificate chain is present.
    Packed,
    /// FIDO U2F authenticators.
    FidoU2f,
    /// TPM-backed platform authenticators.
    Tpm,
    /// Android hardware-backed key attestation.
    AndroidKey,
    /// Android SafetyNet API attestation.
    AndroidSafetynet,
    /// Apple platform authenticators.
    Apple,
    /// Any identifier this crate does not recognize.
    Other(String),
}

impl From<&str> for AttestationFormat {
    fn from(identifier: &str) -> Self {
        match identifier {
            "none" => Self::None,
            "packed" => Self::Packed,
            "fido-u2f" => Self::FidoU2f,
            "tpm" => Self::Tpm,
            "android-key" => Self::AndroidKey,
            "android-safetynet" => Self::AndroidSafetynet,
            "apple" => Self::Apple,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl AttestationFormat {
    /// The registered identifier string for this format.
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Packed => "packed",
            Self::FidoU2f => "fido-u2f",
            Self::Tpm => "tpm",
            Self::AndroidKey => "android-key",
            Self::AndroidSafetynet => "android-safetynet",
            Self::Apple => "apple",
            Self::Other(other) => other,
        }
    }
}

/// A decoded attestation object.
///
/// The wire form is a CBOR map with exactly the members `fmt` (text),
/// `attStmt` (map) and `authData` (byte string); this decoder accepts them
/// in any order, ignores no member, and rejects duplicates and extras.
///
/// <https://w3c.github.io/webauthn/#attestation-object>
#[derive(Debug, Clone)]
pub struct AttestationObject {
    /// The attestation statement format identifier.
    pub fmt: AttestationFormat,

    /// The attestation statement, uninterpreted. Policy code decides what,
    /// if anything, to verify in here.
    pub att_stmt: Value,

    /// The parsed authenticator data.
    pub auth_data: AuthenticatorData,

    /// The raw bytes `auth_data` was parsed from; attestation statement
    /// signatures are computed over these, not the re-encoding.
    pub auth_data_bytes: Bytes,
}

impl AttestationObject {
    /// Decode an attestation object from CBOR bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, crate::ctap2::ParseError> {
        use crate::ctap2::ParseError;

        let value: Value =
            ciborium::de::from_reader(bytes).map_err(|_| ParseError::InvalidCbor)?;
        let Value::Map(members) = value else {
            return Err(ParseError::InvalidCbor);
        };

        let (mut fmt, mut att_stmt, mut auth_data) = (None, None, None);
        for (key, value) in members {
            match key.as_text() {
                Some("fmt") => {
                    let id = value.as_text().ok_or(ParseError::InvalidCbor)?;
                    if fmt.replace(AttestationFormat::from(id)).is_some() {
                        return Err(ParseError::InvalidCbor);
                    }
                }
                Some("attStmt") => {
                    if !value.is_map() || att_stmt.replace(value).is_some() {
                        return Err(ParseError::InvalidCbor);
                    }
                }
                Some("authData") => {
                    let bytes = value.as_bytes().ok_or(ParseError::InvalidCbor)?;
                    if auth_data.replace(bytes.clone()).is_some() {
                        return Err(ParseError::InvalidCbor);
                    }
                }
                _ => return Err(ParseError::InvalidCbor),
            }
        }
        let (Some(fmt), Some(att_stmt), Some(auth_data_bytes)) = (fmt, att_stmt, auth_data) else {
            return Err(ParseError::InvalidCbor);
        };

        Ok(Self {
            fmt,
            att_stmt,
            auth_data: AuthenticatorData::from_slice(&auth_data_bytes)?,
            auth_data_bytes: auth_data_bytes.into(),
        })
    }

    /// Look up a text-keyed member of the attestation statement.
    pub fn statement_member(&self, name: &str) -> Option<&Value> {
        self.att_stmt.as_map().and_then(|members| {
            members
                .iter()
                .find(|(key, _)| key.as_text() == Some(name))
                .map(|(_, value)| value)
        })
    }

    /// The COSE algorithm of the attested credential's public key, when
    /// attested credential data is present and carries one.
    pub fn credential_algorithm(&self) -> Option<iana::Algorithm> {
        let key: &CoseKey = &self.auth_data.attested_credential_data.as_ref()?.key;
        match key.alg.as_ref()? {
            coset::RegisteredLabelWithPrivate::Assigned(alg) => Some(*alg),
            _ => None,
        }
    }
}

/// Encode the attestation object `members` for tests and fixtures.
///
/// This is the inverse of [`AttestationObject::from_slice`] for the `"none"`
/// and `"packed"` formats this crate's ceremonies accept.
pub fn encode_attestation_object(fmt: &AttestationFormat, att_stmt: Value, auth_data: &[u8]) -> Vec<u8> {
    let map = Value::Map(vec![
        (Value::Text("fmt".to_owned()), Value::Text(fmt.as_str().to_owned())),
        (Value::Text("attStmt".to_owned()), att_stmt),
        (Value::Text("authData".to_owned()), Value::Bytes(auth_data.to_vec())),
    ]);
    let mut out = Vec::with_capacity(auth_data.len() + 32);
    // SAFETY: serializing an in-memory `Value` into a Vec cannot fail short
    // of programmer error.
    ciborium::ser::into_writer(&map, &mut out).unwrap();
    out
}
