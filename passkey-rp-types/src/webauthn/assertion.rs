//! Types specific to exercising an existing credential (the authentication
//! ceremony).

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::{
    utils::serde::{ignore_unknown, ignore_unknown_opt_vec},
    webauthn::{PublicKeyCredentialDescriptor, UserVerificationRequirement},
    Bytes,
};

/// The `publicKey` member handed to `navigator.credentials.get`.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialrequestoptions>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[typeshare]
pub struct PublicKeyCredentialRequestOptions {
    /// The challenge the authenticator signs over, alongside other data.
    pub challenge: Bytes,

    /// A hint, in milliseconds, for how long the client should wait.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// The RP ID the assertion must be scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,

    /// Descriptors of the credentials eligible for this ceremony, most
    /// preferred first. Empty or absent means any discoverable credential
    /// scoped to the RP may answer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown_opt_vec"
    )]
    pub allow_credentials: Option<Vec<PublicKeyCredentialDescriptor>>,

    /// User verification requirement for the `get()` operation.
    #[serde(default, deserialize_with = "ignore_unknown")]
    pub user_verification: UserVerificationRequirement,
}

/// The authenticator's proof of possession of a credential's private key.
///
/// <https://w3c.github.io/webauthn/#iface-authenticatorassertionresponse>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[typeshare]
pub struct AuthenticatorAssertionResponse {
    /// The JSON serialization of the client data. The exact bytes must be
    /// preserved since the signature covers their hash.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Bytes,

    /// The raw authenticator data that was signed over; decode with
    /// [`crate::ctap2::AuthenticatorData::from_slice`].
    pub authenticator_data: Bytes,

    /// The raw signature, ASN.1 DER for ES256 credentials.
    pub signature: Bytes,

    /// The user handle of the signing credential's owner, when the
    /// authenticator discloses it (discoverable credential flows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Bytes>,
}
