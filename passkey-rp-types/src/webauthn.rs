//! The JSON shapes a relying party exchanges with browsers, after the
//! [WebAuthn Level 3] specification.
//!
//! [WebAuthn Level 3]: https://w3c.github.io/webauthn

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::{utils::serde::ignore_unknown, Bytes};

mod assertion;
mod attestation;
mod client_data;
mod common;

pub use self::{assertion::*, attestation::*, client_data::*, common::*};

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::AuthenticatorAssertionResponse {}
    impl Sealed for super::AuthenticatorAttestationResponse {}
}

/// Marker trait for the two authenticator response payloads.
pub trait AuthenticatorResponse: sealed::Sealed {}

impl AuthenticatorResponse for AuthenticatorAssertionResponse {}
impl AuthenticatorResponse for AuthenticatorAttestationResponse {}

/// The envelope a browser returns from a successful `create()` or `get()`
/// call, holding either an attestation or an assertion response.
///
/// Use the aliases for the concrete ceremonies:
/// * registration: [`CreatedPublicKeyCredential`]
/// * authentication: [`AuthenticatedPublicKeyCredential`]
///
/// <https://w3c.github.io/webauthn/#iface-pkcredential>
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[typeshare]
pub struct PublicKeyCredential<R: AuthenticatorResponse> {
    /// The credential ID as chosen by the authenticator, base64url encoded.
    /// A relying party must treat [`Self::raw_id`] as authoritative and this
    /// field as its display form.
    pub id: String,

    /// The raw bytes of the credential ID.
    pub raw_id: Bytes,

    /// Always [`PublicKeyCredentialType::PublicKey`] for known credentials.
    #[serde(rename = "type", deserialize_with = "ignore_unknown")]
    pub ty: PublicKeyCredentialType,

    /// The attestation or assertion payload.
    pub response: R,

    /// How the client reached the authenticator, if it chose to say.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown"
    )]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
}

/// The envelope produced by a registration ceremony.
#[typeshare]
pub type CreatedPublicKeyCredential = PublicKeyCredential<AuthenticatorAttestationResponse>;

/// The envelope produced by an authentication ceremony.
#[typeshare]
pub type AuthenticatedPublicKeyCredential = PublicKeyCredential<AuthenticatorAssertionResponse>;
