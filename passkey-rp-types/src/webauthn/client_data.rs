//! The client data a browser serializes and an authenticator signs over.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

/// The contextual bindings of the relying party and client at ceremony time.
///
/// Browsers serialize this to the `clientDataJSON` bytes whose hash ends up
/// under the authenticator's signature, following section [5.8.1.1
/// Serialization] of the spec: `type`, `challenge`, `origin`, `crossOrigin`
/// always present and in that order, any further members in their signature
/// order (hence the [`IndexMap`]). A relying party parses those bytes with
/// this type to check the bindings, but must hash the received bytes as-is,
/// never a re-serialization.
///
/// <https://w3c.github.io/webauthn/#dictionary-client-data>
///
/// [5.8.1.1 Serialization]: https://w3c.github.io/webauthn/#clientdatajson-serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    /// [`ClientDataType::Create`] for registration, [`ClientDataType::Get`]
    /// for authentication; binds a signature to one ceremony kind so one
    /// cannot be replayed as the other.
    #[serde(rename = "type")]
    pub ty: ClientDataType,

    /// The base64url encoding of the challenge the relying party issued.
    pub challenge: String,

    /// The fully qualified origin the client observed, [RFC6454] syntax.
    ///
    /// [RFC6454]: https://www.rfc-editor.org/rfc/rfc6454
    pub origin: String,

    /// Whether the ceremony ran inside a cross-origin iframe.
    #[serde(default, serialize_with = "truthiness")]
    pub cross_origin: Option<bool>,

    /// Members this crate does not know, preserved with their order so the
    /// original byte serialization can be reasoned about.
    #[serde(flatten)]
    pub unknown_keys: IndexMap<String, serde_json::Value>,
}

fn truthiness<S>(cross_origin: &Option<bool>, ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ser.serialize_bool(cross_origin.unwrap_or_default())
}

/// The ceremony kinds distinguishable through client data.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataType {
    /// Serializes to `"webauthn.create"`.
    #[serde(rename = "webauthn.create")]
    Create,

    /// Serializes to `"webauthn.get"`.
    #[serde(rename = "webauthn.get")]
    Get,
}

impl fmt::Display for ClientDataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ClientDataType::Create => "webauthn.create",
            ClientDataType::Get => "webauthn.get",
        })
    }
}
