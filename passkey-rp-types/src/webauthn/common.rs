//! Types shared between the registration and authentication ceremonies.

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::{
    utils::serde::{ignore_unknown, ignore_unknown_opt_vec},
    Bytes,
};

/// The valid credential types. Webauthn currently defines a single variant;
/// unknown values deserialize to [`Self::Unknown`] so that lists containing
/// future types can be filtered rather than rejected.
///
/// <https://w3c.github.io/webauthn/#enumdef-publickeycredentialtype>
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[typeshare(serialized_as = "String")]
pub enum PublicKeyCredentialType {
    /// The public part of an asymmetric key pair.
    PublicKey,
    /// Default used when deserializing a value this crate does not know.
    #[default]
    Unknown,
}

/// Identifies one specific credential, used for exclusion lists at
/// registration and allow lists at authentication.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialdescriptor>
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[typeshare]
pub struct PublicKeyCredentialDescriptor {
    /// The credential type this descriptor refers to.
    #[serde(rename = "type", deserialize_with = "ignore_unknown")]
    pub ty: PublicKeyCredentialType,

    /// The raw credential ID.
    pub id: Bytes,

    /// Hints about how the managing authenticator can be reached; relying
    /// parties should echo back the transports recorded at registration.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ignore_unknown_opt_vec"
    )]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

impl PublicKeyCredentialDescriptor {
    /// Build a descriptor for a known public-key credential.
    pub fn public_key(id: Bytes, transports: Option<Vec<AuthenticatorTransport>>) -> Self {
        Self {
            ty: PublicKeyCredentialType::PublicKey,
            id,
            transports,
        }
    }
}

/// How strongly the relying party insists on [user verification] for an
/// operation.
///
/// <https://w3c.github.io/webauthn/#enumdef-userverificationrequirement>
///
/// [user verification]: https://w3c.github.io/webauthn/#user-verification
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[typeshare(serialized_as = "String")]
pub enum UserVerificationRequirement {
    /// The ceremony fails unless the UV flag comes back set.
    Required,

    /// UV is requested but its absence does not fail the ceremony.
    #[default]
    Preferred,

    /// UV should not be employed.
    Discouraged,
}

impl UserVerificationRequirement {
    /// Whether this requirement makes a missing UV flag fatal.
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }
}

/// The transports over which an authenticator may be reachable.
///
/// <https://w3c.github.io/webauthn/#enum-transport>
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[typeshare(serialized_as = "String")]
pub enum AuthenticatorTransport {
    /// Removable USB.
    Usb,

    /// Near Field Communication.
    Nfc,

    /// Bluetooth Low Energy.
    Ble,

    /// Separate data-transport and proximity mechanisms, e.g. signing in on
    /// a desktop with a phone. `cable` is the pre-standard spelling.
    #[serde(alias = "cable")]
    Hybrid,

    /// A platform authenticator built into the client device.
    Internal,
}

/// Authenticator attachment modalities.
///
/// <https://w3c.github.io/webauthn/#enumdef-authenticatorattachment>
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[typeshare(serialized_as = "String")]
pub enum AuthenticatorAttachment {
    /// Built into the client device.
    Platform,

    /// Removable and able to roam between devices.
    CrossPlatform,
}
