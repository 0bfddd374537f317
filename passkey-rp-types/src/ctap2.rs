//! Authenticator-emitted binary structures, as defined by the [CTAP2] and
//! [WebAuthn] specifications.
//!
//! Everything in this module is parsed out of attacker-supplied bytes;
//! decoding is strict about structure but makes no trust decisions.
//!
//! [CTAP2]: https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html
//! [WebAuthn]: https://w3c.github.io/webauthn/

mod auth_data;
mod flags;

pub use self::{
    auth_data::{AttestedCredentialData, AuthenticatorData, ParseError},
    flags::Flags,
};
