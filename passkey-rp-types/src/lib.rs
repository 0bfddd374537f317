//! # Passkey RP Types
//!
//! Type definitions and binary decoding for a webauthn [Relying Party].
//!
//! This crate owns the data shapes a relying party exchanges with browsers
//! ([`webauthn`]) and the attacker-supplied binary structures it must decode
//! before any trust decision can be made ([`ctap2`]): authenticator data,
//! attested credential data and attestation objects. Decoding is kept free
//! of cryptographic policy; callers decide what a parsed structure is worth.
//!
//! [Relying Party]: https://w3c.github.io/webauthn/#relying-party

mod utils;

pub mod ctap2;
pub mod webauthn;

// Re-exports
pub use utils::{
    bytes::{Bytes, NotBase64Encoded},
    crypto, encoding, rand,
};
