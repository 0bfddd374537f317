use std::{
    io::{Cursor, Read},
    num::TryFromIntError,
};

use ciborium::value::Value;
use coset::{AsCborValue, CborSerializable, CoseKey};

use crate::{crypto::sha256, ctap2::Flags};

/// Why a byte slice failed to decode as [`AuthenticatorData`].
///
/// These carry no attacker-controlled payloads on purpose; the bytes
/// themselves are the only context a caller should ever log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The input ended before a required field was complete.
    UnexpectedEnd,
    /// The flag byte uses bits the specification reserves.
    InvalidFlags,
    /// An embedded CBOR item (COSE key or extension map) failed to decode.
    InvalidCbor,
    /// Bytes remained after the structure was fully decoded.
    TrailingBytes,
    /// A length field exceeds what its encoding can represent.
    LengthOutOfRange,
}

impl From<TryFromIntError> for ParseError {
    fn from(_: TryFromIntError) -> Self {
        ParseError::LengthOutOfRange
    }
}

/// The contextual bindings an authenticator signs over during a ceremony.
///
/// The relying party receives this structure inside attestation objects at
/// registration and directly (base64url) at authentication. Its trust value
/// depends entirely on the signature that covers it; this type only recovers
/// the fields.
///
/// <https://w3c.github.io/webauthn/#sctn-authenticator-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    /// SHA-256 hash of the RP ID the credential is scoped to.
    rp_id_hash: [u8; 32],

    /// The state of the UP/UV/BE/BS/AT/ED bits for this ceremony.
    pub flags: Flags,

    /// Signature counter, 32-bit unsigned big-endian integer. Authenticators
    /// that do not implement counters send zero.
    pub counter: u32,

    /// Present when [`Flags::AT`] is set: the newly minted credential's
    /// identifier and public key.
    pub attested_credential_data: Option<AttestedCredentialData>,

    /// Present when [`Flags::ED`] is set: a CBOR map of extension outputs.
    /// Kept as a raw [`Value`] since this crate implements no extensions.
    pub extensions: Option<Value>,
}

impl AuthenticatorData {
    /// Build authenticator data for `rp_id` with the given counter and no
    /// flags set. Primarily useful for constructing test fixtures.
    pub fn new(rp_id: &str, counter: u32) -> Self {
        Self {
            rp_id_hash: sha256(rp_id.as_bytes()),
            flags: Flags::empty(),
            counter,
            attested_credential_data: None,
            extensions: None,
        }
    }

    /// Attach attested credential data, setting [`Flags::AT`] as well.
    pub fn with_attested_credential_data(mut self, acd: AttestedCredentialData) -> Self {
        self.attested_credential_data = Some(acd);
        self.with_flags(Flags::AT)
    }

    /// Set additional [`Flags`].
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags |= flags;
        self
    }

    /// Read access to the RP ID hash.
    pub fn rp_id_hash(&self) -> &[u8; 32] {
        &self.rp_id_hash
    }

    /// Whether this data was produced for `rp_id`.
    ///
    /// Plain comparison is fine here: both sides of the hash are public.
    pub fn is_for_rp_id(&self, rp_id: &str) -> bool {
        self.rp_id_hash == sha256(rp_id.as_bytes())
    }

    /// Decode authenticator data from its binary representation.
    ///
    /// Decoding is exhaustive: inputs with bytes left over after all
    /// flagged substructures are rejected with [`ParseError::TrailingBytes`].
    pub fn from_slice(input: &[u8]) -> Result<Self, ParseError> {
        // rp id hash (32) + flags (1) + counter (4)
        if input.len() < 37 {
            return Err(ParseError::UnexpectedEnd);
        }
        let (fixed, rest) = input.split_at(37);

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&fixed[..32]);
        let flags = Flags::from_bits(fixed[32]).ok_or(ParseError::InvalidFlags)?;
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&fixed[33..37]);
        let counter = u32::from_be_bytes(counter);

        let mut reader = Cursor::new(rest);
        let attested_credential_data = flags
            .contains(Flags::AT)
            .then(|| AttestedCredentialData::from_reader(&mut reader))
            .transpose()?;
        let extensions = flags
            .contains(Flags::ED)
            .then(|| {
                let ext: Value =
                    ciborium::de::from_reader(&mut reader).map_err(|_| ParseError::InvalidCbor)?;
                // The spec defines this as a map of extension identifiers.
                ext.is_map().then_some(ext).ok_or(ParseError::InvalidCbor)
            })
            .transpose()?;

        if reader.position() != u64::try_from(rest.len()).map_err(|_| ParseError::UnexpectedEnd)? {
            return Err(ParseError::TrailingBytes);
        }

        Ok(Self {
            rp_id_hash,
            flags,
            counter,
            attested_credential_data,
            extensions,
        })
    }

    /// Encode to the binary representation that gets signed over.
    pub fn to_vec(&self) -> Vec<u8> {
        let flags = if self.attested_credential_data.is_some() {
            self.flags | Flags::AT
        } else {
            self.flags
        };

        let mut out = Vec::with_capacity(37);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(flags.into());
        out.extend_from_slice(&self.counter.to_be_bytes());
        if let Some(acd) = &self.attested_credential_data {
            acd.encode_into(&mut out);
        }
        if let Some(ext) = &self.extensions {
            // SAFETY: serializing an in-memory `Value` into a Vec cannot fail
            // short of programmer error.
            ciborium::ser::into_writer(ext, &mut out).unwrap();
        }
        out
    }
}

/// The credential identifier and public key minted during registration,
/// embedded in [`AuthenticatorData`] when [`Flags::AT`] is set.
///
/// <https://w3c.github.io/webauthn/#attested-credential-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AttestedCredentialData {
    /// The authenticator's AAGUID. Authenticators doing self or no
    /// attestation typically send all zeroes; relying parties that do not
    /// build vendor trust chains have no use for it beyond display.
    pub aaguid: [u8; 16],

    /// The credential ID. Kept private so its length always fits the
    /// two-byte prefix of the wire format.
    credential_id: Vec<u8>,

    /// The credential public key in COSE_Key form, `alg` included.
    pub key: CoseKey,
}

impl AttestedCredentialData {
    /// Create attested credential data.
    ///
    /// # Errors
    /// Fails if `credential_id` is longer than a `u16` can describe.
    pub fn new(
        aaguid: [u8; 16],
        credential_id: Vec<u8>,
        key: CoseKey,
    ) -> Result<Self, TryFromIntError> {
        u16::try_from(credential_id.len())?;
        Ok(Self {
            aaguid,
            credential_id,
            key,
        })
    }

    /// Read access to the credential ID.
    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, ParseError> {
        let mut aaguid = [0u8; 16];
        reader
            .read_exact(&mut aaguid)
            .map_err(|_| ParseError::UnexpectedEnd)?;

        let mut len = [0u8; 2];
        reader
            .read_exact(&mut len)
            .map_err(|_| ParseError::UnexpectedEnd)?;
        let mut credential_id = vec![0u8; usize::from(u16::from_be_bytes(len))];
        reader
            .read_exact(&mut credential_id)
            .map_err(|_| ParseError::UnexpectedEnd)?;

        let cose_value: Value =
            ciborium::de::from_reader(reader).map_err(|_| ParseError::InvalidCbor)?;
        let key = CoseKey::from_cbor_value(cose_value).map_err(|_| ParseError::InvalidCbor)?;

        Ok(Self {
            aaguid,
            credential_id,
            key,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.aaguid);
        // SAFETY: the constructor asserted the length fits in a u16.
        out.extend_from_slice(&u16::try_from(self.credential_id.len()).unwrap().to_be_bytes());
        out.extend_from_slice(&self.credential_id);
        // SAFETY: serializing a structurally valid CoseKey only fails on
        // programmer error; coset's serializer takes the key by value.
        out.extend_from_slice(&self.key.clone().to_vec().unwrap());
    }
}
