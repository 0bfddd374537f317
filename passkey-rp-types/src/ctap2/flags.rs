use bitflags::bitflags;

bitflags! {
    /// The flag byte of [authenticator data].
    ///
    /// [authenticator data]: https://w3c.github.io/webauthn/#authdata-flags
    #[repr(transparent)]
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Flags: u8 {
        /// User Present, bit 0
        const UP = 1 << 0;
        /// User Verified, bit 2
        const UV = 1 << 2;
        /// Backup Eligibility, bit 3
        const BE = 1 << 3;
        /// Backup State, bit 4
        const BS = 1 << 4;
        /// Attested Credential Data included, bit 6
        const AT = 1 << 6;
        /// Extension Data included, bit 7
        const ED = 1 << 7;
    }
}

impl Flags {
    /// Whether the authenticator attests that a user was present.
    pub fn user_present(self) -> bool {
        self.contains(Flags::UP)
    }

    /// Whether the authenticator attests that the user was verified
    /// (biometric, PIN, or equivalent).
    pub fn user_verified(self) -> bool {
        self.contains(Flags::UV)
    }

    /// Whether the credential is currently backed up (synced).
    pub fn backed_up(self) -> bool {
        self.contains(Flags::BS)
    }
}

impl From<Flags> for u8 {
    fn from(src: Flags) -> Self {
        src.bits()
    }
}

impl TryFrom<u8> for Flags {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Flags::from_bits(value).ok_or(())
    }
}
