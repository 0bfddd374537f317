//! Relying party configuration.

use chrono::Duration;
use coset::iana;
use passkey_rp_types::webauthn::UserVerificationRequirement;
use url::Url;

/// The immutable identity and policy of one relying party.
///
/// Pass a value of this to [`crate::RelyingParty::new`] rather than reading
/// ambient process state, so ceremonies against different origins can
/// coexist in one process (and in one test).
#[derive(Debug, Clone)]
pub struct RpConfig {
    /// The RP ID credentials are scoped to, usually the site's registrable
    /// domain. Its SHA-256 hash must match what authenticators report.
    pub rp_id: String,

    /// Human-palatable relying party name, display only.
    pub rp_name: String,

    /// The exact web origin ceremonies must come from. Client data origins
    /// are compared on scheme, host and port; nothing looser.
    pub origin: Url,

    /// Whether ceremonies require the user-verified flag.
    pub user_verification: UserVerificationRequirement,

    /// How long an issued challenge stays consumable.
    pub challenge_ttl: Duration,

    /// COSE algorithms accepted for new credentials, most preferred first.
    pub algorithms: Vec<iana::Algorithm>,
}

impl RpConfig {
    /// Configuration with the default policy: preferred (not required) user
    /// verification, five-minute challenges, ES256 only.
    pub fn new(rp_id: impl Into<String>, rp_name: impl Into<String>, origin: Url) -> Self {
        Self {
            rp_id: rp_id.into(),
            rp_name: rp_name.into(),
            origin,
            user_verification: UserVerificationRequirement::Preferred,
            challenge_ttl: Duration::minutes(5),
            algorithms: vec![iana::Algorithm::ES256],
        }
    }

    /// Builder method requiring the user-verified flag on every ceremony.
    pub fn require_user_verification(mut self) -> Self {
        self.user_verification = UserVerificationRequirement::Required;
        self
    }

    /// Builder method overriding the challenge lifetime.
    pub fn challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }
}
