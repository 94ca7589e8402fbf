use std::env;
use std::time::Duration;

use url::Url;

use crate::passkey::PasskeyError;
use crate::utils::sha256;

/// Ceiling applied to every untrusted binary or JSON input before decoding.
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1024 * 1024;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CHALLENGE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserVerification {
    Required,
    Preferred,
    #[default]
    Discouraged,
}

impl UserVerification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Preferred => "preferred",
            Self::Discouraged => "discouraged",
        }
    }

    fn parse_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "required" => Self::Required,
            "preferred" => Self::Preferred,
            "discouraged" => Self::Discouraged,
            invalid => {
                tracing::warn!(
                    "Invalid user verification: {}. Using default 'discouraged'",
                    invalid
                );
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttestationPreference {
    None,
    Indirect,
    #[default]
    Direct,
    Enterprise,
}

impl AttestationPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Indirect => "indirect",
            Self::Direct => "direct",
            Self::Enterprise => "enterprise",
        }
    }

    fn parse_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "none" => Self::None,
            "indirect" => Self::Indirect,
            "direct" => Self::Direct,
            "enterprise" => Self::Enterprise,
            invalid => {
                tracing::warn!("Invalid attestation: {}. Using default 'direct'", invalid);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

impl AuthenticatorAttachment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::CrossPlatform => "cross-platform",
        }
    }

    fn parse_or_default(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "platform" => Some(Self::Platform),
            "cross-platform" => Some(Self::CrossPlatform),
            "none" => None,
            invalid => {
                tracing::warn!(
                    "Invalid authenticator attachment: {}. Using default 'cross-platform'",
                    invalid
                );
                Some(Self::CrossPlatform)
            }
        }
    }
}

/// Relying party settings shared by every ceremony.
///
/// Build one with [`PasskeyConfig::new`] and the `with_*` methods, or read it
/// from the process environment with [`PasskeyConfig::from_env`].
#[derive(Debug, Clone)]
pub struct PasskeyConfig {
    /// Serialized origin the browser reports in clientDataJSON, e.g. `https://example.com`
    pub origin: String,
    /// Relying party identifier whose SHA-256 the authenticator signs over
    pub rp_id: String,
    /// Human readable relying party name shown by the authenticator
    pub rp_name: String,
    /// Ceremony timeout advertised to the client
    pub timeout: Duration,
    /// How long an issued challenge stays valid
    pub challenge_timeout: Duration,
    pub user_verification: UserVerification,
    pub attestation: AttestationPreference,
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    pub max_input_size: usize,
    /// Upper bound for any single store call before it is reported as unavailable
    pub store_timeout: Duration,
}

impl PasskeyConfig {
    /// Creates a configuration for `origin`, deriving the RP ID from its host.
    pub fn new(origin: &str) -> Result<Self, PasskeyError> {
        let (origin, host) = parse_origin(origin)?;

        Ok(Self {
            rp_name: origin.clone(),
            origin,
            rp_id: host,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            challenge_timeout: Duration::from_secs(DEFAULT_CHALLENGE_TIMEOUT_SECS),
            user_verification: UserVerification::default(),
            attestation: AttestationPreference::default(),
            authenticator_attachment: Some(AuthenticatorAttachment::CrossPlatform),
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        })
    }

    /// Reads the configuration from environment variables.
    ///
    /// `ORIGIN` is required; everything else falls back to a default.
    pub fn from_env() -> Result<Self, PasskeyError> {
        let origin = env::var("ORIGIN")
            .map_err(|_| PasskeyError::Config("ORIGIN must be set".to_string()))?;
        let mut config = Self::new(&origin)?;

        if let Ok(rp_id) = env::var("PASSKEY_RP_ID") {
            config = config.with_rp_id(&rp_id)?;
        }
        if let Ok(rp_name) = env::var("PASSKEY_RP_NAME") {
            config.rp_name = rp_name;
        }
        config.timeout = Duration::from_secs(env_u64("PASSKEY_TIMEOUT", DEFAULT_TIMEOUT_SECS));
        config.challenge_timeout = Duration::from_secs(env_u64(
            "PASSKEY_CHALLENGE_TIMEOUT",
            DEFAULT_CHALLENGE_TIMEOUT_SECS,
        ));
        config.store_timeout = Duration::from_millis(env_u64(
            "PASSKEY_STORE_TIMEOUT_MS",
            DEFAULT_STORE_TIMEOUT_MS,
        ));
        config.max_input_size =
            env_u64("PASSKEY_MAX_INPUT_SIZE", DEFAULT_MAX_INPUT_SIZE as u64) as usize;

        if let Ok(v) = env::var("PASSKEY_USER_VERIFICATION") {
            config.user_verification = UserVerification::parse_or_default(&v);
        }
        if let Ok(v) = env::var("PASSKEY_ATTESTATION") {
            config.attestation = AttestationPreference::parse_or_default(&v);
        }
        if let Ok(v) = env::var("PASSKEY_AUTHENTICATOR_ATTACHMENT") {
            config.authenticator_attachment = AuthenticatorAttachment::parse_or_default(&v);
        }

        tracing::info!(
            "Passkey config: origin={}, rp_id={}, challenge_timeout={}s",
            config.origin,
            config.rp_id,
            config.challenge_timeout.as_secs()
        );

        Ok(config)
    }

    /// Overrides the RP ID. It must be the origin's host or a registrable suffix of it.
    pub fn with_rp_id(mut self, rp_id: &str) -> Result<Self, PasskeyError> {
        let rp_id = rp_id.trim().to_lowercase();
        let (_, host) = parse_origin(&self.origin)?;
        if rp_id.is_empty() || !(host == rp_id || host.ends_with(&format!(".{rp_id}"))) {
            return Err(PasskeyError::Config(format!(
                "RP ID {rp_id} is not a suffix of origin host {host}"
            )));
        }
        self.rp_id = rp_id;
        Ok(self)
    }

    pub fn with_rp_name(mut self, rp_name: &str) -> Self {
        self.rp_name = rp_name.to_string();
        self
    }

    pub fn with_challenge_timeout(mut self, timeout: Duration) -> Self {
        self.challenge_timeout = timeout;
        self
    }

    pub fn with_user_verification(mut self, user_verification: UserVerification) -> Self {
        self.user_verification = user_verification;
        self
    }

    pub fn with_max_input_size(mut self, max_input_size: usize) -> Self {
        self.max_input_size = max_input_size;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub(crate) fn rp_id_hash(&self) -> [u8; 32] {
        sha256(self.rp_id.as_bytes())
    }

    pub(crate) fn timeout_ms(&self) -> u32 {
        u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX)
    }
}

fn parse_origin(origin: &str) -> Result<(String, String), PasskeyError> {
    let url = Url::parse(origin.trim())
        .map_err(|e| PasskeyError::Config(format!("Invalid ORIGIN {origin}: {e}")))?;

    if !matches!(url.scheme(), "https" | "http") {
        return Err(PasskeyError::Config(format!(
            "ORIGIN must use http or https, got {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| PasskeyError::Config(format!("ORIGIN {origin} has no host")))?
        .to_lowercase();

    Ok((url.origin().ascii_serialization(), host))
}

fn env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(v) => v.parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}: {}. Using default {}", name, v, default);
            default
        }),
        Err(_) => default,
    }
}
