use thiserror::Error;

use crate::storage::StorageError;
use crate::utils::UtilError;

/// Errors that can occur during a passkey ceremony.
///
/// Every variant except [`PasskeyError::StoreUnavailable`] is terminal for the
/// ceremony attempt: the client has to start over with a fresh challenge.
/// Messages never carry key material, challenge bytes or raw buffer contents,
/// but they are still meant for logs; the transport layer should answer with a
/// generic failure.
#[derive(Debug, Error)]
pub enum PasskeyError {
    /// Input exceeded the configured size ceiling and was not decoded
    #[error("Input too large: {size} bytes exceeds limit of {limit}")]
    InputTooLarge { size: usize, limit: usize },

    /// Structural decoding failure of a binary or JSON structure
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("User not found")]
    UserNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    /// A response arrived for a user/ceremony with no issued challenge
    #[error("No active challenge")]
    NoActiveChallenge,

    #[error("Challenge mismatch")]
    ChallengeMismatch,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Challenge already used")]
    ChallengeAlreadyUsed,

    /// clientDataJSON `type` was not the one the ceremony expects
    #[error("Invalid client data type: expected {expected}, got {got}")]
    InvalidClientDataType { expected: &'static str, got: String },

    #[error("Origin mismatch: expected {expected}, got {got}")]
    OriginMismatch { expected: String, got: String },

    #[error("RP ID hash mismatch")]
    RpIdMismatch,

    #[error("User presence flag not set")]
    UserNotPresent,

    #[error("User verification required but flag not set")]
    UserVerificationRequired,

    /// The response names a credential or user handle other than the expected one
    #[error("Credential mismatch: {0}")]
    CredentialMismatch(String),

    #[error("Credential already registered")]
    CredentialAlreadyRegistered,

    /// The attestation statement is inconsistent with the attested credential
    #[error("Invalid attestation: {0}")]
    InvalidAttestation(String),

    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature counter did not increase; the authenticator may have been cloned
    #[error("Possible cloned authenticator: counter {received} does not exceed stored {stored}")]
    PossibleCloneDetected { stored: u32, received: u32 },

    /// Transient storage failure or timeout; the only retryable error
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl PasskeyError {
    /// Whether the caller may retry the same operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Whether this error is one of the existence checks performed when a
    /// challenge is issued. Those are already observable by any client, so the
    /// transport layer may report them as such.
    pub fn is_existence_error(&self) -> bool {
        matches!(self, Self::UserNotFound | Self::UserAlreadyExists)
    }

    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::StoreUnavailable(msg) => tracing::error!("Store unavailable: {}", msg),
            Self::Config(msg) => tracing::error!("Configuration error: {}", msg),
            Self::Utils(err) => tracing::error!("Utils error: {}", err),
            Self::PossibleCloneDetected { stored, received } => tracing::warn!(
                "Possible cloned authenticator: stored counter {}, received {}",
                stored,
                received
            ),
            other => tracing::warn!("Passkey ceremony rejected: {}", other),
        }
        self
    }
}

impl From<StorageError> for PasskeyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateName => Self::UserAlreadyExists,
            StorageError::DuplicateCredentialId => Self::CredentialAlreadyRegistered,
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}
