use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),

    /// The store did not answer within the configured bound
    #[error("Storage operation timed out")]
    Timeout,

    /// A credential with this user name already exists
    #[error("Duplicate user name")]
    DuplicateName,

    /// A credential with this credential id already exists
    #[error("Duplicate credential id")]
    DuplicateCredentialId,
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return if db_err.message().contains("credential_id") {
                    Self::DuplicateCredentialId
                } else {
                    Self::DuplicateName
                };
            }
        }
        Self::Storage(err.to_string())
    }
}
