mod config;
mod errors;
mod memory;
mod redis;
mod sqlite;
mod types;

use std::future::Future;
use std::time::Duration;

pub use config::{ChallengeStoreKind, CredentialStoreKind, StoreConfig};
pub use errors::StorageError;
pub use memory::{InMemoryChallengeStore, InMemoryCredentialStore};
pub use self::redis::RedisChallengeStore;
pub use sqlite::SqliteCredentialStore;
pub use types::{ChallengeKey, ChallengeSlot, ChallengeStore, CredentialStore};

/// Bounds a store call; an elapsed deadline becomes [`StorageError::Timeout`].
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StorageError::Timeout)?
}
