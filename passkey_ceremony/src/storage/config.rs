use std::env;
use std::sync::Arc;

use super::errors::StorageError;
use super::memory::{InMemoryChallengeStore, InMemoryCredentialStore};
use super::redis::RedisChallengeStore;
use super::sqlite::SqliteCredentialStore;
use super::types::{ChallengeStore, CredentialStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeStoreKind {
    Memory,
    Redis(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStoreKind {
    Memory,
    Sqlite(String),
}

/// Selects the storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub challenges: ChallengeStoreKind,
    pub credentials: CredentialStoreKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            challenges: ChallengeStoreKind::Memory,
            credentials: CredentialStoreKind::Memory,
        }
    }
}

impl StoreConfig {
    /// Reads `GENERIC_CACHE_STORE_TYPE`/`_URL` and `GENERIC_DATA_STORE_TYPE`/`_URL`.
    ///
    /// Both types default to `memory` when unset.
    pub fn from_env() -> Result<Self, StorageError> {
        let challenges = match env_or("GENERIC_CACHE_STORE_TYPE", "memory").as_str() {
            "memory" => ChallengeStoreKind::Memory,
            "redis" => ChallengeStoreKind::Redis(required("GENERIC_CACHE_STORE_URL")?),
            t => {
                return Err(StorageError::Storage(format!(
                    "Unsupported cache store type: {t}. Supported types are 'memory' and 'redis'"
                )));
            }
        };

        let credentials = match env_or("GENERIC_DATA_STORE_TYPE", "memory").as_str() {
            "memory" => CredentialStoreKind::Memory,
            "sqlite" => CredentialStoreKind::Sqlite(required("GENERIC_DATA_STORE_URL")?),
            t => {
                return Err(StorageError::Storage(format!(
                    "Unsupported data store type: {t}. Supported types are 'memory' and 'sqlite'"
                )));
            }
        };

        Ok(Self {
            challenges,
            credentials,
        })
    }

    /// Connects both stores and verifies they are reachable.
    pub async fn build(
        &self,
    ) -> Result<(Arc<dyn CredentialStore>, Arc<dyn ChallengeStore>), StorageError> {
        let credentials: Arc<dyn CredentialStore> = match &self.credentials {
            CredentialStoreKind::Memory => Arc::new(InMemoryCredentialStore::new()),
            CredentialStoreKind::Sqlite(url) => {
                tracing::info!("Connecting credential store: sqlite, url={}", url);
                Arc::new(SqliteCredentialStore::connect(url).await?)
            }
        };

        let challenges: Arc<dyn ChallengeStore> = match &self.challenges {
            ChallengeStoreKind::Memory => Arc::new(InMemoryChallengeStore::new()),
            ChallengeStoreKind::Redis(url) => {
                tracing::info!("Connecting challenge store: redis, url={}", url);
                let store = RedisChallengeStore::new(url)?;
                store.init().await?;
                Arc::new(store)
            }
        };

        Ok((credentials, challenges))
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &str) -> Result<String, StorageError> {
    env::var(name).map_err(|_| StorageError::Storage(format!("{name} must be set")))
}
