use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::passkey::{CeremonyType, Challenge, UserCredential};

use super::errors::StorageError;

/// How long a consumed or expired challenge is kept after its expiry, so that
/// a replay is reported as such rather than as a missing challenge.
pub(crate) const TOMBSTONE_RETENTION: chrono::Duration = chrono::Duration::minutes(10);

/// Identifies the single challenge slot of a user for one ceremony.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChallengeKey {
    pub user_name: String,
    pub ceremony: CeremonyType,
}

impl ChallengeKey {
    pub fn new(user_name: &str, ceremony: CeremonyType) -> Self {
        Self {
            user_name: user_name.to_string(),
            ceremony,
        }
    }
}

impl fmt::Display for ChallengeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ceremony, self.user_name)
    }
}

/// Stored state of a challenge slot. A consumed slot is a tombstone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeSlot {
    pub challenge: Challenge,
    pub consumed: bool,
}

impl ChallengeSlot {
    pub fn fresh(challenge: Challenge) -> Self {
        Self {
            challenge,
            consumed: false,
        }
    }

    /// Whether the slot may be dropped entirely, tombstone included.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.challenge.expires_at + TOMBSTONE_RETENTION
    }
}

/// Holds at most one challenge per (user, ceremony).
#[async_trait]
pub trait ChallengeStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Store a fresh challenge, replacing whatever the slot held before.
    async fn put(&self, key: &ChallengeKey, challenge: Challenge) -> Result<(), StorageError>;

    /// Atomically mark the slot consumed and return its previous state.
    ///
    /// Of any number of concurrent callers for the same key, at most one
    /// observes `consumed == false`.
    async fn take(&self, key: &ChallengeKey) -> Result<Option<ChallengeSlot>, StorageError>;
}

/// Persistent credential records keyed by user name.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<UserCredential>, StorageError>;

    async fn get_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserCredential>, StorageError>;

    /// Insert a new record. Fails with [`StorageError::DuplicateName`] or
    /// [`StorageError::DuplicateCredentialId`] instead of overwriting.
    async fn insert(&self, credential: UserCredential) -> Result<(), StorageError>;

    /// Compare-and-swap of the signature counter.
    ///
    /// Writes `new_counter` and increments `use_count` only while the record
    /// still holds `expected_counter` and `expected_uses`. Returns `false`
    /// without writing otherwise, or when no record named `name` exists.
    async fn update_sign_counter(
        &self,
        name: &str,
        expected_counter: u32,
        expected_uses: u64,
        new_counter: u32,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;
}
