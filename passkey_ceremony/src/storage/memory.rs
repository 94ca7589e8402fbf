use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::passkey::{Challenge, UserCredential};

use super::errors::StorageError;
use super::types::{ChallengeKey, ChallengeSlot, ChallengeStore, CredentialStore};

/// Challenge slots held in process memory.
///
/// Stale tombstones are swept whenever a slot is written.
#[derive(Default)]
pub struct InMemoryChallengeStore {
    slots: Mutex<HashMap<ChallengeKey, ChallengeSlot>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory challenge store");
        Self::default()
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn put(&self, key: &ChallengeKey, challenge: Challenge) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut slots = self.slots.lock().await;
        slots.retain(|_, slot| !slot.is_stale_at(now));
        slots.insert(key.clone(), ChallengeSlot::fresh(challenge));
        Ok(())
    }

    async fn take(&self, key: &ChallengeKey) -> Result<Option<ChallengeSlot>, StorageError> {
        let now = Utc::now();
        let mut slots = self.slots.lock().await;

        let Some(slot) = slots.get_mut(key) else {
            return Ok(None);
        };
        if slot.is_stale_at(now) {
            slots.remove(key);
            return Ok(None);
        }

        let previous = slot.clone();
        slot.consumed = true;
        Ok(Some(previous))
    }
}

/// Credential records held in process memory, keyed by user name.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: Mutex<HashMap<String, UserCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory credential store");
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<UserCredential>, StorageError> {
        Ok(self.credentials.lock().await.get(name).cloned())
    }

    async fn get_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserCredential>, StorageError> {
        let credentials = self.credentials.lock().await;
        Ok(credentials
            .values()
            .find(|c| c.credential_id == credential_id)
            .cloned())
    }

    async fn insert(&self, credential: UserCredential) -> Result<(), StorageError> {
        let mut credentials = self.credentials.lock().await;
        if credentials.contains_key(&credential.name) {
            return Err(StorageError::DuplicateName);
        }
        if credentials
            .values()
            .any(|c| c.credential_id == credential.credential_id)
        {
            return Err(StorageError::DuplicateCredentialId);
        }
        credentials.insert(credential.name.clone(), credential);
        Ok(())
    }

    async fn update_sign_counter(
        &self,
        name: &str,
        expected_counter: u32,
        expected_uses: u64,
        new_counter: u32,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut credentials = self.credentials.lock().await;
        match credentials.get_mut(name) {
            Some(credential)
                if credential.sign_counter == expected_counter
                    && credential.use_count == expected_uses =>
            {
                credential.sign_counter = new_counter;
                credential.use_count += 1;
                credential.last_used_at = Some(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
