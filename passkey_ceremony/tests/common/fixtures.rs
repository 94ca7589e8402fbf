//! Shared setup for the integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Barrier, Notify};
use chrono::{DateTime, Utc};
use passkey_ceremony::{
    AuthenticationFinishRequest, AuthenticationResult, Challenge, ChallengeKey, ChallengeSlot,
    ChallengeStore, CredentialStore, InMemoryChallengeStore, InMemoryCredentialStore,
    PasskeyCeremony, PasskeyConfig, PasskeyError, RegistrationFinishRequest, RegistrationResult,
    StorageError, UserCredential,
};

use super::VirtualAuthenticator;

pub const ORIGIN: &str = "http://localhost:5173";
pub const RP_ID: &str = "localhost";

pub fn test_config() -> PasskeyConfig {
    PasskeyConfig::new(ORIGIN).expect("valid test origin")
}

pub fn memory_ceremony(config: PasskeyConfig) -> PasskeyCeremony {
    PasskeyCeremony::new(
        config,
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(InMemoryChallengeStore::new()),
    )
}

pub async fn register(
    ceremony: &PasskeyCeremony,
    authenticator: &mut VirtualAuthenticator,
    name: &str,
) -> Result<RegistrationResult, PasskeyError> {
    let options = ceremony.start_registration(name).await?;
    let credential = authenticator.create(&options);
    ceremony
        .finish_registration(&RegistrationFinishRequest {
            name: name.to_string(),
            attestation_response: credential,
        })
        .await
}

pub async fn authenticate(
    ceremony: &PasskeyCeremony,
    authenticator: &mut VirtualAuthenticator,
    name: &str,
) -> Result<AuthenticationResult, PasskeyError> {
    let options = ceremony.start_authentication(name).await?;
    let assertion = authenticator.get(&options);
    ceremony
        .finish_authentication(&AuthenticationFinishRequest {
            name: name.to_string(),
            assertion_response: assertion,
        })
        .await
}

/// Credential store whose counter update always loses to a concurrent writer.
pub struct RacingCredentialStore {
    pub inner: InMemoryCredentialStore,
}

#[async_trait]
impl CredentialStore for RacingCredentialStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<UserCredential>, StorageError> {
        self.inner.get_by_name(name).await
    }

    async fn get_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserCredential>, StorageError> {
        self.inner.get_by_credential_id(credential_id).await
    }

    async fn insert(&self, credential: UserCredential) -> Result<(), StorageError> {
        self.inner.insert(credential).await
    }

    async fn update_sign_counter(
        &self,
        name: &str,
        expected_counter: u32,
        expected_uses: u64,
        new_counter: u32,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        // The competing authentication lands first
        self.inner
            .update_sign_counter(name, expected_counter, expected_uses, new_counter + 10, used_at)
            .await?;
        self.inner
            .update_sign_counter(name, expected_counter, expected_uses, new_counter, used_at)
            .await
    }
}

/// Credential store that holds every counter update until two are in flight.
pub struct GatedCredentialStore {
    pub inner: InMemoryCredentialStore,
    /// Signalled when an update reaches the gate
    pub entered: Notify,
    gate: Barrier,
}

impl GatedCredentialStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryCredentialStore::new(),
            entered: Notify::new(),
            gate: Barrier::new(2),
        }
    }
}

#[async_trait]
impl CredentialStore for GatedCredentialStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<UserCredential>, StorageError> {
        self.inner.get_by_name(name).await
    }

    async fn get_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserCredential>, StorageError> {
        self.inner.get_by_credential_id(credential_id).await
    }

    async fn insert(&self, credential: UserCredential) -> Result<(), StorageError> {
        self.inner.insert(credential).await
    }

    async fn update_sign_counter(
        &self,
        name: &str,
        expected_counter: u32,
        expected_uses: u64,
        new_counter: u32,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        self.entered.notify_one();
        self.gate.wait().await;
        self.inner
            .update_sign_counter(name, expected_counter, expected_uses, new_counter, used_at)
            .await
    }
}

/// Challenge store that never answers within any sane deadline.
pub struct StalledChallengeStore;

#[async_trait]
impl ChallengeStore for StalledChallengeStore {
    async fn put(&self, _key: &ChallengeKey, _challenge: Challenge) -> Result<(), StorageError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn take(&self, _key: &ChallengeKey) -> Result<Option<ChallengeSlot>, StorageError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }
}
