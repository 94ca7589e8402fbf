use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use subtle::ConstantTimeEq;

use crate::config::PasskeyConfig;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CeremonyType, Challenge};
use crate::storage::{ChallengeKey, ChallengeStore, CredentialStore, with_timeout};
use crate::utils::gen_random_bytes;

const CHALLENGE_LEN: usize = 32;
const USER_HANDLE_LEN: usize = 16;

/// Issues and consumes one-time challenges.
///
/// Each (user, ceremony) pair has a single slot; issuing replaces whatever it
/// held, and consuming is an atomic take so a challenge is accepted at most once.
#[derive(Clone)]
pub struct ChallengeManager {
    store: Arc<dyn ChallengeStore>,
    credentials: Arc<dyn CredentialStore>,
    ttl: chrono::Duration,
    store_timeout: Duration,
}

impl ChallengeManager {
    pub fn new(
        config: &PasskeyConfig,
        store: Arc<dyn ChallengeStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let ttl = chrono::Duration::from_std(config.challenge_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        Self {
            store,
            credentials,
            ttl,
            store_timeout: config.store_timeout,
        }
    }

    /// Issues a fresh challenge after the existence check for the ceremony:
    /// registration needs an unknown name, authentication a known one.
    pub async fn issue(
        &self,
        user_name: &str,
        ceremony: CeremonyType,
    ) -> Result<Challenge, PasskeyError> {
        let existing =
            with_timeout(self.store_timeout, self.credentials.get_by_name(user_name)).await?;
        match (ceremony, existing.is_some()) {
            (CeremonyType::Registration, true) => return Err(PasskeyError::UserAlreadyExists),
            (CeremonyType::Authentication, false) => return Err(PasskeyError::UserNotFound),
            _ => {}
        }

        let user_handle = match ceremony {
            CeremonyType::Registration => Some(gen_random_bytes(USER_HANDLE_LEN)?),
            CeremonyType::Authentication => None,
        };

        let issued_at = Utc::now();
        let challenge = Challenge {
            value: gen_random_bytes(CHALLENGE_LEN)?,
            ceremony,
            user_name: user_name.to_string(),
            user_handle,
            issued_at,
            expires_at: issued_at + self.ttl,
        };

        let key = ChallengeKey::new(user_name, ceremony);
        with_timeout(self.store_timeout, self.store.put(&key, challenge.clone())).await?;

        tracing::debug!("Issued {} challenge for {}", ceremony, user_name);
        Ok(challenge)
    }

    /// Consumes the outstanding challenge, accepting it only if `provided`
    /// matches and it has not expired. The slot is burned either way.
    pub async fn consume(
        &self,
        user_name: &str,
        ceremony: CeremonyType,
        provided: &[u8],
    ) -> Result<Challenge, PasskeyError> {
        let challenge = self.take(user_name, ceremony).await?;

        if challenge.is_expired_at(Utc::now()) {
            tracing::warn!(
                "{} challenge for {} expired at {}",
                ceremony,
                user_name,
                challenge.expires_at
            );
            return Err(PasskeyError::ChallengeExpired);
        }

        if !bool::from(provided.ct_eq(challenge.value.as_slice())) {
            return Err(PasskeyError::ChallengeMismatch);
        }

        Ok(challenge)
    }

    /// Burns the outstanding challenge without comparing it.
    pub async fn invalidate(&self, user_name: &str, ceremony: CeremonyType) -> Result<(), PasskeyError> {
        self.take(user_name, ceremony).await.map(|_| ())
    }

    async fn take(&self, user_name: &str, ceremony: CeremonyType) -> Result<Challenge, PasskeyError> {
        let key = ChallengeKey::new(user_name, ceremony);
        let slot = with_timeout(self.store_timeout, self.store.take(&key))
            .await?
            .ok_or(PasskeyError::NoActiveChallenge)?;

        if slot.consumed {
            return Err(PasskeyError::ChallengeAlreadyUsed);
        }
        Ok(slot.challenge)
    }
}
