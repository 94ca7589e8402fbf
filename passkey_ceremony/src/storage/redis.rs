use async_trait::async_trait;
use chrono::Utc;
use redis::{self, AsyncCommands};

use crate::passkey::Challenge;

use super::errors::StorageError;
use super::types::{ChallengeKey, ChallengeSlot, ChallengeStore, TOMBSTONE_RETENTION};

const CHALLENGE_PREFIX: &str = "challenge";

// Flips the leading state byte to '1' and hands back the previous value.
const TAKE_SCRIPT: &str = r#"
local v = redis.call('GET', KEYS[1])
if not v then
    return false
end
redis.call('SET', KEYS[1], '1' .. string.sub(v, 2), 'KEEPTTL')
return v
"#;

/// Challenge slots kept in Redis as `<state>:<json>`, where state is `0`
/// for a live challenge and `1` for a tombstone.
pub struct RedisChallengeStore {
    client: redis::Client,
    take_script: redis::Script,
}

impl RedisChallengeStore {
    pub fn new(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            take_script: redis::Script::new(TAKE_SCRIPT),
        })
    }

    fn make_key(key: &ChallengeKey) -> String {
        format!("{CHALLENGE_PREFIX}:{}:{}", key.ceremony, key.user_name)
    }
}

fn encode_slot(challenge: &Challenge) -> Result<String, StorageError> {
    Ok(format!("0:{}", serde_json::to_string(challenge)?))
}

fn decode_slot(value: &str) -> Result<ChallengeSlot, StorageError> {
    let (state, json) = value
        .split_once(':')
        .ok_or_else(|| StorageError::Serde("Missing challenge slot state".to_string()))?;
    let consumed = match state {
        "0" => false,
        "1" => true,
        other => {
            return Err(StorageError::Serde(format!(
                "Unknown challenge slot state: {other}"
            )));
        }
    };
    Ok(ChallengeSlot {
        challenge: serde_json::from_str(json)?,
        consumed,
    })
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn init(&self) -> Result<(), StorageError> {
        // Verify the connection works
        let _conn = self.client.get_multiplexed_async_connection().await?;
        Ok(())
    }

    async fn put(&self, key: &ChallengeKey, challenge: Challenge) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let ttl = (challenge.expires_at + TOMBSTONE_RETENTION - Utc::now())
            .num_seconds()
            .max(1) as u64;
        let value = encode_slot(&challenge)?;
        let _: () = conn.set_ex(Self::make_key(key), value, ttl).await?;
        Ok(())
    }

    async fn take(&self, key: &ChallengeKey) -> Result<Option<ChallengeSlot>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let previous: Option<String> = self
            .take_script
            .key(Self::make_key(key))
            .invoke_async(&mut conn)
            .await?;

        previous.as_deref().map(decode_slot).transpose()
    }
}
