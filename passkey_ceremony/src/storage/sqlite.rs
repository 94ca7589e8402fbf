use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

use crate::passkey::{PublicKey, UserCredential};

use super::errors::StorageError;
use super::types::CredentialStore;

const TABLE: &str = "passkey_credentials";

/// Credential records in a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteCredentialStore {
    pool: Pool<Sqlite>,
}

impl SqliteCredentialStore {
    /// Opens (creating if missing) the database at `url` and ensures the table exists.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Every connection to an in-memory database sees its own empty database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, StorageError> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }
}

fn credential_from_row(row: &SqliteRow) -> Result<UserCredential, StorageError> {
    let public_key: String = row.try_get("public_key")?;
    let public_key: PublicKey = serde_json::from_str(&public_key)?;

    let aaguid: Vec<u8> = row.try_get("aaguid")?;
    let aaguid: [u8; 16] = aaguid
        .try_into()
        .map_err(|_| StorageError::Storage("Stored AAGUID is not 16 bytes".to_string()))?;

    let sign_counter: i64 = row.try_get("sign_counter")?;
    let sign_counter = u32::try_from(sign_counter)
        .map_err(|_| StorageError::Storage(format!("Stored counter out of range: {sign_counter}")))?;

    let use_count: i64 = row.try_get("use_count")?;
    let use_count = u64::try_from(use_count)
        .map_err(|_| StorageError::Storage(format!("Stored use count out of range: {use_count}")))?;

    Ok(UserCredential {
        name: row.try_get("name")?,
        credential_id: row.try_get("credential_id")?,
        user_handle: row.try_get("user_handle")?,
        public_key,
        sign_counter,
        use_count,
        aaguid,
        attestation_format: row.try_get("attestation_format")?,
        created_at: row.try_get("created_at")?,
        last_used_at: row.try_get("last_used_at")?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {TABLE} (
                name TEXT PRIMARY KEY NOT NULL,
                credential_id BLOB NOT NULL UNIQUE,
                user_handle BLOB NOT NULL,
                public_key TEXT NOT NULL,
                aaguid BLOB NOT NULL,
                attestation_format TEXT NOT NULL,
                sign_counter INTEGER NOT NULL DEFAULT 0,
                use_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                last_used_at TIMESTAMP
            )
            "#
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<UserCredential>, StorageError> {
        let row = sqlx::query(&format!("SELECT * FROM {TABLE} WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(credential_from_row).transpose()
    }

    async fn get_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserCredential>, StorageError> {
        let row = sqlx::query(&format!("SELECT * FROM {TABLE} WHERE credential_id = ?"))
            .bind(credential_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(credential_from_row).transpose()
    }

    async fn insert(&self, credential: UserCredential) -> Result<(), StorageError> {
        let public_key = serde_json::to_string(&credential.public_key)?;
        let use_count = i64::try_from(credential.use_count)
            .map_err(|_| StorageError::Storage("Use count out of range".to_string()))?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {TABLE}
            (name, credential_id, user_handle, public_key, aaguid, attestation_format, sign_counter, use_count, created_at, last_used_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        ))
        .bind(&credential.name)
        .bind(&credential.credential_id)
        .bind(&credential.user_handle)
        .bind(public_key)
        .bind(credential.aaguid.as_slice())
        .bind(&credential.attestation_format)
        .bind(i64::from(credential.sign_counter))
        .bind(use_count)
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&self.pool)
        .await?;

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
        let expected_uses = i64::try_from(expected_uses)
            .map_err(|_| StorageError::Storage("Use count out of range".to_string()))?;

        let result = sqlx::query(&format!(
            r#"
            UPDATE {TABLE}
            SET sign_counter = ?, use_count = use_count + 1, last_used_at = ?
            WHERE name = ? AND sign_counter = ? AND use_count = ?
            "#
        ))
        .bind(i64::from(new_counter))
        .bind(used_at)
        .bind(name)
        .bind(i64::from(expected_counter))
        .bind(expected_uses)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
