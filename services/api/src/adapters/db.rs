//! services/api/src/adapters/db.rs
//!
//! This module contains the storage adapter, which is the concrete implementation
//! of the `DurableStorage` port from the `core` crate. It keeps one JSON document
//! per logical key in a SQLite `kv` table using `sqlx`.

use async_trait::async_trait;
use nayra_core::domain::{HistoryItem, HistoryItemType, User};
use nayra_core::ports::{DurableStorage, PortError, PortResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::debug;

/// Durable key for the signed-up user's profile.
pub const USER_KEY: &str = "nayra-ai-user";
/// Durable key for the provider API key.
pub const API_KEY_KEY: &str = "gemini-api-key";
/// Durable key for the history list.
pub const HISTORY_KEY: &str = "nayra-ai-history";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `DurableStorage` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the SQLite database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> PortResult<Option<T>> {
        let record = sqlx::query_as::<_, KvRecord>("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => serde_json::from_str(&record.value)
                .map(Some)
                .map_err(|e| PortError::Corrupt(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PortResult<()> {
        let json = serde_json::to_string(value).map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!("Writing {} bytes to {}", json.len(), key);

        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================

#[derive(FromRow)]
struct KvRecord {
    value: String,
}

#[derive(Serialize, Deserialize)]
struct UserRecord {
    name: String,
    email: String,
}
impl UserRecord {
    fn from_domain(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    fn to_domain(self) -> User {
        User {
            name: self.name,
            email: self.email,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct HistoryRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    image: String,
    prompt: String,
    timestamp: i64,
}
impl HistoryRecord {
    fn from_domain(item: &HistoryItem) -> Self {
        Self {
            id: item.id.clone(),
            kind: item.kind.as_str().to_string(),
            image: item.image.clone(),
            prompt: item.prompt.clone(),
            timestamp: item.timestamp,
        }
    }

    fn to_domain(self) -> PortResult<HistoryItem> {
        let kind = self
            .kind
            .parse::<HistoryItemType>()
            .map_err(|e| PortError::Corrupt(format!("{}: {}", HISTORY_KEY, e)))?;
        Ok(HistoryItem {
            id: self.id,
            kind,
            image: self.image,
            prompt: self.prompt,
            timestamp: self.timestamp,
        })
    }
}

//=========================================================================================
// `DurableStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl DurableStorage for DbAdapter {
    async fn load_user(&self) -> PortResult<Option<User>> {
        let record: Option<UserRecord> = self.read(USER_KEY).await?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn save_user(&self, user: &User) -> PortResult<()> {
        self.write(USER_KEY, &UserRecord::from_domain(user)).await
    }

    async fn remove_user(&self) -> PortResult<()> {
        self.remove(USER_KEY).await
    }

    async fn load_api_key(&self) -> PortResult<Option<String>> {
        self.read(API_KEY_KEY).await
    }

    async fn save_api_key(&self, api_key: &str) -> PortResult<()> {
        self.write(API_KEY_KEY, api_key).await
    }

    async fn remove_api_key(&self) -> PortResult<()> {
        self.remove(API_KEY_KEY).await
    }

    async fn load_history(&self) -> PortResult<Vec<HistoryItem>> {
        let records: Option<Vec<HistoryRecord>> = self.read(HISTORY_KEY).await?;
        records
            .unwrap_or_default()
            .into_iter()
            .map(HistoryRecord::to_domain)
            .collect()
    }

    async fn save_history(&self, items: &[HistoryItem]) -> PortResult<()> {
        let records: Vec<HistoryRecord> = items.iter().map(HistoryRecord::from_domain).collect();
        self.write(HISTORY_KEY, &records).await
    }
}

#[cfg(test)]
impl DbAdapter {
    /// Writes a raw value, bypassing serialization, to simulate corrupt data.
    pub(crate) async fn put_raw(&self, key: &str, value: &str) {
        sqlx::query("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_adapter() -> DbAdapter {
        let adapter = DbAdapter::connect("sqlite::memory:").await.unwrap();
        adapter.run_migrations().await.unwrap();
        adapter
    }

    fn item(id: &str, kind: HistoryItemType) -> HistoryItem {
        HistoryItem {
            id: id.to_string(),
            kind,
            image: "data:image/png;base64,AAAA".to_string(),
            prompt: "a cat".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn empty_database_reads_as_absent() {
        let db = memory_adapter().await;
        assert_eq!(db.load_user().await.unwrap(), None);
        assert_eq!(db.load_api_key().await.unwrap(), None);
        assert!(db.load_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_is_saved_overwritten_and_removed() {
        let db = memory_adapter().await;
        let ada = User {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        db.save_user(&ada).await.unwrap();
        assert_eq!(db.load_user().await.unwrap(), Some(ada));

        let grace = User {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
        };
        db.save_user(&grace).await.unwrap();
        assert_eq!(db.load_user().await.unwrap(), Some(grace));

        db.remove_user().await.unwrap();
        assert_eq!(db.load_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn history_keeps_its_order() {
        let db = memory_adapter().await;
        let items = vec![
            item("hist-2", HistoryItemType::Edited),
            item("hist-1", HistoryItemType::Generated),
        ];
        db.save_history(&items).await.unwrap();
        assert_eq!(db.load_history().await.unwrap(), items);
    }

    #[tokio::test]
    async fn history_uses_the_browser_record_shape() {
        let db = memory_adapter().await;
        db.put_raw(
            HISTORY_KEY,
            r#"[{"id":"hist-1","type":"Combined","image":"data:x","prompt":"p","timestamp":5}]"#,
        )
        .await;

        let items = db.load_history().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, HistoryItemType::Combined);
        assert_eq!(items[0].timestamp, 5);
    }

    #[tokio::test]
    async fn corrupt_values_are_reported_as_corrupt() {
        let db = memory_adapter().await;
        db.put_raw(USER_KEY, "{not json").await;
        db.put_raw(
            HISTORY_KEY,
            r#"[{"id":"h","type":"Painted","image":"","prompt":"","timestamp":0}]"#,
        )
        .await;

        assert!(matches!(db.load_user().await, Err(PortError::Corrupt(_))));
        assert!(matches!(db.load_history().await, Err(PortError::Corrupt(_))));
    }

    #[tokio::test]
    async fn api_key_round_trips_and_is_removed() {
        let db = memory_adapter().await;
        db.save_api_key("AIza-test").await.unwrap();
        assert_eq!(db.load_api_key().await.unwrap().as_deref(), Some("AIza-test"));
        db.remove_api_key().await.unwrap();
        assert_eq!(db.load_api_key().await.unwrap(), None);
    }
}
