use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("session store backend failure: {0}")]
    Backend(String),
    #[error("could not encode value for `{key}`: {message}")]
    Encode { key: String, message: String },
    #[error("could not decode value for `{key}`: {message}")]
    Decode { key: String, message: String },
}

/// Key-value storage with a fixed expiry per entry.
///
/// Expiry is passive: an entry past its deadline must read as absent, whether
/// or not the backend has physically removed it yet.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

pub async fn load_json<T>(store: &dyn SessionStore, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|error| StoreError::Decode { key: key.to_string(), message: error.to_string() })
}

pub async fn save_json<T>(
    store: &dyn SessionStore,
    key: &str,
    value: &T,
    ttl_secs: u64,
) -> Result<(), StoreError>
where
    T: Serialize + Sync,
{
    let raw = serde_json::to_string(value)
        .map_err(|error| StoreError::Encode { key: key.to_string(), message: error.to_string() })?;
    store.set(key, raw, ttl_secs).await
}

/// Deadline `ttl_secs` after `now`, saturating at the latest representable instant.
pub fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Clone, Debug)]
struct StoredEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = expiry_after(Utc::now(), ttl_secs);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), StoredEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    use super::{expiry_after, load_json, save_json, InMemorySessionStore, SessionStore, StoreError};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        label: String,
    }

    #[tokio::test]
    async fn in_memory_store_round_trip_and_delete() {
        let store = InMemorySessionStore::new();
        store.set("k", "v".to_string(), 60).await.expect("set");

        assert_eq!(store.get("k").await.expect("get"), Some("v".to_string()));

        store.delete("k").await.expect("delete");
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn zero_ttl_entries_read_as_absent() {
        let store = InMemorySessionStore::new();
        store.set("k", "v".to_string(), 0).await.expect("set");

        assert_eq!(store.get("k").await.expect("get"), None);
        assert!(store.entries.read().await.is_empty(), "expired entry should be evicted on read");
    }

    #[tokio::test]
    async fn typed_helpers_encode_and_decode_json() {
        let store = InMemorySessionStore::new();
        let sample = Sample { label: "flyers".to_string() };

        save_json(&store, "sample", &sample, 60).await.expect("save");
        let loaded: Option<Sample> = load_json(&store, "sample").await.expect("load");
        assert_eq!(loaded, Some(sample));

        store.set("broken", "{not json".to_string(), 60).await.expect("set");
        let error = load_json::<Sample>(&store, "broken").await.expect_err("decode failure");
        assert!(matches!(error, StoreError::Decode { ref key, .. } if key == "broken"));
    }

    #[test]
    fn expiry_saturates_instead_of_overflowing() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, u64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!((expiry_after(now, 3600) - now).num_seconds(), 3600);
    }
}
