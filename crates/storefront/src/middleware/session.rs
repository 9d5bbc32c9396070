//! Session middleware configuration.
//!
//! Sessions only carry the server-side cart, so they live in a bounded
//! in-process cache. Idle sessions expire and the least recently used are
//! evicted once the cache is full. Carts are lost on restart.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "nutbarn_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Most sessions held at once.
pub const SESSION_CAPACITY: u64 = 10_000;

/// Session store backed by a moka cache.
///
/// Every save re-inserts the record, so the time-to-live counts from the
/// last write. Records past their own expiry date are never returned, even
/// if the cache has not dropped them yet.
#[derive(Debug, Clone)]
pub struct CacheSessionStore {
    cache: Cache<Id, Record>,
}

impl CacheSessionStore {
    #[must_use]
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(time_to_live)
                .build(),
        }
    }

    /// Sessions currently held, after pending evictions have run.
    pub async fn session_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for CacheSessionStore {
    fn default() -> Self {
        Self::new(SESSION_CAPACITY, session_ttl())
    }
}

#[async_trait]
impl SessionStore for CacheSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.cache.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .cache
            .get(session_id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }
}

const fn session_ttl() -> Duration {
    Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs())
}

/// Create the session layer over a bounded cache store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<CacheSessionStore> {
    SessionManagerLayer::new(CacheSessionStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn record(expires_in: tower_sessions::cookie::time::Duration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::from([("nutbarn-cart".to_string(), serde_json::json!("[]"))]),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_saved_session_loads() {
        let store = CacheSessionStore::default();
        let mut rec = record(tower_sessions::cookie::time::Duration::hours(1));
        store.create(&mut rec).await.unwrap();

        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.data, rec.data);

        store.delete(&rec.id).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_does_not_load() {
        let store = CacheSessionStore::default();
        let rec = record(tower_sessions::cookie::time::Duration::seconds(-1));
        store.save(&rec).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_idle_session_dropped_after_ttl() {
        let store = CacheSessionStore::new(SESSION_CAPACITY, Duration::from_millis(50));
        let rec = record(tower_sessions::cookie::time::Duration::hours(1));
        store.save(&rec).await.unwrap();
        assert!(store.load(&rec.id).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.load(&rec.id).await.unwrap().is_none());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let store = CacheSessionStore::new(10, session_ttl());
        for _ in 0..50 {
            store.save(&record(tower_sessions::cookie::time::Duration::hours(1))).await.unwrap();
        }
        assert!(store.session_count().await <= 10);
    }
}
