//! Keyed storage for profiles and sessions.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use thiserror::Error;

/// Errors from a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete the operation.
    ///
    /// [`MemoryStore`] never fails; this is for external backends such as a
    /// database or remote cache.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// String-keyed storage for one value type.
#[async_trait]
pub trait KeyedStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Fetch a value, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError>;

    /// Insert or replace a value.
    async fn put(&self, key: &str, value: T) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store backed by a `moka` cache.
#[derive(Clone)]
pub struct MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    cache: Cache<String, T>,
}

impl<T> MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A store whose entries never expire.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// A store whose entries expire after `idle` without a read or write.
    #[must_use]
    pub fn with_idle_expiry(max_capacity: u64, idle: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// Approximate number of live entries.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl<T> std::fmt::Debug for MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl<T> KeyedStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.cache.get(key).await)
    }

    async fn put(&self, key: &str, value: T) -> Result<(), StoreError> {
        self.cache.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new(100);
        assert_eq!(store.get("a").await.unwrap(), None);

        store.put("a", 1_u32).await.unwrap();
        store.put("a", 2_u32).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(2));
        assert_eq!(store.entry_count().await, 1);

        store.delete("a").await.unwrap();
        store.delete("missing").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_idle_expiry() {
        let store = MemoryStore::with_idle_expiry(10, Duration::from_millis(50));
        store.put("s", "session".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.get("s").await.unwrap(), None);
    }
}
