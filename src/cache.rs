use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Key under which the unfiltered index post list is stored.
pub const INDEX_PAGE_KEY: &str = "index_page";

/// Shared cache of joined post lists.
pub type PostListCache = TtlCache<Arc<Vec<crate::post::PostForTemplate>>>;

/// Process-wide key/value store where every entry lives for the same TTL.
/// Expired entries read as absent.
#[derive(Clone)]
pub struct TtlCache<V> {
    inner: Cache<String, V>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await
    }

    /// Stores `value`, replacing whatever was there and restarting its TTL.
    pub async fn set(&self, key: &str, value: V) {
        self.inner.insert(key.to_owned(), value).await;
    }

    /// Stores `value` only if the key is absent or expired.
    /// Returns true if the value was stored.
    pub async fn add(&self, key: &str, value: V) -> bool {
        self.inner
            .entry(key.to_owned())
            .or_insert_with(async move { value })
            .await
            .is_fresh()
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.inner.remove(key).await.is_some()
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Counts live entries.
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[actix_rt::test]
    async fn test_get_set_delete() {
        let cache: TtlCache<i32> = TtlCache::new(TTL);
        assert_eq!(cache.get("a").await, None);

        cache.set("a", 1).await;
        assert_eq!(cache.get("a").await, Some(1));

        cache.set("a", 2).await;
        assert_eq!(cache.get("a").await, Some(2));

        assert!(cache.delete("a").await);
        assert!(!cache.delete("a").await);
        assert_eq!(cache.get("a").await, None);
    }

    #[actix_rt::test]
    async fn test_add_does_not_clobber() {
        let cache: TtlCache<&str> = TtlCache::new(TTL);
        assert!(cache.add(INDEX_PAGE_KEY, "first").await);
        assert!(!cache.add(INDEX_PAGE_KEY, "second").await);
        assert_eq!(cache.get(INDEX_PAGE_KEY).await, Some("first"));
    }

    #[actix_rt::test]
    async fn test_entries_expire() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_millis(50));
        cache.set("a", 1).await;
        assert_eq!(cache.get("a").await, Some(1));

        actix_rt::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("a").await, None);
        // An expired entry no longer blocks add().
        assert!(cache.add("a", 2).await);
        assert_eq!(cache.get("a").await, Some(2));
    }

    #[actix_rt::test]
    async fn test_clear() {
        let cache: TtlCache<i32> = TtlCache::new(TTL);
        cache.set("a", 1).await;
        cache.set("b", 2).await;
        assert_eq!(cache.len().await, 2);

        cache.clear();
        assert_eq!(cache.get("a").await, None);
        assert!(cache.is_empty().await);
    }
}
