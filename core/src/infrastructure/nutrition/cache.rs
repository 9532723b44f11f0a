use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::food_scan::entities::NutritionRecord;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: Option<NutritionRecord>,
    expires_at: Instant,
}

/// Per-client memo of lookup outcomes keyed by normalized food name. Misses
/// are cached as well so repeated unknown names do not hit the provider.
#[derive(Debug, Clone)]
pub struct LookupCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl LookupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn key(food_name: &str) -> String {
        food_name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    /// `Some(outcome)` on a fresh hit, `None` when the provider must be asked.
    pub async fn get(&self, food_name: &str) -> Option<Option<NutritionRecord>> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.read().await;
        entries
            .get(&Self::key(food_name))
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.record.clone())
    }

    pub async fn insert(&self, food_name: &str, record: Option<NutritionRecord>) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| now < entry.expires_at);
        entries.insert(
            Self::key(food_name),
            CacheEntry {
                record,
                expires_at: now + self.ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::food_scan::entities::{NutritionSource, ServingInfo};

    fn apple() -> NutritionRecord {
        let mut record = NutritionRecord::empty("Apple", NutritionSource::Usda, ServingInfo::per_100g());
        record.calories = 52.0;
        record
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = LookupCache::new(Duration::from_secs(60));
        cache.insert("Apple", Some(apple())).await;

        assert_eq!(cache.get("  apple ").await, Some(Some(apple())));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("apple").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_misses_are_cached() {
        let cache = LookupCache::new(Duration::from_secs(60));
        cache.insert("unobtainium stew", None).await;
        assert_eq!(cache.get("Unobtainium Stew").await, Some(None));
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = LookupCache::new(Duration::ZERO);
        cache.insert("apple", Some(apple())).await;
        assert_eq!(cache.get("apple").await, None);
    }
}
