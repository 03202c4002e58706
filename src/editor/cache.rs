//! Size-bounded in-memory cache with scored eviction.

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::services::Clock;

pub const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_MAX_AGE_MS: u64 = 24 * 60 * 60 * 1000;
pub const DEFAULT_PRIORITY: u8 = 50;
pub const MAX_PRIORITY: u8 = 100;
/// Entries above this priority are only evicted when nothing else is left.
pub const PROTECTED_PRIORITY: u8 = 90;

const PRIORITY_WEIGHT: f64 = 0.5;
const ACCESS_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEntryType {
    Image,
    Html,
    Json,
    Component,
    Other,
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub size: u64,
    pub entry_type: CacheEntryType,
    pub priority: u8,
    pub created_at: u64,
    pub last_accessed: u64,
    pub access_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_size: u64,
    pub max_size: u64,
    pub usage_percentage: f64,
    pub entries_by_type: BTreeMap<CacheEntryType, usize>,
}

pub struct CacheService<V = Value> {
    clock: Arc<dyn Clock>,
    entries: HashMap<String, CacheEntry<V>>,
    total_size: u64,
    max_size: u64,
    max_age_ms: u64,
}

impl<V> CacheService<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(clock, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_MS)
    }

    pub fn with_limits(clock: Arc<dyn Clock>, max_size: u64, max_age_ms: u64) -> Self {
        CacheService {
            clock,
            entries: HashMap::new(),
            total_size: 0,
            max_size,
            max_age_ms,
        }
    }

    /// Stores `value`. Returns false when `size` alone exceeds the cache.
    /// Re-setting a key keeps its counters and the higher of both priorities.
    pub fn set(
        &mut self,
        key: &str,
        value: V,
        size: u64,
        entry_type: CacheEntryType,
        priority: Option<u8>,
    ) -> bool {
        if size > self.max_size {
            log::warn!("Cache entry '{}' ({} bytes) exceeds the cache size", key, size);
            return false;
        }
        let now = self.clock.now_ms();
        let priority = priority.unwrap_or(DEFAULT_PRIORITY).min(MAX_PRIORITY);

        let previous = self.entries.remove(key);
        if let Some(old) = &previous {
            self.total_size -= old.size;
        }
        if self.total_size + size > self.max_size {
            self.evict(size);
        }

        let entry = match previous {
            Some(old) => CacheEntry {
                value,
                size,
                entry_type,
                priority: old.priority.max(priority),
                created_at: old.created_at,
                last_accessed: now,
                access_count: old.access_count + 1,
            },
            None => CacheEntry {
                value,
                size,
                entry_type,
                priority,
                created_at: now,
                last_accessed: now,
                access_count: 0,
            },
        };
        self.total_size += size;
        self.entries.insert(key.to_string(), entry);
        true
    }

    /// Returns the value and bumps its access count, recency and priority.
    /// Expired entries are dropped on the way.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let now = self.clock.now_ms();
        if self.is_expired(key, now) {
            self.delete(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.last_accessed = now;
        entry.priority = (entry.priority + 1).min(MAX_PRIORITY);
        Some(&entry.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key) && !self.is_expired(key, self.clock.now_ms())
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_size -= entry.size;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
    }

    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .keys()
            .filter(|k| self.is_expired(k, now))
            .cloned()
            .collect();
        for key in &expired {
            self.delete(key);
        }
        if !expired.is_empty() {
            log::debug!("Removed {} expired cache entries", expired.len());
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn stats(&self) -> CacheStats {
        let mut entries_by_type = BTreeMap::new();
        for entry in self.entries.values() {
            *entries_by_type.entry(entry.entry_type).or_insert(0) += 1;
        }
        let usage_percentage = if self.max_size == 0 {
            0.0
        } else {
            self.total_size as f64 / self.max_size as f64 * 100.0
        };
        CacheStats {
            entry_count: self.entries.len(),
            total_size: self.total_size,
            max_size: self.max_size,
            usage_percentage,
            entries_by_type,
        }
    }

    fn is_expired(&self, key: &str, now: u64) -> bool {
        self.entries
            .get(key)
            .map_or(false, |e| now.saturating_sub(e.created_at) > self.max_age_ms)
    }

    /// Eviction order: lowest score first, ties by older access then key.
    /// Protected entries come after every other entry.
    fn eviction_order(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        let max_count = self.entries.values().map(|e| e.access_count).max().unwrap_or(0);
        let oldest_age = self
            .entries
            .values()
            .map(|e| now.saturating_sub(e.last_accessed))
            .max()
            .unwrap_or(0);

        let mut scored: Vec<(bool, f64, u64, &String)> = self
            .entries
            .iter()
            .map(|(key, e)| {
                let priority = f64::from(e.priority) / f64::from(MAX_PRIORITY);
                let access = if max_count == 0 {
                    0.0
                } else {
                    e.access_count as f64 / max_count as f64
                };
                let recency = if oldest_age == 0 {
                    1.0
                } else {
                    1.0 - now.saturating_sub(e.last_accessed) as f64 / oldest_age as f64
                };
                let score = priority * PRIORITY_WEIGHT + access * ACCESS_WEIGHT + recency * RECENCY_WEIGHT;
                (e.priority > PROTECTED_PRIORITY, score, e.last_accessed, key)
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
                .then(a.2.cmp(&b.2))
                .then(a.3.cmp(b.3))
        });
        scored.into_iter().map(|(_, _, _, key)| key.clone()).collect()
    }

    fn evict(&mut self, incoming: u64) {
        let mut evicted = 0;
        for key in self.eviction_order() {
            if self.total_size + incoming <= self.max_size {
                break;
            }
            self.delete(&key);
            evicted += 1;
        }
        log::debug!("Evicted {} cache entries to fit {} bytes", evicted, incoming);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::services::ManualClock;
    use serde_json::json;

    fn cache(max: u64) -> (Arc<ManualClock>, CacheService) {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = CacheService::with_limits(clock.clone(), max, DEFAULT_MAX_AGE_MS);
        (clock, cache)
    }

    #[test]
    fn oversized_entries_are_rejected() {
        let (_, mut cache) = cache(100);
        assert!(cache.set("a", json!(1), 40, CacheEntryType::Json, None));
        assert!(!cache.set("huge", json!(2), 101, CacheEntryType::Image, None));
        assert_eq!(cache.total_size(), 40);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn updating_a_key_adjusts_size_and_keeps_priority() {
        let (_, mut cache) = cache(100);
        cache.set("a", json!("x"), 30, CacheEntryType::Html, Some(70));
        cache.set("a", json!("y"), 50, CacheEntryType::Html, Some(20));
        assert_eq!(cache.total_size(), 50);
        let entry = cache.entry("a").unwrap();
        assert_eq!(entry.priority, 70);
        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.value, json!("y"));
    }

    #[test]
    fn get_bumps_priority_up_to_the_cap() {
        let (_, mut cache) = cache(100);
        cache.set("a", json!(1), 10, CacheEntryType::Other, Some(100));
        assert_eq!(cache.get("a"), Some(&json!(1)));
        assert_eq!(cache.entry("a").unwrap().priority, 100);
        assert_eq!(cache.entry("a").unwrap().access_count, 1);
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn eviction_prefers_low_scores_and_spares_protected_entries() {
        let (clock, mut cache) = cache(100);
        cache.set("pinned", json!(0), 40, CacheEntryType::Component, Some(95));
        clock.advance(10);
        cache.set("cold", json!(1), 30, CacheEntryType::Image, Some(10));
        clock.advance(10);
        cache.set("warm", json!(2), 30, CacheEntryType::Image, Some(60));

        assert!(cache.set("new", json!(3), 30, CacheEntryType::Image, None));
        assert!(cache.contains("pinned"));
        assert!(!cache.contains("cold"));
        assert!(cache.contains("warm"));
        assert_eq!(cache.total_size(), 100);
    }

    #[test]
    fn protected_entries_go_when_nothing_else_fits() {
        let (_, mut cache) = cache(100);
        cache.set("pinned", json!(0), 80, CacheEntryType::Component, Some(95));
        assert!(cache.set("big", json!(1), 90, CacheEntryType::Image, None));
        assert!(!cache.contains("pinned"));
        assert_eq!(cache.total_size(), 90);
    }

    #[test]
    fn expiry_and_stats() {
        let (clock, mut cache) = cache(200);
        cache.set("a", json!(1), 50, CacheEntryType::Image, None);
        cache.set("b", json!(2), 50, CacheEntryType::Json, None);
        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.usage_percentage, 50.0);
        assert_eq!(stats.entries_by_type.get(&CacheEntryType::Image), Some(&1));

        clock.advance(DEFAULT_MAX_AGE_MS + 1);
        assert!(!cache.contains("a"));
        assert_eq!(cache.cleanup_expired(), 2);
        assert_eq!(cache.total_size(), 0);
    }
}
