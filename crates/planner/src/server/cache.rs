//! TTL-based caching for generated schedule results.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::schedule::{GenerationOutcome, ScheduleError, ScheduleRequest};

/// A request key derived from the canonical request JSON.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RequestKey(String);

impl RequestKey {
    /// Hashes the request. Criteria sets serialize in sorted order, so equal
    /// requests always hash alike; course order is significant.
    pub fn from_request(request: &ScheduleRequest) -> Result<Self, ScheduleError> {
        let canonical = serde_json::to_vec(request)?;
        let digest = Sha256::digest(&canonical);
        let hash = digest[..16]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Ok(Self(hash))
    }

    /// Returns the internal hash string (for logging/debugging).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0[..8.min(self.0.len())])
    }
}

struct CachedOutcome {
    outcome: Arc<GenerationOutcome>,
    inserted_at: Instant,
    /// Insertion order, for oldest-first eviction
    seq: u64,
}

/// Generated outcomes keyed by request, shared across handlers.
///
/// Every entry lives for the same `ttl`. Expired entries are dropped on
/// lookup and swept on every insert; past `max_entries` the oldest entry is
/// evicted, so the map stays bounded however many distinct requests arrive.
pub struct GenerationCache {
    entries: DashMap<RequestKey, CachedOutcome>,
    ttl: Duration,
    max_entries: usize,
    next_seq: AtomicU64,
}

impl GenerationCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Gets a cached outcome if it exists and hasn't expired.
    pub fn get(&self, key: &RequestKey) -> Option<Arc<GenerationOutcome>> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            return Some(entry.outcome.clone());
        }
        drop(entry);
        self.entries.remove(key);
        None
    }

    /// Stores an outcome, sweeping expired entries first and evicting the
    /// oldest one if the cache is still full.
    pub fn insert(&self, key: RequestKey, outcome: Arc<GenerationOutcome>) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.seq)
                .map(|entry| entry.key().clone());
            if let Some(oldest) = oldest {
                debug!(request = %oldest, "Evicting oldest cached result");
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(
            key,
            CachedOutcome {
                outcome,
                inserted_at: Instant::now(),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    /// Drops every entry and returns how many were held.
    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Number of entries, expired ones not yet swept included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            ttl_secs: self.ttl.as_secs(),
            max_entries: self.max_entries,
            ..Default::default()
        };

        for entry in self.entries.iter() {
            stats.total_entries += 1;
            if entry.inserted_at.elapsed() >= self.ttl {
                stats.expired_entries += 1;
            } else {
                stats.cached_schedules += entry.outcome.schedules.len();
            }
        }
        stats.active_entries = stats.total_entries - stats.expired_entries;
        stats
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
    /// Schedules held across live entries
    pub cached_schedules: usize,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

/// Cache plus per-request locks so identical concurrent requests search once.
pub struct GenerationCacheState {
    pub cache: GenerationCache,
    pub request_locks: DashMap<RequestKey, Arc<tokio::sync::Mutex<()>>>,
}

impl GenerationCacheState {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            cache: GenerationCache::new(ttl, max_entries),
            request_locks: DashMap::new(),
        }
    }

    /// Gets or creates a lock for the given request.
    pub fn get_request_lock(&self, key: &RequestKey) -> Arc<tokio::sync::Mutex<()>> {
        self.request_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry once no other request is holding or waiting on it.
    pub fn release_request_lock(&self, key: &RequestKey) {
        self.request_locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{FilterCriteria, SearchStats};

    fn outcome() -> Arc<GenerationOutcome> {
        Arc::new(GenerationOutcome {
            schedules: Vec::new(),
            empty_courses: vec![3],
            courses: Vec::new(),
            stats: SearchStats::default(),
        })
    }

    #[test]
    fn test_request_key_hashing() {
        let base = ScheduleRequest::new("FA24", vec![1, 2]);
        let same = ScheduleRequest::new("FA24", vec![1, 2]);
        let reordered = ScheduleRequest::new("FA24", vec![2, 1]);
        let filtered = ScheduleRequest::new("FA24", vec![1, 2]).with_criteria(FilterCriteria {
            exclude_full: Some(true),
            ..Default::default()
        });

        let key = RequestKey::from_request(&base).unwrap();
        assert_eq!(key, RequestKey::from_request(&same).unwrap());
        assert_ne!(key, RequestKey::from_request(&reordered).unwrap());
        assert_ne!(key, RequestKey::from_request(&filtered).unwrap());
        assert_eq!(key.as_str().len(), 32);
        assert_eq!(key.to_string().len(), 8);
    }

    fn key(course_id: i64) -> RequestKey {
        RequestKey::from_request(&ScheduleRequest::new("FA24", vec![course_id])).unwrap()
    }

    #[test]
    fn test_cache_expiry() {
        let cache = GenerationCache::new(Duration::from_secs(60), 16);
        cache.insert(key(1), outcome());
        assert_eq!(cache.get(&key(1)).map(|o| o.empty_courses.clone()), Some(vec![3]));
        assert_eq!(cache.stats().active_entries, 1);

        let expired = GenerationCache::new(Duration::ZERO, 16);
        expired.insert(key(1), outcome());
        assert_eq!(expired.stats().expired_entries, 1);
        assert!(expired.get(&key(1)).is_none());
        assert!(expired.is_empty());
    }

    #[test]
    fn test_expired_entries_swept_on_insert() {
        // distinct requests that are never read back must not pile up
        let cache = GenerationCache::new(Duration::ZERO, 1_000);
        for course_id in 0..100 {
            cache.insert(key(course_id), outcome());
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = GenerationCache::new(Duration::from_secs(60), 3);
        for course_id in 0..10 {
            cache.insert(key(course_id), outcome());
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key(0)).is_none());
        assert!(cache.get(&key(9)).is_some());

        // replacing a live key does not evict anything
        cache.insert(key(9), outcome());
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key(7)).is_some());

        assert_eq!(cache.clear(), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_request_lock_released() {
        let state = GenerationCacheState::new(Duration::from_secs(60), 16);
        let request = key(1);

        let lock = state.get_request_lock(&request);
        state.release_request_lock(&request);
        assert_eq!(state.request_locks.len(), 1);

        drop(lock);
        state.release_request_lock(&request);
        assert!(state.request_locks.is_empty());
    }
}
