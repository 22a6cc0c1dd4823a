use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::domain::{ProteinAnnotation, ProteinId};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used to exercise TTL expiry.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = guard.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: ProteinAnnotation,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        // A clock that went backwards leaves the entry fresh.
        now.signed_duration_since(self.stored_at)
            .to_std()
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }
}

/// In-memory TTL cache of annotations keyed by the identifier as requested.
///
/// Created once at process start and shared by reference (`Arc`) with every
/// fetcher. Entries expire lazily: an expired entry is dropped when read.
pub struct AnnotationCache {
    entries: Mutex<HashMap<ProteinId, CacheEntry>>,
    ttl: Duration,
    clock: Box<dyn Clock>,
}

impl AnnotationCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }

    pub fn with_clock<C: Clock + 'static>(ttl: Duration, clock: C) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock: Box::new(clock),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, id: &ProteinId) -> Option<ProteinAnnotation> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(id) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                debug!(protein = %id, "cache entry expired");
                entries.remove(id);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, id: ProteinId, value: ProteinAnnotation) {
        self.put_with_ttl(id, value, self.ttl);
    }

    pub fn put_with_ttl(&self, id: ProteinId, value: ProteinAnnotation, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.lock().insert(id, entry);
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProteinId, CacheEntry>> {
        // The map is only ever mutated by single insert/remove calls, so a
        // panic elsewhere cannot leave it half-written.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AnnotationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn annotation(id: &str, length: u64) -> ProteinAnnotation {
        ProteinAnnotation {
            protein: id.parse().unwrap(),
            sequence_length: Some(length),
            features: Some(Vec::new()),
            go_terms: None,
            error: None,
        }
    }

    #[test]
    fn miss_then_hit() {
        let cache = AnnotationCache::default();
        let id: ProteinId = "TEST_PROTEIN".parse().unwrap();
        assert!(cache.get(&id).is_none());

        cache.put(id.clone(), annotation("TEST_PROTEIN", 100));
        let cached = cache.get(&id).unwrap();
        assert_eq!(cached.protein, id);
        assert_eq!(cached.sequence_length, Some(100));
    }

    #[test]
    fn keys_are_case_sensitive() {
        let cache = AnnotationCache::default();
        cache.put("YAL001C".parse().unwrap(), annotation("YAL001C", 1160));
        assert!(cache.get(&"yal001c".parse().unwrap()).is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = AnnotationCache::with_clock(DEFAULT_TTL, clock.clone());
        let id: ProteinId = "YAL001C".parse().unwrap();
        cache.put(id.clone(), annotation("YAL001C", 1160));

        clock.advance(Duration::from_secs(23 * 60 * 60));
        assert!(cache.get(&id).is_some());

        clock.advance(Duration::from_secs(60 * 60));
        assert!(cache.get(&id).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn per_entry_ttl_and_purge() {
        let clock = Arc::new(ManualClock::default());
        let cache = AnnotationCache::with_clock(DEFAULT_TTL, clock.clone());
        cache.put("A".parse().unwrap(), annotation("A", 1));
        cache.put_with_ttl("B".parse().unwrap(), annotation("B", 2), Duration::from_secs(60));

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_overwrites() {
        let cache = AnnotationCache::default();
        let id: ProteinId = "A".parse().unwrap();
        cache.put(id.clone(), annotation("A", 1));
        cache.put(id.clone(), annotation("A", 2));
        assert_eq!(cache.get(&id).unwrap().sequence_length, Some(2));
    }

    #[test]
    fn concurrent_access() {
        let cache = Arc::new(AnnotationCache::default());
        let handles = (0..8)
            .map(|worker| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("P{}", i % 10);
                        cache.put(key.parse().unwrap(), annotation(&key, worker));
                        let _ = cache.get(&key.parse().unwrap());
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
    }
}
