//! A keyed table whose entries silently expire

use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

/// A map where every entry carries the time it was last set
///
/// Entries older than the configured TTL are treated as absent by every
/// lookup. Nothing is evicted in the background, stale entries are purged by
/// [`Self::set`] at most once per TTL, so none outlives twice the TTL while
/// the map is being written to.
#[derive(Debug)]
pub struct ExpiringMap<K, V> {
    entries: HashMap<K, (V, Instant)>,
    /// `None` means entries never expire
    ttl: Option<Duration>,
    last_purge: Option<Instant>,
}

impl<K: Eq + Hash + Copy, V> ExpiringMap<K, V> {
    /// Creates an empty map, `ttl` of `None` disables expiry
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            last_purge: None,
        }
    }

    #[inline]
    fn is_fresh(&self, stamp: Instant, now: Instant) -> bool {
        self.ttl
            .is_none_or(|ttl| now.saturating_duration_since(stamp) <= ttl)
    }

    /// Inserts or replaces the entry for `key`, stamping it with `now`
    pub fn set(&mut self, key: K, value: V, now: Instant) {
        if let Some(ttl) = self.ttl {
            let last = *self.last_purge.get_or_insert(now);
            if now.saturating_duration_since(last) > ttl {
                self.entries
                    .retain(|_, (_, stamp)| now.saturating_duration_since(*stamp) <= ttl);
                self.last_purge = Some(now);
            }
        }

        self.entries.insert(key, (value, now));
    }

    /// Gets the entry for `key` if it has not expired
    #[inline]
    pub fn get(&self, key: &K, now: Instant) -> Option<&V> {
        let (value, stamp) = self.entries.get(key)?;
        self.is_fresh(*stamp, now).then_some(value)
    }

    /// Removes the entry for `key`, returning it only if it had not expired
    #[inline]
    pub fn take(&mut self, key: &K, now: Instant) -> Option<V> {
        let (value, stamp) = self.entries.remove(key)?;
        self.is_fresh(stamp, now).then_some(value)
    }

    /// Removes the entry for `key`, expired or not
    #[inline]
    pub fn delete(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Visits every entry that has not expired, along with the time it was set
    pub fn for_each(&self, now: Instant, mut visitor: impl FnMut(&K, &V, Instant)) {
        for (key, (value, stamp)) in &self.entries {
            if self.is_fresh(*stamp, now) {
                visitor(key, value, *stamp);
            }
        }
    }

    /// The number of entries, including expired ones that have not been removed
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
