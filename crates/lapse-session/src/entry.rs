//! Stored session entries and their expiration rule.

use std::collections::HashMap;

/// Session values held by the store: a bag of opaque keys and values.
pub type Values<K, V> = HashMap<K, V>;

/// A session's values together with the time it was last accessed.
///
/// Entries are only ever touched while the store's lock is held.
#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    values: Values<K, V>,

    /// Unix seconds of the last save or access-counting read.
    last_accessed: i64,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(values: Values<K, V>, now: i64) -> Self {
        Self {
            values,
            last_accessed: now,
        }
    }

    /// An entry is expired once its inactivity strictly exceeds `max_age`.
    pub(crate) fn is_expired(&self, now: i64, max_age: i64) -> bool {
        now.saturating_sub(self.last_accessed) > max_age
    }

    /// Returns the values if the entry is still live.
    ///
    /// When `touch` is set, a live entry's inactivity timer is reset to `now`.
    /// An expired entry is never refreshed.
    pub(crate) fn read(&mut self, now: i64, max_age: i64, touch: bool) -> Option<&Values<K, V>> {
        if self.is_expired(now, max_age) {
            return None;
        }
        if touch {
            self.last_accessed = now;
        }
        Some(&self.values)
    }

    #[cfg(test)]
    pub(crate) fn last_accessed(&self) -> i64 {
        self.last_accessed
    }
}
