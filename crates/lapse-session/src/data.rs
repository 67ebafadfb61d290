//! Session data access for adapters.
//!
//! Adapters that bind sessions to requests only need to fetch and save a
//! session's values by id. The [`SessionData`] trait captures that seam so
//! the adapter can work against an [`ExpiringStore`], a [`PollingView`]
//! over one, or any other backend.

use std::hash::Hash;
use std::sync::Arc;

use crate::entry::Values;
use crate::error::Result;
use crate::store::ExpiringStore;

/// Fetch and save session values by session id.
///
/// Implementations must copy at the boundary: `get_data` returns values the
/// caller owns outright, and `save_data` must not retain the caller's map.
/// Errors from a backend are returned as-is; callers are not expected to
/// retry.
pub trait SessionData: Send + Sync {
    /// Key type of the session values.
    type Key: Eq + Hash + Clone + Send + Sync + 'static;

    /// Value type of the session values.
    type Value: Clone + Send + Sync + 'static;

    /// Get the values for a session.
    ///
    /// Returns `Ok(None)` if the session does not exist or has expired.
    fn get_data(&self, id: &str) -> Result<Option<Values<Self::Key, Self::Value>>>;

    /// Save the values for a session.
    fn save_data(&self, id: &str, values: &Values<Self::Key, Self::Value>) -> Result<()>;
}

impl<K, V> SessionData for ExpiringStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    /// Never fails.
    fn get_data(&self, id: &str) -> Result<Option<Values<K, V>>> {
        Ok(self.get(id))
    }

    /// Never fails.
    fn save_data(&self, id: &str, values: &Values<K, V>) -> Result<()> {
        self.save(id, values);
        Ok(())
    }
}

/// Read-only view of an [`ExpiringStore`] for passive observers.
///
/// Reads go through [`ExpiringStore::poll`], so inspecting a session never
/// keeps it alive. Saves still reach the underlying store.
#[derive(Debug)]
pub struct PollingView<K, V> {
    store: ExpiringStore<K, V>,
}

impl<K, V> PollingView<K, V> {
    pub(crate) fn new(store: ExpiringStore<K, V>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &ExpiringStore<K, V> {
        &self.store
    }
}

impl<K, V> Clone for PollingView<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K, V> SessionData for PollingView<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn get_data(&self, id: &str) -> Result<Option<Values<K, V>>> {
        Ok(self.store.poll(id))
    }

    fn save_data(&self, id: &str, values: &Values<K, V>) -> Result<()> {
        self.store.save(id, values);
        Ok(())
    }
}

impl<T: SessionData + ?Sized> SessionData for Arc<T> {
    type Key = T::Key;
    type Value = T::Value;

    fn get_data(&self, id: &str) -> Result<Option<Values<T::Key, T::Value>>> {
        (**self).get_data(id)
    }

    fn save_data(&self, id: &str, values: &Values<T::Key, T::Value>) -> Result<()> {
        (**self).save_data(id, values)
    }
}

impl<T: SessionData + ?Sized> SessionData for &T {
    type Key = T::Key;
    type Value = T::Value;

    fn get_data(&self, id: &str) -> Result<Option<Values<T::Key, T::Value>>> {
        (**self).get_data(id)
    }

    fn save_data(&self, id: &str, values: &Values<T::Key, T::Value>) -> Result<()> {
        (**self).save_data(id, values)
    }
}
