//! Expiring session store with a background purge task.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::data::PollingView;
use crate::entry::{Entry, Values};
use crate::error::Result;

/// Shared state behind every handle to a store.
struct StoreInner<K, V> {
    /// Session entries by session id.
    ///
    /// The lock guards the map and each entry's timestamp, not the values
    /// a caller received as a copy.
    sessions: Mutex<HashMap<String, Entry<K, V>>>,

    clock: Box<dyn Clock>,

    /// Maximum inactivity in seconds.
    max_age: i64,

    /// Stops the purge task.
    shutdown: CancellationToken,

    purge_task: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> StoreInner<K, V>
where
    K: Clone,
    V: Clone,
{
    fn read(&self, id: &str, touch: bool) -> Option<Values<K, V>> {
        let mut sessions = self.sessions.lock();
        let now = self.clock.now();
        let values = match sessions.get_mut(id) {
            Some(entry) => entry.read(now, self.max_age, touch).cloned(),
            None => None,
        };
        trace!(session_id = %id, hit = values.is_some(), touch, "Session lookup");
        values
    }

    fn purge(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let now = self.clock.now();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now, self.max_age));
        let removed = before - sessions.len();

        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Purged expired sessions");
        }

        removed
    }
}

impl<K, V> Drop for StoreInner<K, V> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// In-memory session store with inactivity-based expiration.
///
/// Each session id maps to a bag of values and the time it was last
/// accessed. A session expires once it has been inactive for strictly
/// more than the configured max age. Expired sessions look absent to every
/// read and are removed by [`purge`](Self::purge), which a background task
/// also runs periodically.
///
/// All operations serialize on a single lock. Values cross the store
/// boundary only as shallow copies: [`save`](Self::save) stores a copy of
/// the caller's map and [`get`](Self::get)/[`poll`](Self::poll) hand out a
/// fresh copy, so callers may mutate what they hold freely. The values
/// themselves are cloned, so reference-like values should be wrapped in
/// `Arc` and treated as frozen.
///
/// Cloning the store yields another handle to the same sessions. The
/// purge task stops on [`shutdown`](Self::shutdown) or when the last
/// handle is dropped.
pub struct ExpiringStore<K, V> {
    inner: Arc<StoreInner<K, V>>,
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a store whose sessions expire after `max_age_secs` seconds of
    /// inactivity, using the default configuration otherwise.
    pub fn new(max_age_secs: u64) -> Result<Self> {
        Self::with_config(StoreConfig::new().with_max_age(max_age_secs))
    }

    /// Create a store from a configuration, using the system clock.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a store with a custom time source.
    ///
    /// If the purge task is enabled it is spawned on the current Tokio
    /// runtime. Without a runtime the store still works, but expired
    /// sessions are only removed by calling [`purge`](Self::purge).
    pub fn with_clock(config: StoreConfig, clock: impl Clock) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(StoreInner {
            sessions: Mutex::new(HashMap::new()),
            clock: Box::new(clock),
            max_age: config.max_age_secs as i64,
            shutdown: CancellationToken::new(),
            purge_task: Mutex::new(None),
        });

        if config.enable_purge_task {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let interval = config.purge_interval();
                    let task = handle.spawn(purge_loop(
                        Arc::downgrade(&inner),
                        interval,
                        inner.shutdown.clone(),
                    ));
                    *inner.purge_task.lock() = Some(task);
                    debug!(?interval, "Session purge task started");
                }
                Err(_) => {
                    warn!("No Tokio runtime available, session purge task not started");
                }
            }
        }

        Ok(Self { inner })
    }

    /// Save a copy of `values` as the session data for `id`.
    ///
    /// Replaces any previous data for `id` and resets its inactivity timer.
    pub fn save(&self, id: impl Into<String>, values: &Values<K, V>) {
        let id = id.into();
        let values = values.clone();
        let mut sessions = self.inner.sessions.lock();
        let now = self.inner.clock.now();
        trace!(session_id = %id, len = values.len(), "Session saved");
        sessions.insert(id, Entry::new(values, now));
    }

    /// Get a copy of the session data for `id`.
    ///
    /// Returns `None` if there is no data or it expired. A successful get
    /// counts as activity and resets the session's inactivity timer.
    pub fn get(&self, id: &str) -> Option<Values<K, V>> {
        self.inner.read(id, true)
    }

    /// Like [`get`](Self::get), but does not keep the session from expiring.
    pub fn poll(&self, id: &str) -> Option<Values<K, V>> {
        self.inner.read(id, false)
    }

    /// Remove every expired session and return how many were removed.
    ///
    /// This is called periodically by the purge task, but can also be
    /// called manually.
    pub fn purge(&self) -> usize {
        self.inner.purge()
    }

    /// A view of this store whose reads do not keep sessions from expiring.
    pub fn as_poller(&self) -> PollingView<K, V> {
        PollingView::new(self.clone())
    }
}

impl<K, V> ExpiringStore<K, V> {
    /// Number of stored sessions, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Check if the store holds no sessions at all.
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.lock().is_empty()
    }

    /// Maximum inactivity before a session expires.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.inner.max_age as u64)
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            entries: self.len(),
            max_age_secs: self.inner.max_age as u64,
        }
    }

    /// Stop the background purge task.
    ///
    /// Sessions still expire on read and [`purge`](Self::purge) still works.
    /// Idempotent.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            debug!("Stopping session purge task");
        }
        self.inner.shutdown.cancel();
    }

    /// Check if the background purge task is still running.
    pub fn is_purge_task_running(&self) -> bool {
        self.inner
            .purge_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl<K, V> Clone for ExpiringStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> std::fmt::Debug for ExpiringStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("entries", &self.len())
            .field("max_age_secs", &self.inner.max_age)
            .finish()
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored sessions, including expired ones not yet purged.
    pub entries: usize,

    /// Maximum inactivity in seconds.
    pub max_age_secs: u64,
}

/// Purges the store every `interval` until cancelled or the store is gone.
async fn purge_loop<K, V>(
    inner: Weak<StoreInner<K, V>>,
    interval: Duration,
    shutdown: CancellationToken,
) where
    K: Clone,
    V: Clone,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let Some(store) = inner.upgrade() else {
                    break;
                };
                store.purge();
            }
        }
    }

    debug!("Session purge task stopped");
}
