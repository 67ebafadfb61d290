//! In-memory session store with inactivity-based expiration.
//!
//! This crate provides the storage layer behind ephemeral session data:
//! - A single-lock map from session id to a bag of values
//! - Expiry once a session is inactive for longer than a max age
//! - Shallow copies on every save and read, so callers never share a map
//!   with the store
//! - A cancellable background task that purges expired sessions
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use lapse_session::{ExpiringStore, SessionData};
//!
//! #[tokio::main]
//! async fn main() -> lapse_session::Result<()> {
//!     let store: ExpiringStore<String, i64> = ExpiringStore::new(900)?;
//!
//!     store.save("session-1", &HashMap::from([("count".to_string(), 3)]));
//!     assert_eq!(store.get("session-1").unwrap()["count"], 3);
//!
//!     // Monitoring reads that should not keep sessions alive
//!     let poller = store.as_poller();
//!     let _ = poller.get_data("session-1")?;
//!
//!     store.shutdown();
//!     Ok(())
//! }
//! ```

mod clock;
mod config;
mod data;
mod entry;
mod error;
mod store;

pub use clock::{Clock, SystemClock};
pub use config::{DEFAULT_MAX_AGE_SECS, StoreConfig};
pub use data::{PollingView, SessionData};
pub use entry::Values;
pub use error::{Error, Result};
pub use store::{ExpiringStore, StoreStats};
