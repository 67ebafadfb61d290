//! Time sources for session expiration.

/// Source of the current time in whole Unix seconds.
///
/// Any `Fn() -> i64` closure is a clock, which lets tests drive expiration
/// deterministically.
pub trait Clock: Send + Sync + 'static {
    /// Current time in seconds.
    fn now(&self) -> i64;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

impl<F> Clock for F
where
    F: Fn() -> i64 + Send + Sync + 'static,
{
    fn now(&self) -> i64 {
        self()
    }
}
