use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for order/trade id stamping and `submit_time`.
///
/// Business logic never calls `SystemTime::now()` directly so that tests can
/// drive the exchange with a fully reproducible clock instead of sleeping.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real wall-clock time, used by hosts running against a live or replayed feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when explicitly advanced or set.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.millis.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.millis.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Convert an epoch-millisecond timestamp to a YYYYMMDD integer (UTC).
pub fn ms_to_yyyymmdd(timestamp_ms: i64) -> i32 {
    use chrono::DateTime;
    let dt = DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default();
    let d = dt.date_naive();
    d.format("%Y%m%d").to_string().parse().unwrap_or(0)
}
