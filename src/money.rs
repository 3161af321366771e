use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::atomic::{AtomicU64, Ordering};

/// Round to cents, half-away-from-zero. Applied only at value-storage
/// boundaries (Position/Account fields, emitted TradeRecords) — intermediate
/// sums are carried at full `Decimal` precision.
pub fn round_cent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Generates `ORDER_<epoch_ms>_<symbol>_<counter>` and `TRADE_<epoch_ms>_<counter>`
/// ids. Both counters are per-exchange and strictly increasing, so ids are
/// unique even when two orders are stamped in the same millisecond.
#[derive(Debug, Default)]
pub struct IdGenerator {
    order_counter: AtomicU64,
    trade_counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_order_id(&self, epoch_ms: i64, symbol: &str) -> String {
        let n = self.order_counter.fetch_add(1, Ordering::Relaxed);
        debug_assert!(n != u64::MAX, "order id counter exhausted its id space");
        format!("ORDER_{epoch_ms}_{symbol}_{n}")
    }

    pub fn next_trade_id(&self, epoch_ms: i64) -> String {
        let n = self.trade_counter.fetch_add(1, Ordering::Relaxed);
        debug_assert!(n != u64::MAX, "trade id counter exhausted its id space");
        format!("TRADE_{epoch_ms}_{n}")
    }
}
