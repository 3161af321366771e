use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single market-data update, fed to [`crate::exchange::Exchange::on_tick`]
/// by the host's market-data acquisition layer (out of scope for this
/// crate). Any fields beyond the ones listed here are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub symbol: String,
    /// Milliseconds since epoch.
    pub timestamp: i64,
    pub last_price: Decimal,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
    /// Traded volume on this tick.
    pub volume: i64,
    /// Prior trading day's close, used for price-limit computation.
    pub last_close: Decimal,
}
