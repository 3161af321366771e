use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::Side;

/// An immutable fill record, appended once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub volume: i64,
    /// Total fee charged (broker commission + stamp duty + transfer fee).
    pub commission: Decimal,
    pub trade_time: i64,
    /// Zero for BUY fills; realized P&L for SELL fills against the position's
    /// average cost.
    pub realized_pnl: Decimal,
}
