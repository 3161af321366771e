use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

/// `PartialFilled` is part of the data model's status space (spec §3) but is
/// unreachable under the current Matcher, which fills all-or-nothing per
/// tick (spec §4.3 step 7). Kept for API completeness and forward
/// compatibility with a partial-fill-capable matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PartialFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::PartialFilled => write!(f, "partial_filled"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A strategy's request to buy or sell. Submitted via
/// [`crate::exchange::Exchange::submit_order`]; everything below `order_id`
/// is supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Zero for MARKET orders; must be `> 0` for LIMIT orders.
    pub price: Decimal,
    pub volume: i64,
    pub filled_volume: i64,
    pub status: OrderStatus,
    pub submit_time: i64,
    pub cancel_time: Option<i64>,
    pub filled_time: Option<i64>,
    pub commission_rate: Decimal,
    pub slippage_rate: Decimal,
    /// Opaque correlation id echoed back to the caller; never interpreted by
    /// matching logic.
    pub client_order_id: Option<String>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// Fields a caller supplies to [`crate::exchange::Exchange::submit_order`];
/// everything else (`order_id`, `status`, timestamps, `filled_volume`) is
/// stamped by the orchestrator.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Decimal,
    pub volume: i64,
    pub commission_rate: Decimal,
    pub slippage_rate: Decimal,
    pub client_order_id: Option<String>,
}
