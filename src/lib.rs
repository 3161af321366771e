//! Simulated PRC A-share exchange core for quantitative-trading backtesting.
//!
//! Accepts orders, matches them against a stream of market snapshots under
//! T+1 settlement, daily price limits, lot sizing, stamp duty and transfer
//! fees, and emits deterministic trade records. Market-data acquisition,
//! strategy logic, persistence, and configuration loading are host
//! concerns — this crate exposes [`exchange::Exchange`] as its single
//! in-process entry point.

pub mod clock;
pub mod exchange;
pub mod ledger;
pub mod limit_queue;
pub mod matcher;
pub mod money;
pub mod order;
pub mod rules;
pub mod tick;
pub mod trade;

pub use clock::{Clock, FixedClock, SystemClock};
pub use exchange::Exchange;
pub use ledger::{Account, Ledger, LedgerError, Position};
pub use limit_queue::LimitQueue;
pub use matcher::{try_match, MatchOutcome, RejectReason};
pub use money::{round_cent, IdGenerator};
pub use order::{NewOrder, Order, OrderStatus, OrderType, Side};
pub use rules::MarketRules;
pub use tick::TickSnapshot;
pub use trade::TradeRecord;
