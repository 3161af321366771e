use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

/// Tunable constants the matcher and fee schedule need. Config *loading* is a
/// host concern (out of scope for the core), but the literal values named
/// throughout the spec are grouped here rather than scattered as magic
/// numbers, so a host can override a single rule (e.g. run with a wider
/// liquidity cap for a thin-book experiment) without touching match logic.
#[derive(Debug, Clone)]
pub struct MarketRules {
    /// BUY volumes must be a multiple of this many shares.
    pub lot_size: i64,
    /// Soft overflow guard on order volume (spec §4.3 step 1).
    pub max_volume: i64,
    /// Hard overflow guard on order volume.
    pub max_volume_hard: i64,
    /// Sanity ceiling on LIMIT order price.
    pub max_price: Decimal,
    /// `order.volume <= tick.volume / liquidity_divisor`.
    pub liquidity_divisor: i64,
    /// Orders at or above this size get amplified slippage.
    pub large_order_threshold: i64,
    /// Slippage rate multiplier applied to large orders.
    pub large_order_slippage_multiplier: Decimal,
    /// Daily price-limit percentage for ST-classified symbols.
    pub limit_pct_st: Decimal,
    /// Daily price-limit percentage for STAR Market (688) / ChiNext (300).
    pub limit_pct_growth_board: Decimal,
    /// Daily price-limit percentage for Beijing Exchange symbols (8xxx/4xxx).
    pub limit_pct_bse: Decimal,
    /// Daily price-limit percentage for everything else.
    pub limit_pct_default: Decimal,
    /// Tolerance for "tick is at the daily limit" comparisons.
    pub price_limit_epsilon: Decimal,
    /// Minimum broker commission per trade.
    pub commission_floor: Decimal,
    /// Stamp duty rate, charged on SELL notional only.
    pub stamp_duty_rate: Decimal,
    /// Shanghai transfer fee, per share, both sides.
    pub transfer_fee_rate: Decimal,
    /// Multiplier applied to the pessimistic BUY cash estimate to cover fees.
    pub buy_cash_fee_buffer: Decimal,
    /// Ceiling used to estimate BUY cash reservation when no quote has ever
    /// been seen for the symbol (REDESIGN: replaces the blanket pessimistic
    /// 10^6 ceiling with a last-known-quote estimate, falling back to this
    /// value only for never-quoted symbols — see SPEC_FULL.md §9).
    pub fallback_reservation_price: Decimal,
    /// Divisor for the "still at limit" partial-release fraction: `max(1, n /
    /// queue_release_divisor)`.
    pub queue_release_divisor: i64,
    /// Symbols carrying an ST (special-treatment) designation. `spec.md` does
    /// not say how ST-ness is signaled on the wire (a ticker code alone does
    /// not carry it in real A-share data — it's a name prefix), so this is a
    /// host-configured set, resolved the same way the host resolves symbol
    /// suspension status (spec §6, "stock-status oracle").
    pub st_symbols: HashSet<String>,
}

impl Default for MarketRules {
    fn default() -> Self {
        Self {
            lot_size: 100,
            max_volume: 1_000_000,
            max_volume_hard: 1_000_000_000,
            max_price: dec!(1_000_000),
            liquidity_divisor: 10,
            large_order_threshold: 10_000,
            large_order_slippage_multiplier: dec!(1.5),
            limit_pct_st: dec!(0.05),
            limit_pct_growth_board: dec!(0.20),
            limit_pct_bse: dec!(0.30),
            limit_pct_default: dec!(0.10),
            price_limit_epsilon: dec!(0.01),
            commission_floor: dec!(5.00),
            stamp_duty_rate: dec!(0.001),
            transfer_fee_rate: dec!(0.00002),
            buy_cash_fee_buffer: dec!(1.003),
            fallback_reservation_price: dec!(1_000_000),
            queue_release_divisor: 10,
            st_symbols: HashSet::new(),
        }
    }
}

impl MarketRules {
    /// Daily price-limit percentage for `symbol`, per spec §4.3 step 4.
    pub fn limit_pct(&self, symbol: &str) -> Decimal {
        if self.st_symbols.contains(symbol) {
            self.limit_pct_st
        } else if symbol.starts_with("688") || symbol.starts_with("300") {
            self.limit_pct_growth_board
        } else if symbol.starts_with('8') || symbol.starts_with('4') {
            self.limit_pct_bse
        } else {
            self.limit_pct_default
        }
    }

    /// Shanghai transfer fee applies to symbols quoted on the Shanghai
    /// exchange: a bare numeric code starting with '6', or the `sh.6...`
    /// convention used by some market-data feeds.
    pub fn is_shanghai(&self, symbol: &str) -> bool {
        symbol.starts_with('6') || symbol.starts_with("sh.6")
    }
}
