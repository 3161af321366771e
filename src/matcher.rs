use rand::Rng;
use rust_decimal::Decimal;

use crate::money::round_cent;
use crate::order::{Order, OrderType, Side};
use crate::rules::MarketRules;
use crate::tick::TickSnapshot;

/// Why an order did not fill outright, as a hard rejection. Kept separate
/// from the "still pending" outcomes below so the Orchestrator dispatches on
/// a closed type rather than matching substrings of a reason string (the
/// substring-discrimination scheme spec'd as a fallback is not used here —
/// see SPEC_FULL.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InvalidVolume,
    NonLotVolume,
    VolumeTooLarge,
    InvalidPrice,
    InvalidTickPrice,
    InsufficientLiquidity,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InvalidVolume => write!(f, "invalid volume"),
            RejectReason::NonLotVolume => write!(f, "buy volume is not a multiple of the lot size"),
            RejectReason::VolumeTooLarge => write!(f, "volume exceeds the maximum order size"),
            RejectReason::InvalidPrice => write!(f, "invalid limit price"),
            RejectReason::InvalidTickPrice => write!(f, "tick has a non-positive last price"),
            RejectReason::InsufficientLiquidity => write!(f, "insufficient tick liquidity"),
        }
    }
}

/// The closed set of things `try_match` can decide. `Filled` and `Rejected`
/// are terminal for this tick; `LimitPriceDefer` and `PriceLimitParked` leave
/// the order PENDING, the latter routed through the limit queue by the
/// Orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Filled { price: Decimal, volume: i64 },
    /// LIMIT order whose price the current tick does not reach. Order stays
    /// PENDING, no queueing.
    LimitPriceDefer,
    /// Reference price sits outside today's [limit_down, limit_up] band.
    /// Order stays PENDING and is parked onto the limit queue.
    PriceLimitParked,
    Rejected(RejectReason),
}

/// Decides, without mutating any state, whether `order` fills against `tick`
/// and at what price. `check_price_limit` lets the Orchestrator skip the
/// price-limit test when revalidating an order already released from the
/// limit queue's "price opened" path, where the price is known to have moved
/// off the limit (spec §4.4).
pub fn try_match(
    order: &Order,
    tick: &TickSnapshot,
    rules: &MarketRules,
    check_price_limit: bool,
    rng: &mut impl Rng,
) -> MatchOutcome {
    // 1. Volume validation.
    if order.volume <= 0 || order.volume > rules.max_volume {
        return MatchOutcome::Rejected(RejectReason::VolumeTooLarge);
    }
    if order.volume > rules.max_volume_hard {
        return MatchOutcome::Rejected(RejectReason::VolumeTooLarge);
    }
    if order.side == Side::Buy && order.volume % rules.lot_size != 0 {
        return MatchOutcome::Rejected(RejectReason::NonLotVolume);
    }

    // 2. Tick sanity.
    if tick.last_price <= Decimal::ZERO {
        return MatchOutcome::Rejected(RejectReason::InvalidTickPrice);
    }
    if order.order_type == OrderType::Limit && order.price <= Decimal::ZERO {
        return MatchOutcome::Rejected(RejectReason::InvalidPrice);
    }

    // 3. Reference price.
    let reference = match (order.order_type, order.side) {
        (OrderType::Market, Side::Buy) => tick.ask_price,
        (OrderType::Market, Side::Sell) => tick.bid_price,
        (OrderType::Limit, Side::Buy) => {
            if tick.ask_price > order.price {
                return MatchOutcome::LimitPriceDefer;
            }
            order.price
        }
        (OrderType::Limit, Side::Sell) => {
            if tick.bid_price < order.price {
                return MatchOutcome::LimitPriceDefer;
            }
            order.price
        }
    };

    // 4. Price-limit check.
    if check_price_limit && tick.last_close > Decimal::ZERO {
        let limit_pct = rules.limit_pct(&order.symbol);
        let limit_up = tick.last_close * (Decimal::ONE + limit_pct);
        let limit_down = tick.last_close * (Decimal::ONE - limit_pct);
        if reference < limit_down || reference > limit_up {
            return MatchOutcome::PriceLimitParked;
        }
    }

    // 5. Liquidity cap.
    if tick.volume > 0 && order.volume > tick.volume / rules.liquidity_divisor {
        return MatchOutcome::Rejected(RejectReason::InsufficientLiquidity);
    }

    // 6. Slippage: draw an integer milli in [-1000, 1000] and scale to a
    // Decimal in [-1, 1] to keep the whole computation exact.
    let u_milli: i64 = rng.gen_range(-1000..=1000);
    let u = Decimal::new(u_milli, 3);
    let mut effective_rate = order.slippage_rate;
    if order.volume > rules.large_order_threshold {
        effective_rate *= rules.large_order_slippage_multiplier;
    }
    let s = effective_rate * u.abs();
    let filled_price = round_cent(match order.side {
        Side::Buy => reference * (Decimal::ONE + s),
        Side::Sell => reference * (Decimal::ONE - s),
    });

    // 7. All-or-nothing fill.
    MatchOutcome::Filled {
        price: filled_price,
        volume: order.volume,
    }
}

/// `amount = price * volume`; broker commission floored at
/// `rules.commission_floor`; stamp duty on SELL notional only; Shanghai
/// transfer fee per share on both sides.
pub fn total_commission(
    side: Side,
    symbol: &str,
    price: Decimal,
    volume: i64,
    commission_rate: Decimal,
    rules: &MarketRules,
) -> Decimal {
    debug_assert!(volume > 0, "commission requested for a non-positive fill volume");
    let amount = price * Decimal::from(volume);
    let broker = (amount * commission_rate).max(rules.commission_floor);
    let stamp_duty = if side == Side::Sell {
        amount * rules.stamp_duty_rate
    } else {
        Decimal::ZERO
    };
    let transfer_fee = if rules.is_shanghai(symbol) {
        Decimal::from(volume) * rules.transfer_fee_rate
    } else {
        Decimal::ZERO
    };
    round_cent(broker + stamp_duty + transfer_fee)
}
