use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

use crate::clock::{ms_to_yyyymmdd, Clock, SystemClock};
use crate::ledger::Ledger;
use crate::limit_queue::LimitQueue;
use crate::matcher::{self, MatchOutcome};
use crate::money::{round_cent, IdGenerator};
use crate::order::{NewOrder, Order, OrderStatus, OrderType, Side};
use crate::rules::MarketRules;
use crate::tick::TickSnapshot;
use crate::trade::TradeRecord;

/// Everything the Orchestrator owns directly: the order registry (plus an
/// insertion-order index, since iteration order over a `HashMap` is not
/// spec'd), the trade tape, outstanding BUY cash reservations keyed by
/// `order_id`, the last quoted price per symbol (used to estimate a BUY
/// reservation instead of a blanket ceiling), and which pending orders are
/// currently sitting in the limit queue.
struct OrchestratorState {
    orders: HashMap<String, Order>,
    order_index: Vec<String>,
    trades: Vec<TradeRecord>,
    reservations: HashMap<String, Decimal>,
    last_price: HashMap<String, Decimal>,
    parked: HashSet<String>,
}

impl OrchestratorState {
    fn insert_order(&mut self, order: Order) {
        self.order_index.push(order.order_id.clone());
        self.orders.insert(order.order_id.clone(), order);
    }
}

/// Single entry point for order submission, tick-driven matching, and
/// settlement. Every public method here acquires `state` once for its
/// entire duration and then calls into the Ledger and the LimitQueue, which
/// guard themselves — preserving the lock order Orchestrator -> Ledger ->
/// Queue without any lock being acquired twice by the same thread.
pub struct Exchange {
    state: Mutex<OrchestratorState>,
    ledger: Ledger,
    queue: LimitQueue,
    rules: MarketRules,
    clock: Box<dyn Clock + Send + Sync>,
    ids: IdGenerator,
    rng: Mutex<StdRng>,
}

impl Exchange {
    pub fn new(account_id: impl Into<String>, initial_capital: Decimal, rules: MarketRules) -> Self {
        Self::with_clock(account_id, initial_capital, rules, Box::new(SystemClock))
    }

    pub fn with_clock(
        account_id: impl Into<String>,
        initial_capital: Decimal,
        rules: MarketRules,
        clock: Box<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            state: Mutex::new(OrchestratorState {
                orders: HashMap::new(),
                order_index: Vec::new(),
                trades: Vec::new(),
                reservations: HashMap::new(),
                last_price: HashMap::new(),
                parked: HashSet::new(),
            }),
            ledger: Ledger::new(account_id, initial_capital),
            queue: LimitQueue::new(),
            rules,
            clock,
            ids: IdGenerator::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Last-known quote for `symbol`, falling back to
    /// `rules.fallback_reservation_price` for a symbol never seen in a tick
    /// (REDESIGN: replaces the blanket `10^6` pessimistic ceiling for MARKET
    /// BUY reservations — see SPEC_FULL.md §9).
    fn reservation_price(&self, state: &OrchestratorState, symbol: &str, order_type: OrderType, limit_price: Decimal) -> Decimal {
        if order_type == OrderType::Limit {
            return limit_price;
        }
        state
            .last_price
            .get(symbol)
            .copied()
            .unwrap_or(self.rules.fallback_reservation_price)
    }

    pub fn submit_order(&self, new_order: NewOrder) -> String {
        let mut state = self.state.lock();
        self.submit_order_locked(&mut state, new_order)
    }

    fn submit_order_locked(&self, state: &mut OrchestratorState, new_order: NewOrder) -> String {
        let now = self.clock.now_ms();
        let order_id = self.ids.next_order_id(now, &new_order.symbol);

        let mut order = Order {
            order_id: order_id.clone(),
            symbol: new_order.symbol,
            side: new_order.side,
            order_type: new_order.order_type,
            price: new_order.price,
            volume: new_order.volume,
            filled_volume: 0,
            status: OrderStatus::Pending,
            submit_time: now,
            cancel_time: None,
            filled_time: None,
            commission_rate: new_order.commission_rate,
            slippage_rate: new_order.slippage_rate,
            client_order_id: new_order.client_order_id,
        };

        let invalid = order.volume <= 0 || (order.order_type == OrderType::Limit && order.price <= Decimal::ZERO);
        if invalid {
            order.status = OrderStatus::Rejected;
            state.insert_order(order);
            return order_id;
        }

        match order.side {
            Side::Buy => {
                let ref_price = self.reservation_price(state, &order.symbol, order.order_type, order.price);
                let estimate = round_cent(Decimal::from(order.volume) * ref_price * self.rules.buy_cash_fee_buffer);
                match self.ledger.freeze_cash(estimate) {
                    Ok(()) => {
                        state.reservations.insert(order_id.clone(), estimate);
                    }
                    Err(_) => order.status = OrderStatus::Rejected,
                }
            }
            Side::Sell => {
                let current_date = ms_to_yyyymmdd(now);
                if !self.ledger.can_sell(&order.symbol, order.volume, current_date) {
                    order.status = OrderStatus::Rejected;
                } else if self.ledger.freeze_position(&order.symbol, order.volume).is_err() {
                    order.status = OrderStatus::Rejected;
                }
            }
        }

        state.insert_order(order);
        order_id
    }

    pub fn on_tick(&self, tick: TickSnapshot) {
        let mut state = self.state.lock();
        self.on_tick_locked(&mut state, tick);
    }

    fn on_tick_locked(&self, state: &mut OrchestratorState, tick: TickSnapshot) {
        let current_time = tick.timestamp;
        let current_date = ms_to_yyyymmdd(current_time);

        self.ledger.update_position_price(&tick.symbol, tick.last_price);
        state.last_price.insert(tick.symbol.clone(), tick.last_price);

        let (at_upper, at_lower) = if tick.last_close > Decimal::ZERO {
            let limit_pct = self.rules.limit_pct(&tick.symbol);
            let limit_up = tick.last_close * (Decimal::ONE + limit_pct);
            let limit_down = tick.last_close * (Decimal::ONE - limit_pct);
            (
                (tick.last_price - limit_up).abs() < self.rules.price_limit_epsilon,
                (tick.last_price - limit_down).abs() < self.rules.price_limit_epsilon,
            )
        } else {
            (false, false)
        };

        for (side, still_at_limit) in [(Side::Buy, at_upper), (Side::Sell, at_lower)] {
            let released = self.queue.drain(side, &tick.symbol, still_at_limit);
            for order_id in released {
                state.parked.remove(&order_id);
                self.attempt_match_locked(state, &order_id, &tick, current_time, current_date, true);
            }
        }

        let pending_ids: Vec<String> = state
            .order_index
            .iter()
            .filter(|id| {
                state
                    .orders
                    .get(*id)
                    .is_some_and(|o| o.symbol == tick.symbol && o.is_pending() && !state.parked.contains(*id))
            })
            .cloned()
            .collect();

        for order_id in pending_ids {
            self.attempt_match_locked(state, &order_id, &tick, current_time, current_date, true);
        }
    }

    fn attempt_match_locked(
        &self,
        state: &mut OrchestratorState,
        order_id: &str,
        tick: &TickSnapshot,
        current_time: i64,
        current_date: i32,
        check_price_limit: bool,
    ) {
        let Some(order) = state.orders.get(order_id).cloned() else { return };
        if !order.is_pending() {
            return;
        }

        let outcome = {
            let mut rng = self.rng.lock();
            matcher::try_match(&order, tick, &self.rules, check_price_limit, &mut *rng)
        };

        match outcome {
            MatchOutcome::Filled { price, volume } => {
                self.process_fill_locked(state, order_id, price, volume, current_time, current_date);
            }
            MatchOutcome::LimitPriceDefer => {
                state.parked.remove(order_id);
            }
            MatchOutcome::PriceLimitParked => {
                self.queue.enqueue(order.side, &order.symbol, order_id.to_string());
                state.parked.insert(order_id.to_string());
            }
            MatchOutcome::Rejected(_reason) => {
                self.finish_reject_locked(state, order_id, current_time);
            }
        }
    }

    fn process_fill_locked(
        &self,
        state: &mut OrchestratorState,
        order_id: &str,
        price: Decimal,
        volume: i64,
        current_time: i64,
        current_date: i32,
    ) {
        let order = state.orders.get(order_id).cloned().expect("order exists in registry");
        debug_assert_eq!(volume, order.volume, "matcher violated the all-or-nothing fill invariant");
        let commission = matcher::total_commission(order.side, &order.symbol, price, volume, order.commission_rate, &self.rules);

        match order.side {
            Side::Buy => {
                if let Some(reserved) = state.reservations.remove(order_id) {
                    self.ledger.unfreeze_cash(reserved);
                }
                match self.ledger.settle_buy_fill(&order.symbol, volume, price, commission, current_date) {
                    Ok(()) => self.finish_fill_locked(state, order_id, price, volume, commission, Decimal::ZERO, current_time),
                    Err(err) => {
                        tracing::warn!(order_id, %err, "buy settlement failed after a successful match");
                        self.finish_reject_locked(state, order_id, current_time);
                    }
                }
            }
            Side::Sell => match self.ledger.settle_sell_fill(&order.symbol, volume, price, commission) {
                Ok(realized_pnl) => {
                    self.finish_fill_locked(state, order_id, price, volume, commission, realized_pnl, current_time)
                }
                Err(err) => {
                    tracing::warn!(order_id, %err, "sell settlement failed after a successful match");
                    self.ledger.unfreeze_position(&order.symbol, order.volume);
                    self.finish_reject_locked(state, order_id, current_time);
                }
            },
        }
    }

    fn finish_fill_locked(
        &self,
        state: &mut OrchestratorState,
        order_id: &str,
        price: Decimal,
        volume: i64,
        commission: Decimal,
        realized_pnl: Decimal,
        current_time: i64,
    ) {
        let trade_id = self.ids.next_trade_id(current_time);
        let order = state.orders.get_mut(order_id).expect("order exists in registry");
        order.status = OrderStatus::Filled;
        order.filled_volume = volume;
        order.filled_time = Some(current_time);

        let trade = TradeRecord {
            trade_id,
            order_id: order_id.to_string(),
            symbol: order.symbol.clone(),
            side: order.side,
            price,
            volume,
            commission,
            trade_time: current_time,
            realized_pnl,
        };
        state.trades.push(trade);
        state.parked.remove(order_id);
    }

    fn finish_reject_locked(&self, state: &mut OrchestratorState, order_id: &str, _current_time: i64) {
        let order = state.orders.get(order_id).cloned().expect("order exists in registry");
        match order.side {
            Side::Buy => {
                if let Some(amount) = state.reservations.remove(order_id) {
                    self.ledger.unfreeze_cash(amount);
                }
            }
            Side::Sell => self.ledger.unfreeze_position(&order.symbol, order.volume),
        }
        let order = state.orders.get_mut(order_id).expect("order exists in registry");
        order.status = OrderStatus::Rejected;
        state.parked.remove(order_id);
    }

    pub fn cancel_order(&self, order_id: &str) -> bool {
        let mut state = self.state.lock();
        let Some(order) = state.orders.get(order_id).cloned() else { return false };
        if !order.is_pending() {
            return false;
        }

        match order.side {
            Side::Buy => {
                if let Some(amount) = state.reservations.remove(order_id) {
                    self.ledger.unfreeze_cash(amount);
                }
            }
            Side::Sell => self.ledger.unfreeze_position(&order.symbol, order.volume),
        }

        let now = self.clock.now_ms();
        let order = state.orders.get_mut(order_id).expect("order exists in registry");
        order.status = OrderStatus::Cancelled;
        order.cancel_time = Some(now);
        state.parked.remove(order_id);
        drop(state);

        self.queue.remove_from_queue(order_id);
        true
    }

    pub fn daily_settlement(&self, current_date: i32) {
        let _state = self.state.lock();
        self.ledger.daily_settlement(current_date);
    }

    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        self.state.lock().orders.get(order_id).cloned()
    }

    pub fn get_pending_orders(&self) -> Vec<Order> {
        let state = self.state.lock();
        state
            .order_index
            .iter()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| o.is_pending())
            .cloned()
            .collect()
    }

    pub fn get_pending_orders_for_symbol(&self, symbol: &str) -> Vec<Order> {
        let state = self.state.lock();
        state
            .order_index
            .iter()
            .filter_map(|id| state.orders.get(id))
            .filter(|o| o.is_pending() && o.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn get_trade_history(&self) -> Vec<TradeRecord> {
        self.state.lock().trades.clone()
    }

    pub fn get_position(&self, symbol: &str) -> Option<crate::ledger::Position> {
        self.ledger.get_position(symbol)
    }

    pub fn get_all_positions(&self) -> Vec<crate::ledger::Position> {
        self.ledger.get_all_positions()
    }

    pub fn get_total_assets(&self) -> Decimal {
        self.ledger.get_total_assets()
    }

    pub fn get_available_cash(&self) -> Decimal {
        self.ledger.get_available_cash()
    }

    pub fn get_withdrawable_cash(&self) -> Decimal {
        self.ledger.get_withdrawable_cash()
    }

    pub fn get_frozen_cash(&self) -> Decimal {
        self.ledger.get_frozen_cash()
    }
}
