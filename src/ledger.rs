use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round_cent;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be non-negative, got {0}")]
    NegativeAmount(Decimal),
    #[error("insufficient available cash: available {available}, required {required}")]
    InsufficientCash { available: Decimal, required: Decimal },
    #[error("no position held in {0}")]
    NoSuchPosition(String),
    #[error("insufficient sellable position in {symbol}: available {available}, required {required}")]
    InsufficientPosition {
        symbol: String,
        available: i64,
        required: i64,
    },
    #[error("invalid volume: {0}")]
    InvalidVolume(i64),
    #[error("invalid price: {0}")]
    InvalidPrice(Decimal),
    #[error("symbol must not be empty")]
    EmptySymbol,
}

/// A single-symbol holding. Created on first buy, destroyed when `volume`
/// reaches zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub volume: i64,
    /// Sellable today under T+1.
    pub available_volume: i64,
    /// Reserved by open SELL orders.
    pub frozen_volume: i64,
    pub avg_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    /// Earliest buy date among the position's live lots (YYYYMMDD).
    pub buy_date: i32,
}

impl Position {
    fn recompute_value(&mut self) {
        self.market_value = round_cent(Decimal::from(self.volume) * self.current_price);
        self.unrealized_pnl =
            round_cent(self.market_value - Decimal::from(self.volume) * self.avg_cost);
    }
}

/// Singleton per backtest run. All monetary fields are non-negative;
/// `withdrawable_cash <= available_cash` holds after every settlement and
/// every sell fill (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub initial_capital: Decimal,
    pub available_cash: Decimal,
    pub withdrawable_cash: Decimal,
    pub frozen_cash: Decimal,
    pub today_sell_amount: Decimal,
    pub realized_pnl: Decimal,
    pub positions: HashMap<String, Position>,
}

impl Account {
    pub fn total_assets(&self) -> Decimal {
        let positions_value: Decimal = self.positions.values().map(|p| p.market_value).sum();
        self.available_cash + self.frozen_cash + positions_value
    }
}

/// Mutable ledger state, operated on without locking by [`Ledger`]'s public
/// wrappers. No method here calls another method on `self` while a caller
/// already holds the lock that protects it — there is nothing to re-enter.
struct LedgerState {
    account: Account,
}

impl LedgerState {
    fn freeze_cash(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount(amount));
        }
        if amount > self.account.available_cash {
            return Err(LedgerError::InsufficientCash {
                available: self.account.available_cash,
                required: amount,
            });
        }
        self.account.available_cash = round_cent(self.account.available_cash - amount);
        self.account.frozen_cash = round_cent(self.account.frozen_cash + amount);
        Ok(())
    }

    fn unfreeze_cash(&mut self, amount: Decimal) {
        let amount = amount.clamp(Decimal::ZERO, self.account.frozen_cash);
        self.account.frozen_cash = round_cent(self.account.frozen_cash - amount);
        self.account.available_cash = round_cent(self.account.available_cash + amount);
    }

    fn freeze_position(&mut self, symbol: &str, volume: i64) -> Result<(), LedgerError> {
        if volume <= 0 {
            return Err(LedgerError::InvalidVolume(volume));
        }
        let position = self
            .account
            .positions
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::NoSuchPosition(symbol.to_string()))?;
        let sellable = position.volume - position.frozen_volume;
        if volume > sellable {
            return Err(LedgerError::InsufficientPosition {
                symbol: symbol.to_string(),
                available: sellable,
                required: volume,
            });
        }
        position.frozen_volume += volume;
        Ok(())
    }

    fn unfreeze_position(&mut self, symbol: &str, volume: i64) {
        if let Some(position) = self.account.positions.get_mut(symbol) {
            let volume = volume.clamp(0, position.frozen_volume);
            position.frozen_volume -= volume;
        }
    }

    fn add_position(
        &mut self,
        symbol: &str,
        volume: i64,
        price: Decimal,
        buy_date: i32,
    ) -> Result<(), LedgerError> {
        if symbol.is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if volume <= 0 || volume > 1_000_000_000 {
            return Err(LedgerError::InvalidVolume(volume));
        }
        if price <= Decimal::ZERO || price > Decimal::from(1_000_000) {
            return Err(LedgerError::InvalidPrice(price));
        }

        match self.account.positions.get_mut(symbol) {
            None => {
                let mut position = Position {
                    symbol: symbol.to_string(),
                    volume,
                    available_volume: 0,
                    frozen_volume: 0,
                    avg_cost: round_cent(price),
                    current_price: price,
                    market_value: Decimal::ZERO,
                    unrealized_pnl: Decimal::ZERO,
                    buy_date,
                };
                position.recompute_value();
                self.account.positions.insert(symbol.to_string(), position);
            }
            Some(position) => {
                let new_volume = position.volume + volume;
                let new_cost = round_cent(
                    (Decimal::from(position.volume) * position.avg_cost
                        + Decimal::from(volume) * price)
                        / Decimal::from(new_volume),
                );
                position.volume = new_volume;
                position.avg_cost = new_cost;
                position.buy_date = position.buy_date.min(buy_date);
                position.recompute_value();
            }
        }
        Ok(())
    }

    fn reduce_position(
        &mut self,
        symbol: &str,
        volume: i64,
        sell_price: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let position = self
            .account
            .positions
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::NoSuchPosition(symbol.to_string()))?;
        if volume > position.volume {
            return Err(LedgerError::InsufficientPosition {
                symbol: symbol.to_string(),
                available: position.volume,
                required: volume,
            });
        }

        let realized_pnl = round_cent(Decimal::from(volume) * (sell_price - position.avg_cost));
        let gross_proceeds = Decimal::from(volume) * sell_price;

        self.account.available_cash = round_cent(self.account.available_cash + gross_proceeds);
        self.account.today_sell_amount =
            round_cent(self.account.today_sell_amount + gross_proceeds);
        self.account.realized_pnl = round_cent(self.account.realized_pnl + realized_pnl);

        position.volume -= volume;
        position.available_volume = (position.available_volume - volume).max(0);

        if position.volume == 0 {
            self.account.positions.remove(symbol);
        } else {
            position.recompute_value();
        }

        Ok(realized_pnl)
    }

    fn can_sell(&self, symbol: &str, volume: i64, current_date: i32) -> bool {
        let Some(position) = self.account.positions.get(symbol) else {
            return false;
        };
        if position.buy_date < current_date {
            volume <= position.volume - position.frozen_volume
        } else if position.buy_date == current_date {
            volume <= position.available_volume
        } else {
            false
        }
    }

    fn daily_settlement(&mut self, current_date: i32) {
        self.account.withdrawable_cash = self.account.available_cash;
        self.account.today_sell_amount = Decimal::ZERO;
        for position in self.account.positions.values_mut() {
            if position.buy_date < current_date {
                position.available_volume = position.volume - position.frozen_volume;
            }
        }
    }

    fn update_position_price(&mut self, symbol: &str, price: Decimal) {
        if let Some(position) = self.account.positions.get_mut(symbol) {
            position.current_price = price;
            position.recompute_value();
        }
    }
}

/// Cash buckets, positions, freeze/unfreeze, T+1 unlock, realized P&L.
///
/// Every public method acquires the ledger's own mutex for the duration of
/// the call and none call back into another public method while holding it —
/// see SPEC_FULL.md §5 for why this makes the mutex non-reentrant by
/// construction rather than by relying on a recursive lock.
pub struct Ledger {
    inner: Mutex<LedgerState>,
}

impl Ledger {
    pub fn new(account_id: impl Into<String>, initial_capital: Decimal) -> Self {
        let account_id = account_id.into();
        Self {
            inner: Mutex::new(LedgerState {
                account: Account {
                    account_id,
                    initial_capital,
                    available_cash: initial_capital,
                    withdrawable_cash: initial_capital,
                    frozen_cash: Decimal::ZERO,
                    today_sell_amount: Decimal::ZERO,
                    realized_pnl: Decimal::ZERO,
                    positions: HashMap::new(),
                },
            }),
        }
    }

    pub fn freeze_cash(&self, amount: Decimal) -> Result<(), LedgerError> {
        self.inner.lock().freeze_cash(amount)
    }

    pub fn unfreeze_cash(&self, amount: Decimal) {
        self.inner.lock().unfreeze_cash(amount)
    }

    pub fn freeze_position(&self, symbol: &str, volume: i64) -> Result<(), LedgerError> {
        self.inner.lock().freeze_position(symbol, volume)
    }

    pub fn unfreeze_position(&self, symbol: &str, volume: i64) {
        self.inner.lock().unfreeze_position(symbol, volume)
    }

    pub fn add_position(
        &self,
        symbol: &str,
        volume: i64,
        price: Decimal,
        buy_date: i32,
    ) -> Result<(), LedgerError> {
        self.inner.lock().add_position(symbol, volume, price, buy_date)
    }

    pub fn reduce_position(
        &self,
        symbol: &str,
        volume: i64,
        sell_price: Decimal,
    ) -> Result<Decimal, LedgerError> {
        self.inner.lock().reduce_position(symbol, volume, sell_price)
    }

    pub fn can_sell(&self, symbol: &str, volume: i64, current_date: i32) -> bool {
        self.inner.lock().can_sell(symbol, volume, current_date)
    }

    pub fn daily_settlement(&self, current_date: i32) {
        self.inner.lock().daily_settlement(current_date)
    }

    pub fn update_position_price(&self, symbol: &str, price: Decimal) {
        self.inner.lock().update_position_price(symbol, price)
    }

    /// Composite fill-settlement helper used by the orchestrator, analogous
    /// to `Trade::settle` in the teacher crate composing several ledger
    /// primitives into one atomic operation: debit the actual cost (price *
    /// volume + commission) and add the lot, all under one lock acquisition.
    pub fn settle_buy_fill(
        &self,
        symbol: &str,
        volume: i64,
        price: Decimal,
        commission: Decimal,
        buy_date: i32,
    ) -> Result<(), LedgerError> {
        let mut state = self.inner.lock();
        let cost = round_cent(price * Decimal::from(volume) + commission);
        if cost > state.account.available_cash {
            return Err(LedgerError::InsufficientCash {
                available: state.account.available_cash,
                required: cost,
            });
        }
        state.account.available_cash = round_cent(state.account.available_cash - cost);
        state.add_position(symbol, volume, price, buy_date)
    }

    /// Composite fill-settlement helper for SELL fills: reduce the position
    /// (realizing P&L and crediting gross proceeds), debit the commission,
    /// and release the matching reservation, all under one lock acquisition.
    pub fn settle_sell_fill(
        &self,
        symbol: &str,
        volume: i64,
        price: Decimal,
        commission: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let mut state = self.inner.lock();
        let realized_pnl = state.reduce_position(symbol, volume, price)?;
        state.account.available_cash = round_cent(state.account.available_cash - commission);
        state.unfreeze_position(symbol, volume);
        Ok(realized_pnl)
    }

    pub fn get_total_assets(&self) -> Decimal {
        self.inner.lock().account.total_assets()
    }

    pub fn get_available_cash(&self) -> Decimal {
        self.inner.lock().account.available_cash
    }

    pub fn get_withdrawable_cash(&self) -> Decimal {
        self.inner.lock().account.withdrawable_cash
    }

    pub fn get_frozen_cash(&self) -> Decimal {
        self.inner.lock().account.frozen_cash
    }

    pub fn get_realized_pnl(&self) -> Decimal {
        self.inner.lock().account.realized_pnl
    }

    pub fn get_position(&self, symbol: &str) -> Option<Position> {
        self.inner.lock().account.positions.get(symbol).cloned()
    }

    pub fn get_all_positions(&self) -> Vec<Position> {
        self.inner.lock().account.positions.values().cloned().collect()
    }

    pub fn snapshot(&self) -> Account {
        self.inner.lock().account.clone()
    }
}
