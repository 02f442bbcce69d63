//! Position ledger: open positions, daily realized P&L and the daily loss
//! breaker.
//!
//! The ledger is plain data behind `&mut self`. The trading session owns it
//! behind a mutex; every call here is synchronous and short, so the lock is
//! never held across a venue or data call. Trade records produced by
//! [`PositionLedger::open`] and [`PositionLedger::close`] queue in an outbox
//! that the owner drains and forwards to the record sink after unlocking.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{TraderError, ValidationFailure};
use super::position::Position;
use super::trade::TradeRecord;
use crate::ports::clock_port::Clock;

/// Percent-of-portfolio limits. Both values are percentages, so `1.0`
/// means one percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    pub max_daily_loss_percent: f64,
    pub max_position_size_percent: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            max_daily_loss_percent: 1.0,
            max_position_size_percent: 5.0,
        }
    }
}

impl RiskLimits {
    pub fn max_daily_loss(&self, portfolio_value: f64) -> f64 {
        portfolio_value * self.max_daily_loss_percent / 100.0
    }

    pub fn max_position_value(&self, portfolio_value: f64) -> f64 {
        portfolio_value * self.max_position_size_percent / 100.0
    }
}

/// Realized P&L for one trading date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRiskState {
    pub realized_pnl: f64,
    pub as_of: NaiveDate,
}

impl DailyRiskState {
    fn new(as_of: NaiveDate) -> Self {
        DailyRiskState {
            realized_pnl: 0.0,
            as_of,
        }
    }

    /// Zero the running total when the date moves forward.
    fn roll_to(&mut self, today: NaiveDate) -> bool {
        if today > self.as_of {
            *self = DailyRiskState::new(today);
            true
        } else {
            false
        }
    }
}

pub struct PositionLedger {
    limits: RiskLimits,
    clock: Arc<dyn Clock>,
    positions: HashMap<String, Position>,
    daily: DailyRiskState,
    outbox: Vec<TradeRecord>,
}

impl PositionLedger {
    pub fn new(limits: RiskLimits, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        PositionLedger {
            limits,
            clock,
            positions: HashMap::new(),
            daily: DailyRiskState::new(today),
            outbox: Vec::new(),
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    fn roll_daily(&mut self) {
        let today = self.clock.today();
        if self.daily.roll_to(today) {
            tracing::info!(date = %today, "daily P&L reset");
        }
    }

    /// Breaker check. Trading stays allowed while the day's realized P&L is
    /// strictly above the loss limit.
    pub fn can_trade(&mut self, portfolio_value: f64) -> bool {
        self.roll_daily();
        self.daily.realized_pnl > -self.limits.max_daily_loss(portfolio_value)
    }

    pub fn daily_state(&mut self) -> DailyRiskState {
        self.roll_daily();
        self.daily
    }

    pub fn daily_realized_pnl(&mut self) -> f64 {
        self.daily_state().realized_pnl
    }

    /// Whole shares affordable within the per-position cap.
    pub fn position_size(&self, portfolio_value: f64, price: f64) -> u32 {
        if price <= 0.0 || !price.is_finite() {
            return 0;
        }
        let shares = (self.limits.max_position_value(portfolio_value) / price).floor();
        if shares <= 0.0 {
            0
        } else {
            shares.min(u32::MAX as f64) as u32
        }
    }

    pub fn open(
        &mut self,
        symbol: &str,
        entry_price: f64,
        quantity: u32,
        stop_loss: Option<f64>,
        target: Option<f64>,
    ) -> Result<&Position, TraderError> {
        if quantity == 0 {
            return Err(TraderError::validation(
                symbol,
                ValidationFailure::NonPositiveQuantity(0),
            ));
        }
        if self.positions.contains_key(symbol) {
            return Err(TraderError::validation(
                symbol,
                ValidationFailure::PositionExists,
            ));
        }

        let mut position = Position::new(symbol, entry_price, quantity, self.clock.now());
        position.stop_loss = stop_loss;
        position.target = target;

        self.outbox.push(TradeRecord::opened(&position));
        tracing::info!(
            symbol,
            entry_price,
            quantity,
            stop_loss,
            target,
            "position opened"
        );

        Ok(self.positions.entry(symbol.to_string()).or_insert(position))
    }

    /// Close the position at `exit_price` and return its realized P&L.
    /// Closing a symbol with no position is a no-op returning zero.
    pub fn close(&mut self, symbol: &str, exit_price: f64) -> f64 {
        let Some(position) = self.positions.remove(symbol) else {
            return 0.0;
        };

        self.roll_daily();
        let pnl = position.pnl_at(exit_price);
        self.daily.realized_pnl += pnl;
        self.outbox
            .push(TradeRecord::closed(&position, exit_price, self.clock.now()));

        tracing::info!(
            symbol,
            exit_price,
            pnl,
            daily_pnl = self.daily.realized_pnl,
            "position closed"
        );
        pnl
    }

    /// Sell `quantity` shares at `exit_price`. Selling the whole holding (or
    /// more) is a full [`close`](Self::close); less leaves the remainder open
    /// with its stop and target unchanged.
    pub fn reduce(&mut self, symbol: &str, quantity: u32, exit_price: f64) -> f64 {
        let held = match self.positions.get(symbol) {
            Some(position) => position.quantity,
            None => return 0.0,
        };
        if quantity >= held {
            return self.close(symbol, exit_price);
        }
        if quantity == 0 {
            return 0.0;
        }

        self.roll_daily();
        let now = self.clock.now();
        let Some(position) = self.positions.get_mut(symbol) else {
            return 0.0;
        };
        let mut sold = position.clone();
        sold.quantity = quantity;
        position.quantity -= quantity;

        let pnl = sold.pnl_at(exit_price);
        self.daily.realized_pnl += pnl;
        self.outbox.push(TradeRecord::closed(&sold, exit_price, now));

        tracing::info!(
            symbol,
            exit_price,
            quantity,
            remaining = held - quantity,
            pnl,
            "position reduced"
        );
        pnl
    }

    /// Mark every held symbol present in `prices` and return the summed
    /// unrealized P&L over all positions.
    pub fn update_marks(&mut self, prices: &HashMap<String, f64>) -> f64 {
        for (symbol, position) in self.positions.iter_mut() {
            if let Some(&price) = prices.get(symbol) {
                position.mark(price);
            }
        }
        self.unrealized_pnl()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.positions
            .values()
            .filter_map(|p| p.unrealized_pnl)
            .sum()
    }

    /// Raise the stop on `symbol`. A proposal at or below the current stop
    /// is ignored. Returns whether the stop moved.
    pub fn update_stop_loss(&mut self, symbol: &str, new_stop: f64) -> bool {
        let Some(position) = self.positions.get_mut(symbol) else {
            return false;
        };
        match position.stop_loss {
            Some(current) if new_stop <= current => false,
            _ => {
                tracing::debug!(symbol, old = ?position.stop_loss, new = new_stop, "stop raised");
                position.stop_loss = Some(new_stop);
                true
            }
        }
    }

    /// Sum of entry price × quantity over open positions.
    pub fn total_exposure(&self) -> f64 {
        self.positions.values().map(Position::cost_basis).sum()
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Copies of every open position, ordered by symbol.
    pub fn positions(&self) -> Vec<Position> {
        let mut all: Vec<Position> = self.positions.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    /// Take every trade record queued since the last drain.
    pub fn drain_records(&mut self) -> Vec<TradeRecord> {
        std::mem::take(&mut self.outbox)
    }
}
