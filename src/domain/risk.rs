//! Pre-trade validation and risk checks.
//!
//! [`validate`] rejects malformed requests before any limit is consulted.
//! [`RiskGate::check`] then applies the per-trade cap, the daily breaker and
//! the aggregate exposure cap, in that order, and reports the first limit
//! that fails.

use super::error::{RiskLimit, TraderError, ValidationFailure};
use super::ledger::PositionLedger;
use super::trade::TradeSide;

/// Structural checks on a trade request. Quantity is taken as signed so
/// that non-positive requests can be reported rather than unrepresentable.
pub fn validate(
    ledger: &PositionLedger,
    symbol: &str,
    side: TradeSide,
    quantity: i64,
) -> Result<u32, TraderError> {
    if quantity <= 0 {
        return Err(TraderError::validation(
            symbol,
            ValidationFailure::NonPositiveQuantity(quantity),
        ));
    }
    let requested = u32::try_from(quantity).map_err(|_| {
        TraderError::validation(symbol, ValidationFailure::NonPositiveQuantity(quantity))
    })?;

    if side == TradeSide::Sell {
        let position = ledger
            .position(symbol)
            .ok_or_else(|| TraderError::validation(symbol, ValidationFailure::NoPosition))?;
        if position.quantity < requested {
            return Err(TraderError::validation(
                symbol,
                ValidationFailure::InsufficientQuantity {
                    held: position.quantity,
                    requested,
                },
            ));
        }
    }
    Ok(requested)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskGate {
    /// Fraction of the portfolio one trade may carry, e.g. `0.02`.
    pub risk_per_trade: f64,
}

impl Default for RiskGate {
    fn default() -> Self {
        RiskGate {
            risk_per_trade: 0.02,
        }
    }
}

impl RiskGate {
    pub fn new(risk_per_trade: f64) -> Self {
        RiskGate { risk_per_trade }
    }

    pub fn max_trade_value(&self, portfolio_value: f64) -> f64 {
        portfolio_value * self.risk_per_trade
    }

    /// Entry quantity: the ledger's position-size cap, further clipped so
    /// the trade value stays within the per-trade budget.
    pub fn entry_quantity(&self, ledger: &PositionLedger, portfolio_value: f64, price: f64) -> u32 {
        let by_position = ledger.position_size(portfolio_value, price);
        if price <= 0.0 || !price.is_finite() {
            return 0;
        }
        let by_risk = (self.max_trade_value(portfolio_value) / price).floor();
        if by_risk <= 0.0 {
            return 0;
        }
        by_position.min(by_risk.min(u32::MAX as f64) as u32)
    }

    /// Check a proposed entry of `quantity` shares at `price`.
    pub fn check(
        &self,
        ledger: &mut PositionLedger,
        symbol: &str,
        quantity: u32,
        price: f64,
        portfolio_value: f64,
    ) -> Result<(), TraderError> {
        let trade_value = price * quantity as f64;
        let reject = |limit: RiskLimit| {
            tracing::warn!(symbol, %limit, "trade rejected by risk gate");
            Err(TraderError::RiskLimitExceeded {
                symbol: symbol.to_string(),
                limit,
            })
        };

        let max = self.max_trade_value(portfolio_value);
        if trade_value > max {
            return reject(RiskLimit::PerTrade { trade_value, max });
        }

        if !ledger.can_trade(portfolio_value) {
            return reject(RiskLimit::DailyLoss {
                realized: ledger.daily_realized_pnl(),
                max_loss: ledger.limits().max_daily_loss(portfolio_value),
            });
        }

        let current = ledger.total_exposure();
        let max = ledger.limits().max_position_value(portfolio_value);
        if current + trade_value > max {
            return reject(RiskLimit::Exposure {
                current,
                trade_value,
                max,
            });
        }

        Ok(())
    }
}
