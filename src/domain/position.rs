//! Open long positions.

use chrono::NaiveDateTime;

/// A long position held by the ledger. At most one exists per symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: u32,
    pub entry_time: NaiveDateTime,
    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub current_price: Option<f64>,
    pub unrealized_pnl: Option<f64>,
}

impl Position {
    pub fn new(symbol: &str, entry_price: f64, quantity: u32, entry_time: NaiveDateTime) -> Self {
        Position {
            symbol: symbol.to_string(),
            entry_price,
            quantity,
            entry_time,
            stop_loss: None,
            target: None,
            current_price: None,
            unrealized_pnl: None,
        }
    }

    /// entry_price × quantity
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.quantity as f64
    }

    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity as f64
    }

    /// Record a fresh mark.
    pub fn mark(&mut self, price: f64) -> f64 {
        let pnl = self.pnl_at(price);
        self.current_price = Some(price);
        self.unrealized_pnl = Some(pnl);
        pnl
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        self.stop_loss.is_some_and(|stop| price <= stop)
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        self.target.is_some_and(|target| price >= target)
    }
}
