//! Orders, fills and trade records exchanged with the execution venue and
//! the record sink.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use super::error::ValidationFailure;
use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = ValidationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            _ => Err(ValidationFailure::UnknownSide(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Success,
    Failure,
}

/// What the venue reports back for a market order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub status: OrderStatus,
    pub filled_price: f64,
    pub timestamp: NaiveDateTime,
}

impl Fill {
    pub fn is_success(&self) -> bool {
        self.status == OrderStatus::Success
    }
}

/// One row of trade history. BUY rows describe an entry; SELL rows also
/// carry the exit and the realized P&L.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u32,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_price: Option<f64>,
    pub exit_time: Option<NaiveDateTime>,
    pub pnl: Option<f64>,
}

impl TradeRecord {
    pub fn opened(position: &Position) -> Self {
        TradeRecord {
            symbol: position.symbol.clone(),
            side: TradeSide::Buy,
            quantity: position.quantity,
            entry_price: position.entry_price,
            entry_time: position.entry_time,
            exit_price: None,
            exit_time: None,
            pnl: None,
        }
    }

    pub fn closed(position: &Position, exit_price: f64, exit_time: NaiveDateTime) -> Self {
        TradeRecord {
            symbol: position.symbol.clone(),
            side: TradeSide::Sell,
            quantity: position.quantity,
            entry_price: position.entry_price,
            entry_time: position.entry_time,
            exit_price: Some(exit_price),
            exit_time: Some(exit_time),
            pnl: Some(position.pnl_at(exit_price)),
        }
    }
}
