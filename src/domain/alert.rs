//! Price alerts.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Above,
    Below,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Above => write!(f, "ABOVE"),
            AlertKind::Below => write!(f, "BELOW"),
        }
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ABOVE" => Ok(AlertKind::Above),
            "BELOW" => Ok(AlertKind::Below),
            other => Err(format!("unknown alert kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub symbol: String,
    pub price_target: f64,
    pub kind: AlertKind,
    pub triggered: bool,
    pub created_at: NaiveDateTime,
}

impl PriceAlert {
    pub fn new(symbol: &str, price_target: f64, kind: AlertKind, created_at: NaiveDateTime) -> Self {
        PriceAlert {
            symbol: symbol.to_string(),
            price_target,
            kind,
            triggered: false,
            created_at,
        }
    }

    /// Inclusive: a price equal to the target fires either kind.
    pub fn is_triggered_by(&self, price: f64) -> bool {
        match self.kind {
            AlertKind::Above => price >= self.price_target,
            AlertKind::Below => price <= self.price_target,
        }
    }
}
