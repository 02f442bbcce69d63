//! Market-wide context: volatility regime and trading hours.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

/// Snapshot of the broad market, fetched once per scan cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityContext {
    pub index_change_percent: f64,
    pub volatility_index: f64,
    pub is_market_open: bool,
}

impl VolatilityContext {
    /// Whether new entries are suppressed at `threshold`.
    pub fn is_elevated(&self, threshold: f64) -> bool {
        self.volatility_index > threshold
    }
}

/// Whole-hour trading window on weekdays, `[open_hour, close_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for TradingHours {
    fn default() -> Self {
        TradingHours {
            open_hour: 9,
            close_hour: 15,
        }
    }
}

impl TradingHours {
    /// True while the scan loop may look for entries.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        is_weekday(at) && (self.open_hour..self.close_hour).contains(&at.hour())
    }

    /// Exchange-open check used for reporting. Counts the closing bell
    /// minute as open.
    pub fn is_market_open(&self, at: NaiveDateTime) -> bool {
        self.contains(at) || (is_weekday(at) && at.hour() == self.close_hour && at.minute() == 0)
    }
}

fn is_weekday(at: NaiveDateTime) -> bool {
    !matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}
