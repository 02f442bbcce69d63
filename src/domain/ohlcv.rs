//! Intraday price bar representation.

use chrono::NaiveDateTime;

/// One OHLCV sample over a fixed interval. Bars are immutable once fetched
/// and always handled as a chronological slice.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// (high + low) / 2, the Supertrend basis.
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Largest of the bar's range and either gap from `prev_close`.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        (self.high - self.low)
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::start;

    fn bar(high: f64, low: f64) -> PriceBar {
        PriceBar {
            timestamp: start(),
            open: low,
            high,
            low,
            close: high,
            volume: 12_500,
        }
    }

    #[test]
    fn midpoint_of_range() {
        assert_eq!(bar(1510.0, 1490.0).midpoint(), 1500.0);
    }

    #[test]
    fn true_range_picks_the_widest_span() {
        let b = bar(1510.0, 1490.0);
        assert_eq!(b.true_range(1500.0), 20.0);
        assert_eq!(b.true_range(1460.0), 50.0);
        assert_eq!(b.true_range(1545.0), 55.0);
    }
}
