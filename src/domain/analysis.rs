//! Per-symbol analysis report: the latest signal plus the indicator values
//! an operator wants to see next to it.

use chrono::NaiveDateTime;
use std::fmt;

use super::error::TraderError;
use super::indicator::Trend;
use super::market::VolatilityContext;
use super::ohlcv::PriceBar;
use super::signal::{generate_signal, Signal};
use super::snapshot::{compute_snapshots, IndicatorSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub current_price: f64,
    pub signal: Signal,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub supertrend: Option<f64>,
    pub supertrend_trend: Option<Trend>,
    pub volume: i64,
    pub atr: Option<f64>,
    /// `None` when the market context could not be fetched.
    pub market: Option<VolatilityContext>,
}

impl Analysis {
    /// Run every indicator over `bars` and score the last bar.
    pub fn from_bars(
        symbol: &str,
        bars: &[PriceBar],
        settings: &IndicatorSettings,
        market: Option<VolatilityContext>,
    ) -> Result<Self, TraderError> {
        let snapshots = compute_snapshots(bars, settings);
        let insufficient = || TraderError::InsufficientHistory {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: settings.min_bars(),
        };
        let signal = generate_signal(&snapshots).ok_or_else(insufficient)?;
        let latest = snapshots.last().ok_or_else(insufficient)?;

        Ok(Analysis {
            symbol: symbol.to_string(),
            timestamp: latest.timestamp,
            current_price: latest.close,
            signal,
            rsi: latest.rsi,
            macd: latest.macd,
            supertrend: latest.supertrend,
            supertrend_trend: latest.supertrend_trend,
            volume: latest.volume,
            atr: latest.atr,
            market,
        })
    }
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} @ {}", self.symbol, self.timestamp)?;
        writeln!(f, "  price       {:.2}", self.current_price)?;
        writeln!(
            f,
            "  signal      {} strength {:.2} ({} buy / {} sell)",
            self.signal.direction,
            self.signal.strength,
            self.signal.buy_votes,
            self.signal.sell_votes
        )?;
        writeln!(f, "  rsi         {}", opt(self.rsi))?;
        writeln!(f, "  macd        {}", opt(self.macd))?;
        match self.supertrend_trend {
            Some(trend) => writeln!(f, "  supertrend  {} ({})", opt(self.supertrend), trend)?,
            None => writeln!(f, "  supertrend  n/a")?,
        }
        writeln!(f, "  atr         {}", opt(self.atr))?;
        writeln!(f, "  volume      {}", self.volume)?;
        match &self.market {
            Some(ctx) => write!(
                f,
                "  market      index {:+.2}% vix {:.2} {}",
                ctx.index_change_percent,
                ctx.volatility_index,
                if ctx.is_market_open { "open" } else { "closed" }
            ),
            None => write!(f, "  market      unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;

    fn rising(n: usize) -> Vec<PriceBar> {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + i as f64 + if i % 3 == 0 { -0.5 } else { 0.5 })
            .collect();
        from_closes(&closes)
    }

    #[test]
    fn reports_latest_bar() {
        let bars = rising(80);
        let ctx = VolatilityContext {
            index_change_percent: 0.3,
            volatility_index: 14.0,
            is_market_open: true,
        };
        let a = Analysis::from_bars("AAA", &bars, &IndicatorSettings::default(), Some(ctx))
            .unwrap();

        assert_eq!(a.symbol, "AAA");
        assert_eq!(a.timestamp, bars[79].timestamp);
        assert!((a.current_price - bars[79].close).abs() < f64::EPSILON);
        assert!(a.rsi.is_some());
        assert!(a.atr.is_some());
        assert_eq!(a.market, Some(ctx));
        assert!(a.to_string().contains("AAA"));
    }

    #[test]
    fn short_history_is_an_error() {
        let bars = rising(10);
        let err = Analysis::from_bars("AAA", &bars, &IndicatorSettings::default(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            TraderError::InsufficientHistory {
                bars: 10,
                minimum: 50,
                ..
            }
        ));
    }
}
