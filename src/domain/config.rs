//! Typed trading configuration, built once from a [`ConfigPort`] and passed
//! by value into the session.

use std::time::Duration;

use crate::domain::config_validation::validate_all;
use crate::domain::error::TraderError;
use crate::domain::ledger::RiskLimits;
use crate::domain::market::TradingHours;
use crate::domain::risk::RiskGate;
use crate::domain::snapshot::IndicatorSettings;
use crate::ports::config_port::ConfigPort;

pub mod defaults {
    pub const MIN_SIGNAL_STRENGTH: f64 = 0.7;
    pub const SCAN_INTERVAL_SECS: i64 = 5;
    pub const WATCH_INTERVAL_SECS: i64 = 5;
    pub const ERROR_BACKOFF_SECS: i64 = 60;
    pub const MARKET_OPEN_HOUR: i64 = 9;
    pub const MARKET_CLOSE_HOUR: i64 = 15;
    pub const VOLATILITY_THRESHOLD: f64 = 25.0;
    pub const RISK_PER_TRADE: f64 = 0.02;
    pub const TRAILING_STOP_PERCENT: f64 = 0.02;
    pub const TARGET_PROFIT_PERCENT: f64 = 0.03;
    pub const BAR_WINDOW_DAYS: i64 = 60;
    pub const BAR_INTERVAL_MINUTES: i64 = 5;
    pub const MAX_DAILY_LOSS_PERCENT: f64 = 1.0;
    pub const MAX_POSITION_SIZE_PERCENT: f64 = 5.0;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub min_signal_strength: f64,
    pub scan_interval: Duration,
    pub watch_interval: Duration,
    pub error_backoff: Duration,
    pub hours: TradingHours,
    pub volatility_threshold: f64,
    pub risk_per_trade: f64,
    pub trailing_stop_percent: f64,
    pub target_profit_percent: f64,
    pub bar_window: chrono::Duration,
    pub bar_interval: chrono::Duration,
    pub limits: RiskLimits,
    pub indicators: IndicatorSettings,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            min_signal_strength: defaults::MIN_SIGNAL_STRENGTH,
            scan_interval: Duration::from_secs(defaults::SCAN_INTERVAL_SECS as u64),
            watch_interval: Duration::from_secs(defaults::WATCH_INTERVAL_SECS as u64),
            error_backoff: Duration::from_secs(defaults::ERROR_BACKOFF_SECS as u64),
            hours: TradingHours::default(),
            volatility_threshold: defaults::VOLATILITY_THRESHOLD,
            risk_per_trade: defaults::RISK_PER_TRADE,
            trailing_stop_percent: defaults::TRAILING_STOP_PERCENT,
            target_profit_percent: defaults::TARGET_PROFIT_PERCENT,
            bar_window: chrono::Duration::days(defaults::BAR_WINDOW_DAYS),
            bar_interval: chrono::Duration::minutes(defaults::BAR_INTERVAL_MINUTES),
            limits: RiskLimits::default(),
            indicators: IndicatorSettings::default(),
        }
    }
}

impl TradingConfig {
    /// Validate and read `[trading]`, `[risk]` and `[indicators]`. Absent
    /// keys take the defaults above.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        validate_all(config)?;

        let secs = |key: &str, default: i64| {
            Duration::from_secs(config.get_int("trading", key, default).max(1) as u64)
        };
        let ind = |key: &str, default: usize| {
            config.get_int("indicators", key, default as i64).max(1) as usize
        };
        let base = IndicatorSettings::default();

        Ok(TradingConfig {
            min_signal_strength: config.get_double(
                "trading",
                "min_signal_strength",
                defaults::MIN_SIGNAL_STRENGTH,
            ),
            scan_interval: secs("scan_interval_secs", defaults::SCAN_INTERVAL_SECS),
            watch_interval: secs("watch_interval_secs", defaults::WATCH_INTERVAL_SECS),
            error_backoff: secs("error_backoff_secs", defaults::ERROR_BACKOFF_SECS),
            hours: TradingHours {
                open_hour: config.get_int("trading", "market_open_hour", defaults::MARKET_OPEN_HOUR)
                    as u32,
                close_hour: config.get_int(
                    "trading",
                    "market_close_hour",
                    defaults::MARKET_CLOSE_HOUR,
                ) as u32,
            },
            volatility_threshold: config.get_double(
                "trading",
                "volatility_threshold",
                defaults::VOLATILITY_THRESHOLD,
            ),
            risk_per_trade: config.get_double("trading", "risk_per_trade", defaults::RISK_PER_TRADE),
            trailing_stop_percent: config.get_double(
                "trading",
                "trailing_stop_percent",
                defaults::TRAILING_STOP_PERCENT,
            ),
            target_profit_percent: config.get_double(
                "trading",
                "target_profit_percent",
                defaults::TARGET_PROFIT_PERCENT,
            ),
            bar_window: chrono::Duration::days(config.get_int(
                "trading",
                "bar_window_days",
                defaults::BAR_WINDOW_DAYS,
            )),
            bar_interval: chrono::Duration::minutes(config.get_int(
                "trading",
                "bar_interval_minutes",
                defaults::BAR_INTERVAL_MINUTES,
            )),
            limits: RiskLimits {
                max_daily_loss_percent: config.get_double(
                    "risk",
                    "max_daily_loss_percent",
                    defaults::MAX_DAILY_LOSS_PERCENT,
                ),
                max_position_size_percent: config.get_double(
                    "risk",
                    "max_position_size_percent",
                    defaults::MAX_POSITION_SIZE_PERCENT,
                ),
            },
            indicators: IndicatorSettings {
                sma_fast: ind("sma_fast", base.sma_fast),
                sma_slow: ind("sma_slow", base.sma_slow),
                ema: ind("ema", base.ema),
                rsi: ind("rsi", base.rsi),
                macd_fast: ind("macd_fast", base.macd_fast),
                macd_slow: ind("macd_slow", base.macd_slow),
                macd_signal: ind("macd_signal", base.macd_signal),
                atr: ind("atr", base.atr),
                bollinger_period: ind("bollinger_period", base.bollinger_period),
                bollinger_stddev: config.get_double(
                    "indicators",
                    "bollinger_stddev",
                    base.bollinger_stddev,
                ),
                volume_sma: ind("volume_sma", base.volume_sma),
                supertrend_period: ind("supertrend_period", base.supertrend_period),
                supertrend_multiplier: config.get_double(
                    "indicators",
                    "supertrend_multiplier",
                    base.supertrend_multiplier,
                ),
            },
        })
    }

    pub fn risk_gate(&self) -> RiskGate {
        RiskGate::new(self.risk_per_trade)
    }

    /// Initial stop and target for a long entry filled at `price`.
    pub fn entry_levels(&self, price: f64) -> (f64, f64) {
        (
            price * (1.0 - self.trailing_stop_percent),
            price * (1.0 + self.target_profit_percent),
        )
    }

    pub fn trailing_stop(&self, price: f64) -> f64 {
        price * (1.0 - self.trailing_stop_percent)
    }
}
