//! Configuration validation.
//!
//! Rejects nonsensical settings before a session starts. Missing keys are
//! fine here; [`crate::domain::config::TradingConfig`] fills in defaults.

use crate::domain::config::defaults;
use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_signal_strength(config)?;
    validate_intervals(config)?;
    validate_market_hours(config)?;
    validate_fractions(config)?;
    validate_volatility_threshold(config)?;
    validate_bar_window(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_percent(config, "risk", "max_daily_loss_percent", defaults::MAX_DAILY_LOSS_PERCENT)?;
    validate_percent(
        config,
        "risk",
        "max_position_size_percent",
        defaults::MAX_POSITION_SIZE_PERCENT,
    )?;
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    for (key, default) in [
        ("sma_fast", 20),
        ("sma_slow", 50),
        ("ema", 9),
        ("rsi", 14),
        ("macd_fast", 12),
        ("macd_slow", 26),
        ("macd_signal", 9),
        ("atr", 14),
        ("bollinger_period", 5),
        ("volume_sma", 20),
        ("supertrend_period", 7),
    ] {
        if config.get_int("indicators", key, default) <= 0 {
            return Err(invalid("indicators", key, format!("{key} must be positive")));
        }
    }

    let fast = config.get_int("indicators", "macd_fast", 12);
    let slow = config.get_int("indicators", "macd_slow", 26);
    if fast >= slow {
        return Err(invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be less than macd_slow".to_string(),
        ));
    }

    for (key, default) in [("bollinger_stddev", 2.0), ("supertrend_multiplier", 3.0)] {
        if config.get_double("indicators", key, default) <= 0.0 {
            return Err(invalid("indicators", key, format!("{key} must be positive")));
        }
    }
    Ok(())
}

/// Every section the trading session reads.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_trading_config(config)?;
    validate_risk_config(config)?;
    validate_indicator_config(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: String) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn validate_signal_strength(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_double("trading", "min_signal_strength", defaults::MIN_SIGNAL_STRENGTH);
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(
            "trading",
            "min_signal_strength",
            "min_signal_strength must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_intervals(config: &dyn ConfigPort) -> Result<(), TraderError> {
    for (key, default) in [
        ("scan_interval_secs", defaults::SCAN_INTERVAL_SECS),
        ("watch_interval_secs", defaults::WATCH_INTERVAL_SECS),
        ("error_backoff_secs", defaults::ERROR_BACKOFF_SECS),
    ] {
        if config.get_int("trading", key, default) <= 0 {
            return Err(invalid("trading", key, format!("{key} must be positive")));
        }
    }
    Ok(())
}

fn validate_market_hours(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let open = config.get_int("trading", "market_open_hour", defaults::MARKET_OPEN_HOUR);
    let close = config.get_int("trading", "market_close_hour", defaults::MARKET_CLOSE_HOUR);
    for (key, hour) in [("market_open_hour", open), ("market_close_hour", close)] {
        if !(0..=23).contains(&hour) {
            return Err(invalid("trading", key, format!("{key} must be between 0 and 23")));
        }
    }
    if open >= close {
        return Err(invalid(
            "trading",
            "market_open_hour",
            "market_open_hour must be before market_close_hour".to_string(),
        ));
    }
    Ok(())
}

fn validate_fractions(config: &dyn ConfigPort) -> Result<(), TraderError> {
    for (key, default) in [
        ("risk_per_trade", defaults::RISK_PER_TRADE),
        ("trailing_stop_percent", defaults::TRAILING_STOP_PERCENT),
        ("target_profit_percent", defaults::TARGET_PROFIT_PERCENT),
    ] {
        let value = config.get_double("trading", key, default);
        if value <= 0.0 || value >= 1.0 {
            return Err(invalid(
                "trading",
                key,
                format!("{key} must be a fraction between 0 and 1"),
            ));
        }
    }
    Ok(())
}

fn validate_volatility_threshold(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_double(
        "trading",
        "volatility_threshold",
        defaults::VOLATILITY_THRESHOLD,
    );
    if value <= 0.0 {
        return Err(invalid(
            "trading",
            "volatility_threshold",
            "volatility_threshold must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_bar_window(config: &dyn ConfigPort) -> Result<(), TraderError> {
    for (key, default) in [
        ("bar_window_days", defaults::BAR_WINDOW_DAYS),
        ("bar_interval_minutes", defaults::BAR_INTERVAL_MINUTES),
    ] {
        if config.get_int("trading", key, default) <= 0 {
            return Err(invalid("trading", key, format!("{key} must be positive")));
        }
    }
    Ok(())
}

fn validate_percent(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), TraderError> {
    let value = config.get_double(section, key, default);
    if value <= 0.0 || value > 100.0 {
        return Err(invalid(
            section,
            key,
            format!("{key} must be between 0 and 100"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(result: Result<(), TraderError>) -> String {
        match result {
            Err(TraderError::ConfigInvalid { key, .. }) => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_uses_valid_defaults() {
        assert!(validate_all(&config("[trading]\n")).is_ok());
    }

    #[test]
    fn strength_above_one_rejected() {
        let c = config("[trading]\nmin_signal_strength = 1.5\n");
        assert_eq!(invalid_key(validate_trading_config(&c)), "min_signal_strength");
    }

    #[test]
    fn zero_interval_rejected() {
        let c = config("[trading]\nwatch_interval_secs = 0\n");
        assert_eq!(invalid_key(validate_trading_config(&c)), "watch_interval_secs");
    }

    #[test]
    fn open_after_close_rejected() {
        let c = config("[trading]\nmarket_open_hour = 16\nmarket_close_hour = 15\n");
        assert_eq!(invalid_key(validate_trading_config(&c)), "market_open_hour");
    }

    #[test]
    fn hour_out_of_range_rejected() {
        let c = config("[trading]\nmarket_close_hour = 24\n");
        assert_eq!(invalid_key(validate_trading_config(&c)), "market_close_hour");
    }

    #[test]
    fn fraction_out_of_range_rejected() {
        let c = config("[trading]\nrisk_per_trade = 2\n");
        assert_eq!(invalid_key(validate_trading_config(&c)), "risk_per_trade");
    }

    #[test]
    fn percent_limits_checked() {
        let c = config("[risk]\nmax_daily_loss_percent = 0\n");
        assert_eq!(invalid_key(validate_risk_config(&c)), "max_daily_loss_percent");

        let c = config("[risk]\nmax_position_size_percent = 150\n");
        assert_eq!(invalid_key(validate_risk_config(&c)), "max_position_size_percent");
    }

    #[test]
    fn macd_fast_must_be_faster() {
        let c = config("[indicators]\nmacd_fast = 26\nmacd_slow = 12\n");
        assert_eq!(invalid_key(validate_indicator_config(&c)), "macd_fast");
    }

    #[test]
    fn zero_period_rejected() {
        let c = config("[indicators]\nrsi = 0\n");
        assert_eq!(invalid_key(validate_indicator_config(&c)), "rsi");
    }

    #[test]
    fn negative_multiplier_rejected() {
        let c = config("[indicators]\nsupertrend_multiplier = -1\n");
        assert_eq!(
            invalid_key(validate_indicator_config(&c)),
            "supertrend_multiplier"
        );
    }
}
