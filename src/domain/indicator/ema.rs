//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: ema_over(bars, period, |b| b.close),
    }
}

/// EMA of an arbitrary per-bar input. Shared with MACD, which smooths its
/// own line rather than closes.
pub(crate) fn ema_over(
    bars: &[PriceBar],
    period: usize,
    input: impl Fn(&PriceBar) -> f64,
) -> Vec<IndicatorPoint> {
    if period == 0 {
        return bars
            .iter()
            .map(|b| IndicatorPoint::warmup(b.timestamp, IndicatorValue::Simple(0.0)))
            .collect();
    }

    let mut values = Vec::with_capacity(bars.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let x = input(bar);
        if i < period - 1 {
            sum += x;
            values.push(IndicatorPoint::warmup(bar.timestamp, IndicatorValue::Simple(0.0)));
        } else if i == period - 1 {
            sum += x;
            ema = sum / period as f64;
            values.push(IndicatorPoint::ready(bar.timestamp, IndicatorValue::Simple(ema)));
        } else {
            ema = x * k + ema * (1.0 - k);
            values.push(IndicatorPoint::ready(bar.timestamp, IndicatorValue::Simple(ema)));
        }
    }

    values
}
