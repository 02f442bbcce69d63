//! Simple Moving Average over closes, and over volume.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: rolling_mean(bars, period, |b| b.close),
    }
}

/// Rolling mean of bar volume, used to tell a heavy bar from a quiet one.
pub fn calculate_volume_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type: IndicatorType::VolumeSma(period),
        values: rolling_mean(bars, period, |b| b.volume as f64),
    }
}

fn rolling_mean(bars: &[PriceBar], period: usize, field: impl Fn(&PriceBar) -> f64) -> Vec<IndicatorPoint> {
    let mut values = Vec::with_capacity(bars.len());
    if period == 0 {
        return bars
            .iter()
            .map(|b| IndicatorPoint::warmup(b.timestamp, IndicatorValue::Simple(0.0)))
            .collect();
    }

    let mut sum = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        sum += field(bar);
        if i >= period {
            sum -= field(&bars[i - period]);
        }

        if i + 1 < period {
            values.push(IndicatorPoint::warmup(bar.timestamp, IndicatorValue::Simple(0.0)));
        } else {
            values.push(IndicatorPoint::ready(
                bar.timestamp,
                IndicatorValue::Simple(sum / period as f64),
            ));
        }
    }

    values
}
