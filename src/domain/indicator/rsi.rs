//! Relative Strength Index with Wilder smoothing.
//!
//! The first `period` close-to-close changes seed the average gain and loss
//! as plain means; every later change folds in as
//! `avg = (avg * (period - 1) + change) / period`. Bar 0 has no change and
//! bars `0..period` are warmup. A window with gains but no losses reads 100;
//! a window with no movement at all reads 0.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain + avg_loss == 0.0 {
        0.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let n = period as f64;
    let (mut gain_sum, mut loss_sum) = (0.0, 0.0);
    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i == 0 {
            values.push(IndicatorPoint::warmup(bar.timestamp, IndicatorValue::Simple(0.0)));
            continue;
        }

        let change = bar.close - bars[i - 1].close;
        let (gain, loss) = (change.max(0.0), (-change).max(0.0));

        if i < period {
            gain_sum += gain;
            loss_sum += loss;
            values.push(IndicatorPoint::warmup(bar.timestamp, IndicatorValue::Simple(0.0)));
            continue;
        }

        if i == period {
            avg_gain = (gain_sum + gain) / n;
            avg_loss = (loss_sum + loss) / n;
        } else {
            avg_gain = (avg_gain * (n - 1.0) + gain) / n;
            avg_loss = (avg_loss * (n - 1.0) + loss) / n;
        }
        values.push(IndicatorPoint::ready(
            bar.timestamp,
            IndicatorValue::Simple(rsi_from(avg_gain, avg_loss)),
        ));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
