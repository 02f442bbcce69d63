//! Supertrend: a sticky trend line built from ATR bands.
//!
//! basic_upper[i] = (H[i]+L[i])/2 + M·ATR(P)[i]
//! basic_lower[i] = (H[i]+L[i])/2 - M·ATR(P)[i]
//!
//! For i >= 1:
//! - C[i] > basic_upper[i-1] → line = basic_lower[i], trend up
//! - C[i] < basic_lower[i-1] → line = basic_upper[i], trend down
//! - otherwise the previous (line, trend) carries forward
//!
//! The line stays undefined until the first decisive breakout after the
//! ATR warmup. Bar 0 is always undefined.

use crate::domain::indicator::{
    calculate_atr, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Trend,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 7;
pub const DEFAULT_MULTIPLIER_X100: u32 = 300;

pub fn calculate_supertrend(
    bars: &[PriceBar],
    period: usize,
    multiplier_x100: u32,
) -> IndicatorSeries {
    let mult = multiplier_x100 as f64 / 100.0;
    let atr = calculate_atr(bars, period);

    let bands: Vec<Option<(f64, f64)>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            atr.simple_at(i)
                .map(|a| (bar.midpoint() + mult * a, bar.midpoint() - mult * a))
        })
        .collect();

    let states = bars
        .iter()
        .enumerate()
        .scan(None, |state: &mut Option<(f64, Trend)>, (i, bar)| {
            if i > 0 {
                *state = step(*state, bar.close, bands[i - 1], bands[i]);
            }
            Some(*state)
        });

    let values = bars
        .iter()
        .zip(states)
        .map(|(bar, state)| match state {
            Some((line, trend)) => {
                IndicatorPoint::ready(bar.timestamp, IndicatorValue::Supertrend { line, trend })
            }
            None => IndicatorPoint::warmup(
                bar.timestamp,
                IndicatorValue::Supertrend {
                    line: 0.0,
                    trend: Trend::Up,
                },
            ),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Supertrend {
            period,
            multiplier_x100,
        },
        values,
    }
}

/// One step of the recurrence. `prev_bands` and `bands` are (upper, lower).
fn step(
    state: Option<(f64, Trend)>,
    close: f64,
    prev_bands: Option<(f64, f64)>,
    bands: Option<(f64, f64)>,
) -> Option<(f64, Trend)> {
    match (prev_bands, bands) {
        (Some((prev_upper, _)), Some((_, lower))) if close > prev_upper => {
            Some((lower, Trend::Up))
        }
        (Some((_, prev_lower)), Some((upper, _))) if close < prev_lower => {
            Some((upper, Trend::Down))
        }
        _ => state,
    }
}

/// Line and trend at `index`, `None` while undefined.
pub fn supertrend_at(series: &IndicatorSeries, index: usize) -> Option<(f64, Trend)> {
    match series.values.get(index) {
        Some(IndicatorPoint {
            valid: true,
            value: IndicatorValue::Supertrend { line, trend },
            ..
        }) => Some((*line, *trend)),
        _ => None,
    }
}
