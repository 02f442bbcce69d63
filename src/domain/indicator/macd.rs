//! MACD: the fast-minus-slow EMA spread of closes, its signal EMA and the
//! histogram between them.
//!
//! The signal EMA is seeded from the mean of the first `signal` defined
//! line values, so a point is ready from bar `max(fast, slow) + signal - 2`.

use crate::domain::indicator::ema::ema_over;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: bars
                .iter()
                .map(|b| IndicatorPoint::warmup(b.timestamp, empty_macd()))
                .collect(),
        };
    }

    let ema_fast = raw_values(ema_over(bars, fast, |b| b.close));
    let ema_slow = raw_values(ema_over(bars, slow, |b| b.close));
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();

    let macd_warmup = fast.max(slow) - 1;
    let k = 2.0 / (signal_period as f64 + 1.0);
    let mut signal_line: Vec<f64> = vec![0.0; bars.len()];

    if macd_warmup + signal_period <= bars.len() {
        let seed_end = macd_warmup + signal_period;
        let mut signal_ema =
            macd_line[macd_warmup..seed_end].iter().sum::<f64>() / signal_period as f64;
        signal_line[seed_end - 1] = signal_ema;

        for i in seed_end..bars.len() {
            signal_ema = macd_line[i] * k + signal_ema * (1.0 - k);
            signal_line[i] = signal_ema;
        }
    }

    let signal_warmup = macd_warmup + signal_period - 1;

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let value = IndicatorValue::Macd {
                line: macd_line[i],
                signal: signal_line[i],
                histogram: macd_line[i] - signal_line[i],
            };
            if i >= signal_warmup {
                IndicatorPoint::ready(bar.timestamp, value)
            } else {
                IndicatorPoint::warmup(bar.timestamp, value)
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn empty_macd() -> IndicatorValue {
    IndicatorValue::Macd {
        line: 0.0,
        signal: 0.0,
        histogram: 0.0,
    }
}

/// Warmup points contribute 0.0; they are never read past the warmup cut.
fn raw_values(points: Vec<IndicatorPoint>) -> Vec<f64> {
    points
        .into_iter()
        .map(|p| match p.value {
            IndicatorValue::Simple(v) => v,
            _ => 0.0,
        })
        .collect()
}
