//! Bollinger Bands: an SMA of closes with an envelope of `mult` population
//! standard deviations either side. The first `period - 1` bars are warmup.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

const UNSET: IndicatorValue = IndicatorValue::Bollinger {
    upper: 0.0,
    middle: 0.0,
    lower: 0.0,
};

/// Mean and population standard deviation of `closes`.
fn mean_stddev(closes: impl Iterator<Item = f64> + Clone, n: usize) -> (f64, f64) {
    let mean = closes.clone().sum::<f64>() / n as f64;
    let var = closes.map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

pub fn calculate_bollinger(
    bars: &[PriceBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mult = f64::from(stddev_mult_x100) / 100.0;

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if period == 0 || i + 1 < period {
                return IndicatorPoint::warmup(bar.timestamp, UNSET);
            }
            let window = &bars[i + 1 - period..=i];
            let (middle, sd) = mean_stddev(window.iter().map(|b| b.close), period);
            IndicatorPoint::ready(
                bar.timestamp,
                IndicatorValue::Bollinger {
                    upper: middle + mult * sd,
                    middle,
                    lower: middle - mult * sd,
                },
            )
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}
