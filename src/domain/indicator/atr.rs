//! Average True Range with Wilder smoothing.
//!
//! TR[i] = max(H[i]-L[i], |H[i]-C[i-1]|, |L[i]-C[i-1]|) for i >= 1
//! Seed: ATR[n] = mean(TR[1..=n]); then ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n
//! Warmup: first n bars are invalid (the first bar has no previous close).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    if period == 0 || bars.len() <= period {
        values.extend(
            bars.iter()
                .map(|b| IndicatorPoint::warmup(b.timestamp, IndicatorValue::Simple(0.0))),
        );
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values,
        };
    }

    let mut atr = 0.0;
    let mut tr_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            values.push(IndicatorPoint::warmup(bar.timestamp, IndicatorValue::Simple(0.0)));
            continue;
        }

        let tr = bar.true_range(bars[i - 1].close);
        if i < period {
            tr_sum += tr;
            values.push(IndicatorPoint::warmup(bar.timestamp, IndicatorValue::Simple(0.0)));
        } else if i == period {
            atr = (tr_sum + tr) / period as f64;
            values.push(IndicatorPoint::ready(bar.timestamp, IndicatorValue::Simple(atr)));
        } else {
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
            values.push(IndicatorPoint::ready(bar.timestamp, IndicatorValue::Simple(atr)));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
