//! On-Balance Volume: a running total that adds a bar's volume on an up
//! close, subtracts it on a down close and carries on an unchanged close.
//! The first bar opens the total at its own volume. No warmup.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_obv(bars: &[PriceBar]) -> IndicatorSeries {
    let mut total = 0.0;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let volume = bar.volume as f64;
            total = match i.checked_sub(1).map(|p| bars[p].close) {
                None => volume,
                Some(prev) if bar.close > prev => total + volume,
                Some(prev) if bar.close < prev => total - volume,
                Some(_) => total,
            };
            IndicatorPoint::ready(bar.timestamp, IndicatorValue::Simple(total))
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}
