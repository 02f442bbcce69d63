//! Per-bar indicator snapshots.
//!
//! [`compute_snapshots`] runs every indicator the scorer and the analysis
//! report need over one bar series and zips them into one record per bar.

use chrono::NaiveDateTime;

use crate::domain::indicator::supertrend::supertrend_at;
use crate::domain::indicator::{
    calculate_atr, calculate_bollinger, calculate_ema, calculate_macd, calculate_obv,
    calculate_rsi, calculate_sma, calculate_supertrend, calculate_volume_sma, IndicatorValue,
    Trend,
};
use crate::domain::ohlcv::PriceBar;

/// Indicator windows. Defaults match the conventional settings the scorer
/// was tuned against.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSettings {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub ema: usize,
    pub rsi: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr: usize,
    pub bollinger_period: usize,
    pub bollinger_stddev: f64,
    pub volume_sma: usize,
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        IndicatorSettings {
            sma_fast: 20,
            sma_slow: 50,
            ema: 9,
            rsi: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr: 14,
            bollinger_period: 5,
            bollinger_stddev: 2.0,
            volume_sma: 20,
            supertrend_period: 7,
            supertrend_multiplier: 3.0,
        }
    }
}

impl IndicatorSettings {
    /// Bars needed before every scored indicator is defined on the last bar.
    pub fn min_bars(&self) -> usize {
        let macd = self.macd_fast.max(self.macd_slow) + self.macd_signal - 1;
        [
            self.sma_fast,
            self.sma_slow,
            self.ema,
            self.rsi + 1,
            macd,
            self.bollinger_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Indicator values for one bar. `None` means the indicator is still in its
/// warmup window at this bar.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub volume: i64,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub ema: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub atr: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub obv: Option<f64>,
    pub volume_sma: Option<f64>,
    pub supertrend: Option<f64>,
    pub supertrend_trend: Option<Trend>,
}

pub fn compute_snapshots(bars: &[PriceBar], settings: &IndicatorSettings) -> Vec<IndicatorSnapshot> {
    let sma_fast = calculate_sma(bars, settings.sma_fast);
    let sma_slow = calculate_sma(bars, settings.sma_slow);
    let ema = calculate_ema(bars, settings.ema);
    let rsi = calculate_rsi(bars, settings.rsi);
    let macd = calculate_macd(
        bars,
        settings.macd_fast,
        settings.macd_slow,
        settings.macd_signal,
    );
    let atr = calculate_atr(bars, settings.atr);
    let bollinger = calculate_bollinger(
        bars,
        settings.bollinger_period,
        to_x100(settings.bollinger_stddev),
    );
    let obv = calculate_obv(bars);
    let volume_sma = calculate_volume_sma(bars, settings.volume_sma);
    let supertrend = calculate_supertrend(
        bars,
        settings.supertrend_period,
        to_x100(settings.supertrend_multiplier),
    );

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let (macd_line, macd_signal) = match &macd.values[i] {
                p if p.valid => match p.value {
                    IndicatorValue::Macd { line, signal, .. } => (Some(line), Some(signal)),
                    _ => (None, None),
                },
                _ => (None, None),
            };
            let (bb_upper, bb_middle, bb_lower) = match &bollinger.values[i] {
                p if p.valid => match p.value {
                    IndicatorValue::Bollinger {
                        upper,
                        middle,
                        lower,
                    } => (Some(upper), Some(middle), Some(lower)),
                    _ => (None, None, None),
                },
                _ => (None, None, None),
            };
            let trend = supertrend_at(&supertrend, i);

            IndicatorSnapshot {
                timestamp: bar.timestamp,
                close: bar.close,
                volume: bar.volume,
                sma_fast: sma_fast.simple_at(i),
                sma_slow: sma_slow.simple_at(i),
                ema: ema.simple_at(i),
                rsi: rsi.simple_at(i),
                macd: macd_line,
                macd_signal,
                atr: atr.simple_at(i),
                bb_upper,
                bb_middle,
                bb_lower,
                obv: obv.simple_at(i),
                volume_sma: volume_sma.simple_at(i),
                supertrend: trend.map(|(line, _)| line),
                supertrend_trend: trend.map(|(_, t)| t),
            }
        })
        .collect()
}

fn to_x100(value: f64) -> u32 {
    (value * 100.0).round().max(0.0) as u32
}
