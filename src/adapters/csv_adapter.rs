//! CSV bar replay: market data read from one file per symbol.
//!
//! Bars live in `<bars_dir>/<SYMBOL>.csv` with a header row of
//! `timestamp,open,high,low,close,volume`. A request returns the bars in
//! the window ending at the injected clock's `now`, so a manually driven
//! clock replays a day bar by bar.

use chrono::{Duration, NaiveDateTime, Timelike};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::domain::error::TraderError;
use crate::domain::market::{TradingHours, VolatilityContext};
use crate::domain::ohlcv::PriceBar;
use crate::ports::clock_port::Clock;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvMarketData {
    base_path: PathBuf,
    clock: Arc<dyn Clock>,
    hours: TradingHours,
    index_change_percent: f64,
    volatility_index: f64,
    cache: Mutex<HashMap<String, Arc<Vec<PriceBar>>>>,
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf, clock: Arc<dyn Clock>, hours: TradingHours) -> Self {
        Self {
            base_path,
            clock,
            hours,
            index_change_percent: 0.0,
            volatility_index: 0.0,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Reads `[data] bars_dir`, `volatility_index` and `index_change_percent`.
    pub fn from_config(
        config: &dyn ConfigPort,
        clock: Arc<dyn Clock>,
        hours: TradingHours,
    ) -> Result<Self, TraderError> {
        let bars_dir =
            config
                .get_string("data", "bars_dir")
                .ok_or_else(|| TraderError::ConfigMissing {
                    section: "data".into(),
                    key: "bars_dir".into(),
                })?;

        Ok(Self::new(PathBuf::from(bars_dir), clock, hours).with_volatility(
            config.get_double("data", "index_change_percent", 0.0),
            config.get_double("data", "volatility_index", 0.0),
        ))
    }

    pub fn with_volatility(mut self, index_change_percent: f64, volatility_index: f64) -> Self {
        self.index_change_percent = index_change_percent;
        self.volatility_index = volatility_index;
        self
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn load(&self, symbol: &str) -> Result<Arc<Vec<PriceBar>>, TraderError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bars) = cache.get(symbol) {
            return Ok(Arc::clone(bars));
        }
        let bars = Arc::new(self.read_file(symbol)?);
        cache.insert(symbol.to_string(), Arc::clone(&bars));
        Ok(bars)
    }

    fn read_file(&self, symbol: &str) -> Result<Vec<PriceBar>, TraderError> {
        let unavailable = |reason: String| TraderError::DataUnavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| unavailable(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| unavailable(format!("CSV parse error: {}", e)))?;
            let row = line + 2;

            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .ok_or_else(|| unavailable(format!("row {row}: missing {name} column")))
            };
            let number = |idx: usize, name: &str| -> Result<f64, TraderError> {
                field(idx, name)?
                    .parse()
                    .map_err(|e| unavailable(format!("row {row}: invalid {name} value: {e}")))
            };

            let timestamp = parse_timestamp(field(0, "timestamp")?)
                .ok_or_else(|| unavailable(format!("row {row}: invalid timestamp")))?;
            let volume: i64 = field(5, "volume")?
                .parse::<f64>()
                .map(|v| v as i64)
                .map_err(|e| unavailable(format!("row {row}: invalid volume value: {e}")))?;

            bars.push(PriceBar {
                timestamp,
                open: number(1, "open")?,
                high: number(2, "high")?,
                low: number(3, "low")?,
                close: number(4, "close")?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    /// Most recent bar at or before the clock's `now`.
    pub fn latest_bar(&self, symbol: &str) -> Result<PriceBar, TraderError> {
        let now = self.clock.now();
        let bars = self.load(symbol)?;
        bars.iter()
            .rev()
            .find(|b| b.timestamp <= now)
            .cloned()
            .ok_or_else(|| TraderError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no bar at or before {now}"),
            })
    }

    /// Symbols with a bar file in the directory, sorted.
    pub fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path)?;
        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Aggregate finer bars into `interval` buckets aligned to the day's start.
/// Bars already at or coarser than `interval` pass through unchanged.
pub fn resample(bars: &[PriceBar], interval: Duration) -> Vec<PriceBar> {
    let step = interval.num_seconds();
    if step <= 0 {
        return bars.to_vec();
    }

    let bucket = |ts: NaiveDateTime| {
        let secs = ts.num_seconds_from_midnight() as i64;
        (ts.date(), secs - secs % step)
    };

    let mut out: Vec<PriceBar> = Vec::new();
    let mut current: Option<(chrono::NaiveDate, i64)> = None;
    for bar in bars {
        let key = bucket(bar.timestamp);
        match out.last_mut() {
            Some(last) if current == Some(key) => {
                last.high = last.high.max(bar.high);
                last.low = last.low.min(bar.low);
                last.close = bar.close;
                last.volume += bar.volume;
            }
            _ => {
                current = Some(key);
                out.push(bar.clone());
            }
        }
    }
    out
}

impl MarketDataPort for CsvMarketData {
    async fn get_bars(
        &self,
        symbol: &str,
        window: Duration,
        interval: Duration,
    ) -> Result<Vec<PriceBar>, TraderError> {
        let now = self.clock.now();
        let from = now - window;
        let bars = self.load(symbol)?;

        let in_window: Vec<PriceBar> = bars
            .iter()
            .filter(|b| b.timestamp > from && b.timestamp <= now)
            .cloned()
            .collect();

        if in_window.is_empty() {
            return Err(TraderError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no bars between {from} and {now}"),
            });
        }
        Ok(resample(&in_window, interval))
    }

    async fn get_volatility_context(&self) -> Result<VolatilityContext, TraderError> {
        Ok(VolatilityContext {
            index_change_percent: self.index_change_percent,
            volatility_index: self.volatility_index,
            is_market_open: self.hours.is_market_open(self.clock.now()),
        })
    }
}
