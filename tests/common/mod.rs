#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use daytrader::adapters::clock::ManualClock;
use daytrader::adapters::memory_sink::MemorySink;
use daytrader::domain::alert::PriceAlert;
use daytrader::domain::config::TradingConfig;
use daytrader::domain::error::TraderError;
use daytrader::domain::market::VolatilityContext;
pub use daytrader::domain::ohlcv::PriceBar;
use daytrader::domain::trade::{Fill, OrderStatus, TradeRecord, TradeSide};
use daytrader::ports::clock_port::Clock;
use daytrader::ports::execution_port::ExecutionPort;
use daytrader::ports::market_data_port::MarketDataPort;
use daytrader::ports::record_port::RecordSink;
use daytrader::session::SessionCore;

/// Monday 2024-03-04 at `hour:minute`.
pub fn monday(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let start = monday(9, 15);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: start + Duration::minutes(5 * i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        })
        .collect()
}

/// Rising sawtooth: +2.5 then -1.5 around a 0.5 per-bar drift. With an odd
/// `n` the last bar is an up bar and the default indicators cast five buy
/// votes and no sell votes.
pub fn uptrend_bars(n: usize) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + i as f64 * 0.5 + if i % 2 == 0 { 1.0 } else { -1.0 })
        .collect();
    bars_from_closes(&closes)
}

/// Mirror image of [`uptrend_bars`]: five sell votes, ending at 169 for n = 61.
pub fn downtrend_bars(n: usize) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| 200.0 - i as f64 * 0.5 - if i % 2 == 0 { 1.0 } else { -1.0 })
        .collect();
    bars_from_closes(&closes)
}

pub fn calm_market() -> VolatilityContext {
    VolatilityContext {
        index_change_percent: 0.2,
        volatility_index: 14.0,
        is_market_open: true,
    }
}

/// Market data served from fixed per-symbol bar lists.
#[derive(Default)]
pub struct ScriptedMarket {
    bars: Mutex<HashMap<String, Vec<PriceBar>>>,
    context: Mutex<Option<VolatilityContext>>,
    outage: Mutex<Option<String>>,
    bar_delay: Mutex<Option<std::time::Duration>>,
    bar_calls: AtomicUsize,
}

impl ScriptedMarket {
    pub fn new() -> Self {
        let market = Self::default();
        market.set_context(Some(calm_market()));
        market
    }

    pub fn with_bars(self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.set_bars(symbol, bars);
        self
    }

    pub fn set_bars(&self, symbol: &str, bars: Vec<PriceBar>) {
        self.bars.lock().unwrap().insert(symbol.to_string(), bars);
    }

    /// `None` makes every context fetch fail.
    pub fn set_context(&self, context: Option<VolatilityContext>) {
        *self.context.lock().unwrap() = context;
    }

    /// Fail every bar fetch with a database error.
    pub fn set_outage(&self, reason: Option<&str>) {
        *self.outage.lock().unwrap() = reason.map(str::to_string);
    }

    /// Make every bar fetch sleep this long before answering.
    pub fn set_bar_delay(&self, delay: Option<std::time::Duration>) {
        *self.bar_delay.lock().unwrap() = delay;
    }

    pub fn bar_calls(&self) -> usize {
        self.bar_calls.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for ScriptedMarket {
    async fn get_bars(
        &self,
        symbol: &str,
        _window: Duration,
        _interval: Duration,
    ) -> Result<Vec<PriceBar>, TraderError> {
        self.bar_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.bar_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.outage.lock().unwrap().clone() {
            return Err(TraderError::Database { reason });
        }
        match self.bars.lock().unwrap().get(symbol) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(TraderError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no bars".into(),
            }),
        }
    }

    async fn get_volatility_context(&self) -> Result<VolatilityContext, TraderError> {
        self.context.lock().unwrap().ok_or_else(|| TraderError::DataUnavailable {
            symbol: "INDEX".into(),
            reason: "feed down".into(),
        })
    }
}

/// Venue that fills at the scripted quote unless the symbol is rejected.
#[derive(Default)]
pub struct ScriptedVenue {
    quotes: Mutex<HashMap<String, f64>>,
    rejects: Mutex<HashSet<String>>,
    orders: Mutex<Vec<(String, TradeSide, u32)>>,
}

impl ScriptedVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(self, symbol: &str, price: f64) -> Self {
        self.set_quote(symbol, price);
        self
    }

    pub fn set_quote(&self, symbol: &str, price: f64) {
        self.quotes.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn reject(&self, symbol: &str) {
        self.rejects.lock().unwrap().insert(symbol.to_string());
    }

    pub fn orders(&self) -> Vec<(String, TradeSide, u32)> {
        self.orders.lock().unwrap().clone()
    }
}

impl ExecutionPort for ScriptedVenue {
    async fn place_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: u32,
    ) -> Result<Fill, TraderError> {
        self.orders
            .lock()
            .unwrap()
            .push((symbol.to_string(), side, quantity));
        if self.rejects.lock().unwrap().contains(symbol) {
            return Ok(Fill {
                status: OrderStatus::Failure,
                filled_price: 0.0,
                timestamp: monday(10, 0),
            });
        }
        let price = self.get_quote(symbol).await?;
        Ok(Fill {
            status: OrderStatus::Success,
            filled_price: price,
            timestamp: monday(10, 0),
        })
    }

    async fn get_quote(&self, symbol: &str) -> Result<f64, TraderError> {
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| TraderError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no quote".into(),
            })
    }
}

/// Sink whose every write fails.
pub struct FailingSink;

impl RecordSink for FailingSink {
    fn record_trade(&self, _record: &TradeRecord) -> Result<(), TraderError> {
        Err(TraderError::Database {
            reason: "disk full".into(),
        })
    }

    fn record_alert(&self, _alert: &PriceAlert) -> Result<(), TraderError> {
        Err(TraderError::Database {
            reason: "disk full".into(),
        })
    }
}

pub struct Harness {
    pub market: Arc<ScriptedMarket>,
    pub venue: Arc<ScriptedVenue>,
    pub sink: Arc<MemorySink>,
    pub clock: Arc<ManualClock>,
    pub core: SessionCore<ScriptedMarket, ScriptedVenue>,
}

pub fn harness(
    config: TradingConfig,
    market: ScriptedMarket,
    venue: ScriptedVenue,
    symbols: &[&str],
) -> Harness {
    let market = Arc::new(market);
    let venue = Arc::new(venue);
    let sink = Arc::new(MemorySink::new());
    let clock = Arc::new(ManualClock::new(monday(10, 30)));
    let core = SessionCore::new(
        config,
        Arc::clone(&market),
        Arc::clone(&venue),
        Arc::clone(&sink) as Arc<dyn RecordSink>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        symbols.iter().map(|s| s.to_string()).collect(),
        100_000.0,
    );
    Harness {
        market,
        venue,
        sink,
        clock,
        core,
    }
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
