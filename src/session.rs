//! The trading loop.
//!
//! A running session owns two periodic duties on the tokio runtime:
//!
//! - the **scan** duty, which during market hours scores every watched
//!   symbol and opens or closes positions on strong signals;
//! - the **watch** duty, which trails stops on open positions and forces an
//!   exit when a stop or target is hit.
//!
//! Both share one [`SessionCore`]. Ledger state sits behind a plain mutex
//! that is only taken around in-memory transitions; every venue and data
//! call happens with the lock released. At most one order per symbol is in
//! flight at a time, so the two duties cannot race each other into a double
//! exit.
//!
//! Stopping halts the core first. A duty waiting on market data or a quote
//! gives up at once with [`TraderError::Cancelled`]; an order already sent
//! to the venue is allowed to finish and reach the ledger before the duty
//! exits.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::analysis::Analysis;
use crate::domain::config::TradingConfig;
use crate::domain::error::{TraderError, ValidationFailure};
use crate::domain::ledger::PositionLedger;
use crate::domain::ohlcv::PriceBar;
use crate::domain::position::Position;
use crate::domain::risk::{self, RiskGate};
use crate::domain::signal::{generate_signal, Direction, Signal};
use crate::domain::snapshot::compute_snapshots;
use crate::domain::trade::{Fill, TradeRecord, TradeSide};
use crate::ports::clock_port::Clock;
use crate::ports::execution_port::ExecutionPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::record_port::RecordSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    Volatility { volatility_index: f64 },
    ZeroQuantity,
}

/// What one scan of one symbol decided.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Skipped(SkipReason),
    Held(Signal),
    Bought(Fill),
    Sold(Fill),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    Target,
}

/// What one watch of one position did.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    Held { price: f64, stop_raised: bool },
    Exited { reason: ExitReason, fill: Fill },
    Gone,
}

#[derive(Debug)]
pub struct CloseOutcome {
    pub symbol: String,
    pub result: Result<Fill, TraderError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionsView {
    pub positions: Vec<Position>,
    pub unrealized_pnl: f64,
}

/// Score the last bar of `bars`, or report why it cannot be scored.
pub fn evaluate(
    symbol: &str,
    bars: &[PriceBar],
    config: &TradingConfig,
) -> Result<Signal, TraderError> {
    let snapshots = compute_snapshots(bars, &config.indicators);
    generate_signal(&snapshots).ok_or_else(|| TraderError::InsufficientHistory {
        symbol: symbol.to_string(),
        bars: bars.len(),
        minimum: config.indicators.min_bars(),
    })
}

/// Build the analysis report for `symbol` from live collaborators. A failed
/// market-context fetch leaves the context empty rather than failing.
pub async fn analyze<M: MarketDataPort>(
    market: &M,
    config: &TradingConfig,
    symbol: &str,
) -> Result<Analysis, TraderError> {
    let bars = market
        .get_bars(symbol, config.bar_window, config.bar_interval)
        .await?;
    let context = match market.get_volatility_context().await {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            tracing::warn!(symbol, error = %e, "market context unavailable");
            None
        }
    };
    Analysis::from_bars(symbol, &bars, &config.indicators, context)
}

/// Resolves once the halt flag is raised.
async fn halted(mut flag: watch::Receiver<bool>) {
    while !*flag.borrow_and_update() {
        if flag.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Releases a symbol's in-flight claim when dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    symbol: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.symbol);
    }
}

/// Shared state and per-cycle logic for one running session.
pub struct SessionCore<M, E> {
    config: TradingConfig,
    market: Arc<M>,
    venue: Arc<E>,
    sink: Arc<dyn RecordSink>,
    clock: Arc<dyn Clock>,
    gate: RiskGate,
    symbols: Vec<String>,
    portfolio_value: f64,
    ledger: Mutex<PositionLedger>,
    in_flight: Mutex<HashSet<String>>,
    halt: watch::Sender<bool>,
}

impl<M: MarketDataPort, E: ExecutionPort> SessionCore<M, E> {
    pub fn new(
        config: TradingConfig,
        market: Arc<M>,
        venue: Arc<E>,
        sink: Arc<dyn RecordSink>,
        clock: Arc<dyn Clock>,
        symbols: Vec<String>,
        portfolio_value: f64,
    ) -> Self {
        let ledger = PositionLedger::new(config.limits, Arc::clone(&clock));
        SessionCore {
            gate: config.risk_gate(),
            config,
            market,
            venue,
            sink,
            clock,
            symbols,
            portfolio_value,
            ledger: Mutex::new(ledger),
            in_flight: Mutex::new(HashSet::new()),
            halt: watch::channel(false).0,
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn portfolio_value(&self) -> f64 {
        self.portfolio_value
    }

    /// Lock the ledger. Callers must drop the guard before awaiting.
    pub fn ledger(&self) -> MutexGuard<'_, PositionLedger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn positions(&self) -> PositionsView {
        let ledger = self.ledger();
        PositionsView {
            positions: ledger.positions(),
            unrealized_pnl: ledger.unrealized_pnl(),
        }
    }

    /// Make running and future cycles stop at their next data fetch or
    /// symbol boundary. Manual trades and [`close_all`](Self::close_all)
    /// are unaffected.
    pub fn halt(&self) {
        self.halt.send_replace(true);
    }

    pub fn is_halted(&self) -> bool {
        *self.halt.borrow()
    }

    /// Race `work` against the halt flag.
    async fn interruptible<T>(
        &self,
        work: impl Future<Output = Result<T, TraderError>>,
    ) -> Result<T, TraderError> {
        tokio::select! {
            biased;
            _ = halted(self.halt.subscribe()) => Err(TraderError::Cancelled),
            result = work => result,
        }
    }

    fn claim(&self, symbol: &str) -> Option<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(symbol.to_string()) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            symbol: symbol.to_string(),
        })
    }

    /// Hand records to the sink on the blocking pool; sink writes may hit
    /// disk.
    async fn publish(&self, records: Vec<TradeRecord>) {
        if records.is_empty() {
            return;
        }
        let sink = Arc::clone(&self.sink);
        let written = tokio::task::spawn_blocking(move || {
            for record in &records {
                if let Err(e) = sink.record_trade(record) {
                    tracing::warn!(symbol = %record.symbol, side = %record.side, error = %e, "failed to record trade");
                }
            }
        })
        .await;
        if let Err(e) = written {
            tracing::warn!(error = %e, "trade recording task failed");
        }
    }

    /// Validate, risk-check and place one market order, then apply the fill
    /// to the ledger. BUY fills open a position with its initial stop and
    /// target; SELL fills reduce or close it.
    pub async fn execute_trade(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
    ) -> Result<Fill, TraderError> {
        self.trade(symbol, side, quantity, false).await
    }

    /// With `cancellable`, a halt during the quote fetch abandons the trade.
    /// Once the order is sent it always runs through to the ledger.
    async fn trade(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
        cancellable: bool,
    ) -> Result<Fill, TraderError> {
        let Some(_claim) = self.claim(symbol) else {
            return Err(TraderError::ExecutionFailure {
                symbol: symbol.to_string(),
                reason: "another order is already in flight".to_string(),
            });
        };

        let quantity = {
            let ledger = self.ledger();
            let quantity = risk::validate(&ledger, symbol, side, quantity)?;
            if side == TradeSide::Buy && ledger.has_position(symbol) {
                return Err(TraderError::validation(
                    symbol,
                    ValidationFailure::PositionExists,
                ));
            }
            quantity
        };

        let price = if cancellable {
            self.interruptible(self.venue.get_quote(symbol)).await?
        } else {
            self.venue.get_quote(symbol).await?
        };

        if side == TradeSide::Buy {
            let mut ledger = self.ledger();
            self.gate
                .check(&mut ledger, symbol, quantity, price, self.portfolio_value)?;
        }

        let fill = self.venue.place_order(symbol, side, quantity).await?;
        if !fill.is_success() {
            tracing::warn!(symbol, %side, quantity, "order rejected by venue");
            return Err(TraderError::ExecutionFailure {
                symbol: symbol.to_string(),
                reason: format!("{side} order for {quantity} rejected"),
            });
        }

        let records = {
            let mut ledger = self.ledger();
            match side {
                TradeSide::Buy => {
                    let (stop, target) = self.config.entry_levels(fill.filled_price);
                    ledger.open(symbol, fill.filled_price, quantity, Some(stop), Some(target))?;
                }
                TradeSide::Sell => {
                    ledger.reduce(symbol, quantity, fill.filled_price);
                }
            }
            ledger.drain_records()
        };
        self.publish(records).await;

        tracing::info!(symbol, %side, quantity, price = fill.filled_price, "trade executed");
        Ok(fill)
    }

    /// One pass of the scan duty over every watched symbol. Per-symbol
    /// failures are logged and skipped; anything else aborts the cycle.
    pub async fn scan_cycle(&self) -> Result<Vec<(String, ScanOutcome)>, TraderError> {
        if !self.config.hours.contains(self.clock.now()) {
            tracing::debug!("outside market hours, scan skipped");
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            if self.is_halted() {
                return Err(TraderError::Cancelled);
            }
            match self.scan_symbol(symbol).await {
                Ok(outcome) => outcomes.push((symbol.clone(), outcome)),
                Err(e) if e.is_per_symbol() => {
                    tracing::warn!(symbol = %symbol, error = %e, "symbol skipped this cycle");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }

    pub async fn scan_symbol(&self, symbol: &str) -> Result<ScanOutcome, TraderError> {
        let context = self
            .interruptible(self.market.get_volatility_context())
            .await
            .map_err(|e| match e {
                TraderError::Cancelled => e,
                e => TraderError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("volatility context: {e}"),
                },
            })?;
        if context.is_elevated(self.config.volatility_threshold) {
            tracing::info!(
                symbol,
                volatility_index = context.volatility_index,
                threshold = self.config.volatility_threshold,
                "volatility too high, skipping"
            );
            return Ok(ScanOutcome::Skipped(SkipReason::Volatility {
                volatility_index: context.volatility_index,
            }));
        }

        let bars = self
            .interruptible(self.market.get_bars(
                symbol,
                self.config.bar_window,
                self.config.bar_interval,
            ))
            .await?;
        let signal = evaluate(symbol, &bars, &self.config)?;
        let last_close = bars.last().map_or(0.0, |b| b.close);

        tracing::debug!(
            symbol,
            direction = %signal.direction,
            strength = signal.strength,
            buy_votes = signal.buy_votes,
            sell_votes = signal.sell_votes,
            "signal"
        );

        let held = self.ledger().position(symbol).map(|p| p.quantity);
        let outcome = if signal.strength < self.config.min_signal_strength {
            ScanOutcome::Held(signal)
        } else {
            match (signal.direction, held) {
                (Direction::Buy, None) => {
                    let quantity = self.gate.entry_quantity(
                        &self.ledger(),
                        self.portfolio_value,
                        last_close,
                    );
                    if quantity == 0 {
                        tracing::info!(symbol, price = last_close, "position size is zero, skipping");
                        ScanOutcome::Skipped(SkipReason::ZeroQuantity)
                    } else {
                        let fill = self
                            .trade(symbol, TradeSide::Buy, quantity as i64, true)
                            .await?;
                        ScanOutcome::Bought(fill)
                    }
                }
                (Direction::Sell, Some(quantity)) => {
                    let fill = self
                        .trade(symbol, TradeSide::Sell, quantity as i64, true)
                        .await?;
                    ScanOutcome::Sold(fill)
                }
                _ => ScanOutcome::Held(signal),
            }
        };

        if self.ledger().has_position(symbol) {
            let price = self.interruptible(self.venue.get_quote(symbol)).await?;
            self.ledger()
                .update_marks(&HashMap::from([(symbol.to_string(), price)]));
        }
        Ok(outcome)
    }

    /// One pass of the watch duty over every open position.
    pub async fn watch_cycle(&self) -> Result<Vec<(String, WatchOutcome)>, TraderError> {
        let held = self.ledger().positions();
        let mut outcomes = Vec::with_capacity(held.len());
        for position in held {
            if self.is_halted() {
                return Err(TraderError::Cancelled);
            }
            match self.watch_position(&position.symbol).await {
                Ok(outcome) => outcomes.push((position.symbol, outcome)),
                Err(e) if e.is_per_symbol() => {
                    tracing::warn!(symbol = %position.symbol, error = %e, "watch failed for symbol");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }

    pub async fn watch_position(&self, symbol: &str) -> Result<WatchOutcome, TraderError> {
        let price = self.interruptible(self.venue.get_quote(symbol)).await?;

        let (position, stop_raised) = {
            let mut ledger = self.ledger();
            let Some(entry_price) = ledger.position(symbol).map(|p| p.entry_price) else {
                return Ok(WatchOutcome::Gone);
            };
            let stop_raised = price > entry_price
                && ledger.update_stop_loss(symbol, self.config.trailing_stop(price));
            ledger.update_marks(&HashMap::from([(symbol.to_string(), price)]));
            match ledger.position(symbol) {
                Some(p) => (p.clone(), stop_raised),
                None => return Ok(WatchOutcome::Gone),
            }
        };

        if stop_raised {
            tracing::info!(symbol, price, stop = ?position.stop_loss, "trailing stop raised");
        }

        let reason = if position.should_stop_loss(price) {
            Some(ExitReason::StopLoss)
        } else if position.should_take_profit(price) {
            Some(ExitReason::Target)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                tracing::info!(symbol, price, ?reason, "exit triggered");
                let fill = self
                    .trade(symbol, TradeSide::Sell, position.quantity as i64, true)
                    .await?;
                Ok(WatchOutcome::Exited { reason, fill })
            }
            None => Ok(WatchOutcome::Held { price, stop_raised }),
        }
    }

    /// Best-effort market exit of every open position.
    pub async fn close_all(&self) -> Vec<CloseOutcome> {
        let held = self.ledger().positions();
        let mut outcomes = Vec::with_capacity(held.len());
        for position in held {
            let result = self
                .execute_trade(&position.symbol, TradeSide::Sell, position.quantity as i64)
                .await;
            if let Err(e) = &result {
                tracing::error!(symbol = %position.symbol, error = %e, "failed to close position");
            }
            outcomes.push(CloseOutcome {
                symbol: position.symbol,
                result,
            });
        }
        tracing::info!(closed = outcomes.iter().filter(|o| o.result.is_ok()).count(), "close-all finished");
        outcomes
    }
}

#[derive(Debug, Clone, Copy)]
enum Duty {
    Scan,
    Watch,
}

impl fmt::Display for Duty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duty::Scan => write!(f, "scan"),
            Duty::Watch => write!(f, "watch"),
        }
    }
}

async fn run_duty<M, E>(
    core: Arc<SessionCore<M, E>>,
    duty: Duty,
    period: Duration,
    backoff: Duration,
    mut shutdown: broadcast::Receiver<()>,
) where
    M: MarketDataPort,
    E: ExecutionPort,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(%duty, period_secs = period.as_secs_f64(), "duty started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {}
        }

        let result = match duty {
            Duty::Scan => core.scan_cycle().await.map(|o| o.len()),
            Duty::Watch => core.watch_cycle().await.map(|o| o.len()),
        };

        match result {
            Ok(_) => {}
            Err(TraderError::Cancelled) => break,
            Err(e) => {
                tracing::error!(%duty, error = %e, backoff_secs = backoff.as_secs(), "cycle failed, backing off");
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                ticker.reset();
            }
        }
    }
    tracing::info!(%duty, "duty stopped");
}

struct Control<M, E> {
    state: SessionState,
    core: Option<Arc<SessionCore<M, E>>>,
    shutdown: Option<broadcast::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Session control surface: start, stop and queries.
pub struct TradingSession<M, E> {
    config: TradingConfig,
    market: Arc<M>,
    venue: Arc<E>,
    sink: Arc<dyn RecordSink>,
    clock: Arc<dyn Clock>,
    control: Mutex<Control<M, E>>,
}

impl<M, E> TradingSession<M, E>
where
    M: MarketDataPort + 'static,
    E: ExecutionPort + 'static,
{
    pub fn new(
        config: TradingConfig,
        market: Arc<M>,
        venue: Arc<E>,
        sink: Arc<dyn RecordSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        TradingSession {
            config,
            market,
            venue,
            sink,
            clock,
            control: Mutex::new(Control {
                state: SessionState::Stopped,
                core: None,
                shutdown: None,
                tasks: Vec::new(),
            }),
        }
    }

    fn control(&self) -> MutexGuard<'_, Control<M, E>> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.control().state
    }

    /// Core of the current or most recent session.
    pub fn core(&self) -> Option<Arc<SessionCore<M, E>>> {
        self.control().core.clone()
    }

    /// Begin trading `symbols` against a fixed `portfolio_value`. Must be
    /// called inside a tokio runtime.
    pub fn start(&self, symbols: Vec<String>, portfolio_value: f64) -> Result<(), TraderError> {
        let session_err = |reason: &str| TraderError::Session {
            reason: reason.to_string(),
        };
        if symbols.is_empty() {
            return Err(session_err("no symbols to trade"));
        }
        if !(portfolio_value > 0.0 && portfolio_value.is_finite()) {
            return Err(session_err("portfolio value must be positive"));
        }

        let mut control = self.control();
        if control.state != SessionState::Stopped {
            return Err(TraderError::Session {
                reason: format!("cannot start while {}", control.state),
            });
        }

        let core = Arc::new(SessionCore::new(
            self.config.clone(),
            Arc::clone(&self.market),
            Arc::clone(&self.venue),
            Arc::clone(&self.sink),
            Arc::clone(&self.clock),
            symbols,
            portfolio_value,
        ));
        let (shutdown, _) = broadcast::channel(1);

        control.tasks = [
            (Duty::Scan, self.config.scan_interval),
            (Duty::Watch, self.config.watch_interval),
        ]
        .into_iter()
        .map(|(duty, period)| {
            tokio::spawn(run_duty(
                Arc::clone(&core),
                duty,
                period,
                self.config.error_backoff,
                shutdown.subscribe(),
            ))
        })
        .collect();

        tracing::info!(
            symbols = ?core.symbols(),
            portfolio_value,
            "trading session started"
        );
        control.core = Some(core);
        control.shutdown = Some(shutdown);
        control.state = SessionState::Running;
        Ok(())
    }

    /// Halt both duties, wait for them to exit, then close every open
    /// position. A cycle blocked on market data is abandoned; an order
    /// already at the venue completes first.
    pub async fn stop(&self) -> Result<Vec<CloseOutcome>, TraderError> {
        let (core, shutdown, tasks) = {
            let mut control = self.control();
            if control.state != SessionState::Running {
                return Err(TraderError::Session {
                    reason: format!("cannot stop while {}", control.state),
                });
            }
            control.state = SessionState::Stopping;
            (
                control.core.clone(),
                control.shutdown.take(),
                std::mem::take(&mut control.tasks),
            )
        };

        tracing::info!("stopping trading session");
        if let Some(core) = &core {
            core.halt();
        }
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "duty task ended abnormally");
            }
        }

        let outcomes = match core {
            Some(core) => core.close_all().await,
            None => Vec::new(),
        };

        self.control().state = SessionState::Stopped;
        tracing::info!("trading session stopped");
        Ok(outcomes)
    }

    pub fn positions(&self) -> PositionsView {
        match self.core() {
            Some(core) => core.positions(),
            None => PositionsView {
                positions: Vec::new(),
                unrealized_pnl: 0.0,
            },
        }
    }

    pub async fn analysis(&self, symbol: &str) -> Result<Analysis, TraderError> {
        analyze(self.market.as_ref(), &self.config, symbol).await
    }

    /// Manual order while running.
    pub async fn execute_trade(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
    ) -> Result<Fill, TraderError> {
        let core = {
            let control = self.control();
            match (&control.core, control.state) {
                (Some(core), SessionState::Running) => Arc::clone(core),
                _ => {
                    return Err(TraderError::Session {
                        reason: format!("cannot trade while {}", control.state),
                    })
                }
            }
        };
        core.execute_trade(symbol, side, quantity).await
    }

    pub fn is_market_open(&self) -> bool {
        self.config.hours.is_market_open(self.clock.now())
    }
}
