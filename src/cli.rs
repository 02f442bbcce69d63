//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::clock::{ManualClock, SystemClock};
use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_sink::MemorySink;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::alert::{AlertKind, PriceAlert};
use crate::domain::config::TradingConfig;
use crate::domain::error::TraderError;
use crate::ports::clock_port::Clock;
use crate::ports::config_port::ConfigPort;
use crate::ports::record_port::RecordSink;
use crate::session::{self, TradingSession};

#[derive(Parser, Debug)]
#[command(name = "daytrader", about = "Intraday equity-trading agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a paper-trading session until Ctrl-C
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols; falls back to [trading] symbols
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long, default_value_t = 100_000.0)]
        portfolio_value: f64,
        /// Pin the clock to a fixed time (YYYY-MM-DD HH:MM:SS)
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print the analysis report for one symbol
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Record a price alert
    Alert {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        price: f64,
        /// above or below
        #[arg(long)]
        kind: String,
    },
    /// Summarize recorded trade performance
    Performance {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Also list this many recent trades
        #[arg(long, default_value_t = 0)]
        recent: usize,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            symbols,
            portfolio_value,
            as_of,
        } => run_session(&config, symbols.as_deref(), portfolio_value, as_of.as_deref()),
        Command::Analyze {
            config,
            symbol,
            as_of,
        } => run_analyze(&config, &symbol, as_of.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Alert {
            config,
            symbol,
            price,
            kind,
        } => run_alert(&config, &symbol, price, &kind),
        Command::Performance {
            config,
            symbol,
            recent,
        } => run_performance(&config, symbol.as_deref(), recent),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Read the INI file, then let `DAYTRADER_*` environment variables win.
pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, TraderError> {
    Ok(FileConfigAdapter::from_file(path)?.with_env())
}

/// Install the global subscriber. `RUST_LOG` wins over `[logging] level`.
pub fn init_tracing(config: &dyn ConfigPort) {
    use tracing_subscriber::EnvFilter;

    let level = config
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if config.get_bool("logging", "json", false) {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("warning: logging not initialised: {e}");
    }
}

fn build_clock(as_of: Option<&str>) -> Result<Arc<dyn Clock>, TraderError> {
    match as_of {
        None => Ok(Arc::new(SystemClock)),
        Some(raw) => {
            let at = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map_err(|e| {
                TraderError::ConfigInvalid {
                    section: "cli".into(),
                    key: "as_of".into(),
                    reason: format!("expected YYYY-MM-DD HH:MM:SS: {e}"),
                }
            })?;
            Ok(Arc::new(ManualClock::new(at)))
        }
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, TraderError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(TraderError::from)
}

#[cfg(feature = "sqlite")]
fn open_store(config: &dyn ConfigPort) -> Result<Option<crate::adapters::sqlite_adapter::SqliteRecordStore>, TraderError> {
    if config.get_string("sqlite", "path").is_none() {
        return Ok(None);
    }
    crate::adapters::sqlite_adapter::SqliteRecordStore::from_config(config).map(Some)
}

fn build_sink(config: &dyn ConfigPort) -> Result<Arc<dyn RecordSink>, TraderError> {
    #[cfg(feature = "sqlite")]
    {
        if let Some(store) = open_store(config)? {
            return Ok(Arc::new(store));
        }
    }
    let _ = config;
    tracing::warn!("no [sqlite] path configured, trades are kept in memory only");
    Ok(Arc::new(MemorySink::new()))
}

/// `--symbols`, else `[trading] symbols`, else every bar file on disk.
fn resolve_symbols(
    flag: Option<&str>,
    config: &dyn ConfigPort,
    market: &CsvMarketData,
) -> Result<Vec<String>, TraderError> {
    let named: Vec<String> = match flag {
        Some(raw) => raw.split(',').map(str::to_string).collect(),
        None => config.get_list("trading", "symbols"),
    };
    let named: Vec<String> = named
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if !named.is_empty() {
        return Ok(named);
    }

    let found = market.list_symbols()?;
    tracing::info!(count = found.len(), "no symbols configured, trading every bar file");
    Ok(found.into_iter().map(|s| s.to_uppercase()).collect())
}

fn run_session(
    config_path: &PathBuf,
    symbols: Option<&str>,
    portfolio_value: f64,
    as_of: Option<&str>,
) -> Result<(), TraderError> {
    let adapter = load_config(config_path)?;
    init_tracing(&adapter);

    let config = TradingConfig::from_config(&adapter)?;
    let clock = build_clock(as_of)?;
    let market = Arc::new(CsvMarketData::from_config(
        &adapter,
        Arc::clone(&clock),
        config.hours,
    )?);
    let symbols = resolve_symbols(symbols, &adapter, &market)?;
    let venue = Arc::new(PaperBroker::new(Arc::clone(&market), Arc::clone(&clock)));
    let sink = build_sink(&adapter)?;

    let runtime = build_runtime()?;
    runtime.block_on(async {
        let session = TradingSession::new(config, market, venue, sink, clock);
        session.start(symbols, portfolio_value)?;
        eprintln!("Session running; press Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        eprintln!("\nStopping...");

        for outcome in session.stop().await? {
            match outcome.result {
                Ok(fill) => eprintln!("  closed {} at {:.2}", outcome.symbol, fill.filled_price),
                Err(e) => eprintln!("  failed to close {}: {e}", outcome.symbol),
            }
        }

        if let Some(core) = session.core() {
            let mut ledger = core.ledger();
            eprintln!("Realized P&L today: {:.2}", ledger.daily_realized_pnl());
        }
        Ok::<(), TraderError>(())
    })
}

fn run_analyze(config_path: &PathBuf, symbol: &str, as_of: Option<&str>) -> Result<(), TraderError> {
    let adapter = load_config(config_path)?;
    init_tracing(&adapter);

    let config = TradingConfig::from_config(&adapter)?;
    let clock = build_clock(as_of)?;
    let market = CsvMarketData::from_config(&adapter, clock, config.hours)?;

    let analysis = build_runtime()?.block_on(session::analyze(
        &market,
        &config,
        &symbol.to_uppercase(),
    ))?;
    println!("{analysis}");
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> Result<(), TraderError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;
    let config = TradingConfig::from_config(&adapter)?;

    eprintln!(
        "  trading hours:    {:02}:00-{:02}:00",
        config.hours.open_hour, config.hours.close_hour
    );
    eprintln!("  min strength:     {:.2}", config.min_signal_strength);
    eprintln!(
        "  intervals:        scan {}s, watch {}s, backoff {}s",
        config.scan_interval.as_secs(),
        config.watch_interval.as_secs(),
        config.error_backoff.as_secs()
    );
    eprintln!(
        "  risk:             {:.1}% daily loss, {:.1}% position, {:.1}% per trade",
        config.limits.max_daily_loss_percent,
        config.limits.max_position_size_percent,
        config.risk_per_trade * 100.0
    );
    eprintln!("  minimum history:  {} bars", config.indicators.min_bars());
    eprintln!("Configuration is valid");
    Ok(())
}

fn run_alert(config_path: &PathBuf, symbol: &str, price: f64, kind: &str) -> Result<(), TraderError> {
    let adapter = load_config(config_path)?;
    init_tracing(&adapter);

    let kind = kind
        .parse::<AlertKind>()
        .map_err(|reason| TraderError::ConfigInvalid {
            section: "cli".into(),
            key: "kind".into(),
            reason,
        })?;
    if !(price > 0.0) {
        return Err(TraderError::ConfigInvalid {
            section: "cli".into(),
            key: "price".into(),
            reason: "price must be positive".into(),
        });
    }

    let alert = PriceAlert::new(&symbol.to_uppercase(), price, kind, SystemClock.now());
    build_sink(&adapter)?.record_alert(&alert)?;
    eprintln!("Alert set: {} {} {:.2}", alert.symbol, alert.kind, alert.price_target);
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_performance(config_path: &PathBuf, symbol: Option<&str>, recent: usize) -> Result<(), TraderError> {
    let adapter = load_config(config_path)?;
    init_tracing(&adapter);

    let symbol = symbol.map(str::to_uppercase);
    let store = open_store(&adapter)?.ok_or_else(|| TraderError::ConfigMissing {
        section: "sqlite".into(),
        key: "path".into(),
    })?;
    let s = store.performance(symbol.as_deref())?;

    println!("=== Performance{} ===", symbol.as_deref().map(|s| format!(" ({s})")).unwrap_or_default());
    println!("Total Trades:     {}", s.total_trades);
    println!("Wins / Losses:    {} / {}", s.wins, s.losses);
    println!("Win Rate:         {:.1}%", s.win_rate * 100.0);
    println!("Total P&L:        {:.2}", s.total_pnl);
    println!("Average Win:      {:.2}", s.avg_win);
    println!("Average Loss:     {:.2}", s.avg_loss);
    println!("Profit Factor:    {:.2}", s.profit_factor);
    println!("Largest Win:      {:.2}", s.largest_win);
    println!("Largest Loss:     {:.2}", s.largest_loss);

    if recent > 0 {
        println!("\n=== Recent Trades ===");
        for t in store.trades(symbol.as_deref(), Some(recent))? {
            println!(
                "{:<10} {:<4} {:>6} @ {:>10.2}  {}",
                t.symbol,
                t.side.to_string(),
                t.quantity,
                t.exit_price.unwrap_or(t.entry_price),
                t.pnl.map(|p| format!("P&L {p:.2}")).unwrap_or_default()
            );
        }
    }
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_performance(_config_path: &PathBuf, _symbol: Option<&str>, _recent: usize) -> Result<(), TraderError> {
    Err(TraderError::Database {
        reason: "sqlite feature is required for performance".into(),
    })
}
