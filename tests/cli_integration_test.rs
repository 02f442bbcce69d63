//! End-to-end checks over the file-backed adapters the CLI wires together.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::*;
use daytrader::adapters::clock::ManualClock;
use daytrader::adapters::csv_adapter::CsvMarketData;
use daytrader::adapters::paper_broker::PaperBroker;
use daytrader::cli::load_config;
use daytrader::domain::config::TradingConfig;
use daytrader::domain::error::TraderError;
use daytrader::ports::clock_port::Clock;
use daytrader::ports::config_port::ConfigPort;
use tempfile::TempDir;

fn write_bars(dir: &Path, symbol: &str, bars: &[PriceBar]) {
    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    fs::write(dir.join(format!("{symbol}.csv")), csv).unwrap();
}

fn base_ini(dir: &TempDir) -> String {
    format!(
        "[trading]\nsymbols = aaa\n\n[data]\nbars_dir = {}\nvolatility_index = 12.5\n\n[sqlite]\npath = {}\n",
        dir.path().display(),
        dir.path().join("trades.db").display()
    )
}

mod config_loading {
    use super::*;

    #[test]
    fn full_config_round_trips_through_file() {
        let file = write_temp_ini(
            "[trading]\nmin_signal_strength = 0.6\nscan_interval_secs = 10\nmarket_open_hour = 10\n\n\
             [risk]\nmax_daily_loss_percent = 2.0\n\n[indicators]\nsma_slow = 40\n",
        );
        let adapter = load_config(&file.path().to_path_buf()).unwrap();
        let config = TradingConfig::from_config(&adapter).unwrap();

        assert_eq!(config.min_signal_strength, 0.6);
        assert_eq!(config.scan_interval.as_secs(), 10);
        assert_eq!(config.hours.open_hour, 10);
        assert_eq!(config.limits.max_daily_loss_percent, 2.0);
        assert_eq!(config.indicators.sma_slow, 40);
        assert_eq!(config.indicators.min_bars(), 40);
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = load_config(&"/nonexistent/daytrader.ini".into()).unwrap_err();
        assert!(matches!(err, TraderError::ConfigParse { .. }));
    }

    #[test]
    fn invalid_values_are_rejected_before_use() {
        let file = write_temp_ini("[trading]\nmarket_open_hour = 16\nmarket_close_hour = 9\n");
        let adapter = load_config(&file.path().to_path_buf()).unwrap();

        let err = TradingConfig::from_config(&adapter).unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { .. }));
    }

    #[test]
    fn symbol_list_is_split_on_commas() {
        let file = write_temp_ini("[trading]\nsymbols = INFY, TCS ,,RELIANCE\n");
        let adapter = load_config(&file.path().to_path_buf()).unwrap();

        assert_eq!(
            adapter.get_list("trading", "symbols"),
            vec!["INFY", "TCS", "RELIANCE"]
        );
    }

    #[test]
    fn market_data_requires_bars_dir() {
        let file = write_temp_ini("[trading]\nsymbols = AAA\n");
        let adapter = load_config(&file.path().to_path_buf()).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(monday(10, 0)));

        let err = CsvMarketData::from_config(&adapter, clock, Default::default())
            .err()
            .unwrap();
        assert!(matches!(err, TraderError::ConfigMissing { .. }));
    }
}

#[cfg(feature = "sqlite")]
mod paper_pipeline {
    use super::*;
    use daytrader::adapters::sqlite_adapter::SqliteRecordStore;
    use daytrader::domain::alert::{AlertKind, PriceAlert};
    use daytrader::domain::trade::TradeSide;
    use daytrader::ports::record_port::RecordSink;
    use daytrader::session::{analyze, ScanOutcome, SessionCore};

    struct Pipeline {
        _dir: TempDir,
        clock: Arc<ManualClock>,
        store: Arc<SqliteRecordStore>,
        core: SessionCore<CsvMarketData, PaperBroker>,
    }

    fn pipeline() -> Pipeline {
        let dir = TempDir::new().unwrap();
        write_bars(dir.path(), "AAA", &uptrend_bars(61));
        let file = write_temp_ini(&base_ini(&dir));
        let adapter = load_config(&file.path().to_path_buf()).unwrap();

        let config = TradingConfig::from_config(&adapter).unwrap();
        // last bar is stamped 14:15
        let clock = Arc::new(ManualClock::new(monday(14, 20)));
        let market = Arc::new(
            CsvMarketData::from_config(&adapter, Arc::clone(&clock) as Arc<dyn Clock>, config.hours)
                .unwrap(),
        );
        let venue = Arc::new(PaperBroker::new(
            Arc::clone(&market),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let store = Arc::new(SqliteRecordStore::from_config(&adapter).unwrap());
        let symbols = adapter
            .get_list("trading", "symbols")
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect();

        let core = SessionCore::new(
            config,
            market,
            venue,
            Arc::clone(&store) as Arc<dyn RecordSink>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            symbols,
            100_000.0,
        );
        Pipeline {
            _dir: dir,
            clock,
            store,
            core,
        }
    }

    #[tokio::test]
    async fn replayed_bars_drive_a_buy_into_the_store() {
        let p = pipeline();

        let outcomes = p.core.scan_cycle().await.unwrap();
        let ScanOutcome::Bought(fill) = &outcomes[0].1 else {
            panic!("expected a buy, got {:?}", outcomes[0].1);
        };
        assert_eq!(fill.filled_price, 131.0);
        assert_eq!(fill.timestamp, monday(14, 20));

        let trades = p.store.trades(None, None).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol, "AAA");
        assert_eq!(trades[0].quantity, 15);
    }

    #[tokio::test]
    async fn close_all_books_the_round_trip() {
        let p = pipeline();
        p.core.scan_cycle().await.unwrap();

        p.clock.advance(chrono::Duration::minutes(30));
        let closed = p.core.close_all().await;

        assert_eq!(closed.len(), 1);
        assert!(closed[0].result.is_ok());

        let trades = p.store.trades(Some("AAA"), None).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, TradeSide::Sell);
        assert_eq!(trades[0].pnl, Some(0.0));

        let summary = p.store.performance(Some("AAA")).unwrap();
        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.breakeven, 1);
    }

    #[tokio::test]
    async fn analysis_reads_replayed_context() {
        let p = pipeline();
        let dir = TempDir::new().unwrap();
        write_bars(dir.path(), "AAA", &uptrend_bars(61));
        let market = CsvMarketData::new(
            dir.path().to_path_buf(),
            Arc::clone(&p.clock) as Arc<dyn Clock>,
            Default::default(),
        )
        .with_volatility(-0.4, 12.5);

        let analysis = analyze(&market, p.core.config(), "AAA").await.unwrap();

        assert_eq!(analysis.current_price, 131.0);
        let context = analysis.market.unwrap();
        assert_eq!(context.volatility_index, 12.5);
        assert!(context.is_market_open);
    }

    #[test]
    fn alerts_persist_until_triggered() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_ini(&base_ini(&dir));
        let adapter = load_config(&file.path().to_path_buf()).unwrap();
        let store = SqliteRecordStore::from_config(&adapter).unwrap();

        store
            .record_alert(&PriceAlert::new("AAA", 150.0, AlertKind::Above, monday(9, 0)))
            .unwrap();
        store
            .record_alert(&PriceAlert::new("BBB", 20.0, AlertKind::Below, monday(9, 5)))
            .unwrap();

        let active = store.active_alerts(Some("AAA")).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, AlertKind::Above);
        assert!(active[0].is_triggered_by(150.0));
        assert_eq!(store.active_alerts(None).unwrap().len(), 2);
    }
}
