//! SQLite record store: trade history and price alerts.

use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};

use crate::domain::alert::{AlertKind, PriceAlert};
use crate::domain::error::TraderError;
use crate::domain::performance::PerformanceSummary;
use crate::domain::trade::{TradeRecord, TradeSide};
use crate::ports::config_port::ConfigPort;
use crate::ports::record_port::RecordSink;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteRecordStore {
    pool: Pool<SqliteConnectionManager>,
}

fn query_err(e: rusqlite::Error) -> TraderError {
    TraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err(column: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_ts(column: usize, raw: &str) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).map_err(|e| conversion_err(column, e))
}

impl SqliteRecordStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| TraderError::Database {
                    reason: e.to_string(),
                })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, TraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TraderError::Database {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TraderError> {
        self.pool.get().map_err(|e: r2d2::Error| TraderError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), TraderError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS trades (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    symbol TEXT NOT NULL,
                    side TEXT NOT NULL,
                    quantity INTEGER NOT NULL,
                    entry_price REAL NOT NULL,
                    entry_time TEXT NOT NULL,
                    exit_price REAL,
                    exit_time TEXT,
                    pnl REAL
                );
                CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades(symbol);
                CREATE TABLE IF NOT EXISTS alerts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    symbol TEXT NOT NULL,
                    price_target REAL NOT NULL,
                    kind TEXT NOT NULL,
                    triggered INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_alerts_symbol ON alerts(symbol);",
            )
            .map_err(query_err)
    }

    /// Trade history, newest first, optionally for one symbol.
    pub fn trades(
        &self,
        symbol: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TradeRecord>, TraderError> {
        let conn = self.conn()?;
        let limit = limit.map_or(-1, |n| n as i64);

        let mut stmt = conn
            .prepare(
                "SELECT symbol, side, quantity, entry_price, entry_time, exit_price, exit_time, pnl
                 FROM trades
                 WHERE ?1 IS NULL OR symbol = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![symbol, limit], trade_from_row)
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    /// Untriggered alerts, oldest first, optionally for one symbol.
    pub fn active_alerts(&self, symbol: Option<&str>) -> Result<Vec<PriceAlert>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, price_target, kind, triggered, created_at
                 FROM alerts
                 WHERE triggered = 0 AND (?1 IS NULL OR symbol = ?1)
                 ORDER BY id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![symbol], |row| {
                let kind: String = row.get(2)?;
                let kind = kind.parse::<AlertKind>().map_err(|reason| {
                    conversion_err(
                        2,
                        std::io::Error::new(std::io::ErrorKind::InvalidData, reason),
                    )
                })?;
                let created_at: String = row.get(4)?;
                Ok(PriceAlert {
                    symbol: row.get(0)?,
                    price_target: row.get(1)?,
                    kind,
                    triggered: row.get(3)?,
                    created_at: parse_ts(4, &created_at)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    pub fn performance(&self, symbol: Option<&str>) -> Result<PerformanceSummary, TraderError> {
        Ok(PerformanceSummary::compute(&self.trades(symbol, None)?))
    }
}

fn trade_from_row(row: &Row<'_>) -> Result<TradeRecord, rusqlite::Error> {
    let side: String = row.get(1)?;
    let side = side.parse::<TradeSide>().map_err(|e| conversion_err(1, e))?;
    let quantity: i64 = row.get(2)?;
    let entry_time: String = row.get(4)?;
    let exit_time: Option<String> = row.get(6)?;

    Ok(TradeRecord {
        symbol: row.get(0)?,
        side,
        quantity: u32::try_from(quantity).map_err(|e| conversion_err(2, e))?,
        entry_price: row.get(3)?,
        entry_time: parse_ts(4, &entry_time)?,
        exit_price: row.get(5)?,
        exit_time: exit_time.as_deref().map(|t| parse_ts(6, t)).transpose()?,
        pnl: row.get(7)?,
    })
}

impl RecordSink for SqliteRecordStore {
    fn record_trade(&self, record: &TradeRecord) -> Result<(), TraderError> {
        self.conn()?
            .execute(
                "INSERT INTO trades
                 (symbol, side, quantity, entry_price, entry_time, exit_price, exit_time, pnl)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.symbol,
                    record.side.to_string(),
                    record.quantity,
                    record.entry_price,
                    record.entry_time.format(TS_FORMAT).to_string(),
                    record.exit_price,
                    record.exit_time.map(|t| t.format(TS_FORMAT).to_string()),
                    record.pnl,
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn record_alert(&self, alert: &PriceAlert) -> Result<(), TraderError> {
        self.conn()?
            .execute(
                "INSERT INTO alerts (symbol, price_target, kind, triggered, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    alert.symbol,
                    alert.price_target,
                    alert.kind.to_string(),
                    alert.triggered,
                    alert.created_at.format(TS_FORMAT).to_string(),
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }
}
