//! Record sink port for trade history and price alerts.

use crate::domain::alert::PriceAlert;
use crate::domain::error::TraderError;
use crate::domain::trade::TradeRecord;

/// Writes are fire-and-forget from the trading loop's point of view: a
/// failure is logged, never retried, and never stops trading.
pub trait RecordSink: Send + Sync {
    fn record_trade(&self, record: &TradeRecord) -> Result<(), TraderError>;

    fn record_alert(&self, alert: &PriceAlert) -> Result<(), TraderError>;
}
