//! Record sink that keeps everything in memory and logs each write.

use std::sync::Mutex;

use crate::domain::alert::PriceAlert;
use crate::domain::error::TraderError;
use crate::domain::trade::TradeRecord;
use crate::ports::record_port::RecordSink;

#[derive(Default)]
pub struct MemorySink {
    trades: Mutex<Vec<TradeRecord>>,
    alerts: Mutex<Vec<PriceAlert>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn alerts(&self) -> Vec<PriceAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RecordSink for MemorySink {
    fn record_trade(&self, record: &TradeRecord) -> Result<(), TraderError> {
        tracing::info!(
            symbol = %record.symbol,
            side = %record.side,
            quantity = record.quantity,
            entry_price = record.entry_price,
            exit_price = record.exit_price,
            pnl = record.pnl,
            "trade recorded"
        );
        self.trades
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }

    fn record_alert(&self, alert: &PriceAlert) -> Result<(), TraderError> {
        tracing::info!(
            symbol = %alert.symbol,
            kind = %alert.kind,
            price_target = alert.price_target,
            "alert recorded"
        );
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert.clone());
        Ok(())
    }
}
