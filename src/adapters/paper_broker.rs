//! Paper execution venue: fills every market order at the latest known bar
//! close. Used for dry runs against replayed data.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::adapters::csv_adapter::CsvMarketData;
use crate::domain::error::TraderError;
use crate::domain::trade::{Fill, OrderStatus, TradeSide};
use crate::ports::clock_port::Clock;
use crate::ports::execution_port::ExecutionPort;

pub struct PaperBroker {
    market: Arc<CsvMarketData>,
    clock: Arc<dyn Clock>,
    halted: Mutex<HashSet<String>>,
}

impl PaperBroker {
    pub fn new(market: Arc<CsvMarketData>, clock: Arc<dyn Clock>) -> Self {
        Self {
            market,
            clock,
            halted: Mutex::new(HashSet::new()),
        }
    }

    /// Reject every subsequent order for `symbol`, as a venue does for a
    /// halted instrument.
    pub fn halt(&self, symbol: &str) {
        self.halted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(symbol.to_string());
    }

    fn is_halted(&self, symbol: &str) -> bool {
        self.halted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(symbol)
    }
}

impl ExecutionPort for PaperBroker {
    async fn place_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: u32,
    ) -> Result<Fill, TraderError> {
        let price = self.market.latest_bar(symbol)?.close;
        let status = if quantity == 0 || self.is_halted(symbol) {
            OrderStatus::Failure
        } else {
            OrderStatus::Success
        };

        tracing::info!(symbol, %side, quantity, price, ?status, "paper order");
        Ok(Fill {
            status,
            filled_price: price,
            timestamp: self.clock.now(),
        })
    }

    async fn get_quote(&self, symbol: &str) -> Result<f64, TraderError> {
        Ok(self.market.latest_bar(symbol)?.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::domain::market::TradingHours;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn broker() -> (TempDir, PaperBroker) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("INFY.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-03-04 09:15:00,100.0,101.0,99.0,100.5,1000\n",
        )
        .unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        ));
        let market = Arc::new(CsvMarketData::new(
            dir.path().to_path_buf(),
            clock.clone(),
            TradingHours::default(),
        ));
        (dir, PaperBroker::new(market, clock))
    }

    #[tokio::test]
    async fn fills_at_last_close() {
        let (_dir, broker) = broker();
        let fill = broker.place_order("INFY", TradeSide::Buy, 10).await.unwrap();
        assert!(fill.is_success());
        assert_eq!(fill.filled_price, 100.5);
        assert_eq!(broker.get_quote("INFY").await.unwrap(), 100.5);
    }

    #[tokio::test]
    async fn halted_symbol_is_rejected() {
        let (_dir, broker) = broker();
        broker.halt("INFY");
        let fill = broker.place_order("INFY", TradeSide::Sell, 10).await.unwrap();
        assert_eq!(fill.status, OrderStatus::Failure);
    }

    #[tokio::test]
    async fn unknown_symbol_errors() {
        let (_dir, broker) = broker();
        assert!(broker.get_quote("NOPE").await.is_err());
    }
}
