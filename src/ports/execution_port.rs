//! Execution venue port.

use std::future::Future;

use crate::domain::error::TraderError;
use crate::domain::trade::{Fill, TradeSide};

pub trait ExecutionPort: Send + Sync {
    /// Place a market order. A returned fill with a non-success status is a
    /// rejected order, not an error.
    fn place_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: u32,
    ) -> impl Future<Output = Result<Fill, TraderError>> + Send;

    fn get_quote(&self, symbol: &str) -> impl Future<Output = Result<f64, TraderError>> + Send;
}
