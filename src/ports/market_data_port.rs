//! Market data port: price bars and market-wide volatility context.

use std::future::Future;

use chrono::Duration;

use crate::domain::error::TraderError;
use crate::domain::market::VolatilityContext;
use crate::domain::ohlcv::PriceBar;

pub trait MarketDataPort: Send + Sync {
    /// Chronological bars covering `window`, one per `interval`. An empty
    /// result is reported as [`TraderError::DataUnavailable`].
    fn get_bars(
        &self,
        symbol: &str,
        window: Duration,
        interval: Duration,
    ) -> impl Future<Output = Result<Vec<PriceBar>, TraderError>> + Send;

    fn get_volatility_context(
        &self,
    ) -> impl Future<Output = Result<VolatilityContext, TraderError>> + Send;
}
