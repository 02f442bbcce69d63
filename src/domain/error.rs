//! Domain error types.
//!
//! Every failure the trading core can report is a [`TraderError`]; callers
//! branch on the variant, never on message text.

/// Which risk limit rejected a proposed trade.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskLimit {
    #[error("trade value {trade_value:.2} exceeds per-trade maximum {max:.2}")]
    PerTrade { trade_value: f64, max: f64 },
    #[error("daily realized P&L {realized:.2} has reached the loss limit of -{max_loss:.2}")]
    DailyLoss { realized: f64, max_loss: f64 },
    #[error("exposure {current:.2} + trade {trade_value:.2} exceeds maximum {max:.2}")]
    Exposure {
        current: f64,
        trade_value: f64,
        max: f64,
    },
}

/// Why a trade request was malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
    #[error("unknown trade side '{0}'")]
    UnknownSide(String),
    #[error("no open position")]
    NoPosition,
    #[error("insufficient quantity: holding {held}, requested {requested}")]
    InsufficientQuantity { held: u32, requested: u32 },
    #[error("position already open")]
    PositionExists,
}

/// Top-level error type for daytrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("no data for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient history for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("execution failed for {symbol}: {reason}")]
    ExecutionFailure { symbol: String, reason: String },

    #[error("risk limit exceeded for {symbol}: {limit}")]
    RiskLimitExceeded { symbol: String, limit: RiskLimit },

    #[error("invalid trade for {symbol}: {failure}")]
    Validation {
        symbol: String,
        failure: ValidationFailure,
    },

    #[error("session error: {reason}")]
    Session { reason: String },

    #[error("cycle interrupted by session stop")]
    Cancelled,

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    pub fn validation(symbol: &str, failure: ValidationFailure) -> Self {
        TraderError::Validation {
            symbol: symbol.to_string(),
            failure,
        }
    }

    /// Failures scoped to one symbol in one cycle. Anything else escaping a
    /// loop iteration is treated as transient and triggers the long backoff.
    pub fn is_per_symbol(&self) -> bool {
        matches!(
            self,
            TraderError::DataUnavailable { .. }
                | TraderError::InsufficientHistory { .. }
                | TraderError::ExecutionFailure { .. }
                | TraderError::RiskLimitExceeded { .. }
                | TraderError::Validation { .. }
        )
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) | TraderError::Session { .. } | TraderError::Cancelled => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Database { .. } | TraderError::DatabaseQuery { .. } => 3,
            TraderError::ExecutionFailure { .. }
            | TraderError::RiskLimitExceeded { .. }
            | TraderError::Validation { .. } => 4,
            TraderError::DataUnavailable { .. } | TraderError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
