//! Port traits for every collaborator the trading core talks to.

pub mod clock_port;
pub mod config_port;
pub mod execution_port;
pub mod market_data_port;
pub mod record_port;
