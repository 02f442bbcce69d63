//! Core domain types and logic: indicators, scoring, positions and risk.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod market;
pub mod ohlcv;
pub mod performance;
pub mod position;
pub mod risk;
pub mod signal;
pub mod snapshot;
pub mod trade;
