//! Concrete adapter implementations for ports.

pub mod clock;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod memory_sink;
pub mod paper_broker;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
