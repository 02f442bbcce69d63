//! daytrader: intraday equity-trading agent.
//!
//! Hexagonal architecture: scoring, bookkeeping and risk logic in [`domain`],
//! port traits in [`ports`], concrete implementations in [`adapters`], and
//! the polling trading loop in [`session`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod session;
