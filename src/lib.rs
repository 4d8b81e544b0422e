//! london_imbalance: London-open EURUSD imbalance strategy backtester.
//!
//! Hexagonal architecture: the signal/trade engine lives in [`domain`], I/O seams
//! are traits in [`ports`], and concrete file implementations are in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
