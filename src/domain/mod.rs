//! Core domain types and logic: the signal/trade engine with no I/O.

pub mod bar;
pub mod session;
pub mod config;
pub mod config_validation;
pub mod indicator;
pub mod key_level;
pub mod signal;
pub mod risk;
pub mod position;
pub mod metrics;
pub mod backtest;
pub mod error;
