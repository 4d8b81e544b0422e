//! Streaming indicators used by the signal detector.
//!
//! Both are fed one bar at a time in timestamp order, so the scan stays linear in the
//! number of bars and can never look ahead.

pub mod ema;
pub mod rolling;

pub use ema::Ema;
pub use rolling::RollingWindow;
