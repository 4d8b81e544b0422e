//! Immutable strategy configuration consumed by the engine.
//!
//! Built once (see `cli::build_strategy_config`) and passed by reference, so several
//! configurations can run side by side.

use super::session::SessionWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub symbol: String,
    pub pip_size: f64,
    pub bar_interval_minutes: i64,
    pub session: SessionWindow,

    pub volume_spike_multiple: f64,
    pub volume_window: usize,
    pub min_wick_pips: f64,
    pub min_body_pips: f64,
    pub ema_period: usize,
    pub key_level_tolerance_pips: f64,
    pub round_number_step_pips: f64,
    pub require_price_beyond_ema: bool,

    pub stop_loss_pips: f64,
    pub target1_pips: f64,
    pub target2_pips: f64,
    pub partial_close_fraction: f64,
    pub trail_to_breakeven: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            symbol: "EURUSD".to_string(),
            pip_size: 0.0001,
            bar_interval_minutes: 5,
            session: SessionWindow::default(),
            volume_spike_multiple: 1.5,
            volume_window: 20,
            min_wick_pips: 8.0,
            min_body_pips: 5.0,
            ema_period: 20,
            key_level_tolerance_pips: 5.0,
            round_number_step_pips: 50.0,
            require_price_beyond_ema: false,
            stop_loss_pips: 15.0,
            target1_pips: 20.0,
            target2_pips: 30.0,
            partial_close_fraction: 0.0,
            trail_to_breakeven: false,
        }
    }
}

impl StrategyConfig {
    /// Price distance for a pip count.
    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    /// Pip count for a price distance.
    pub fn price_to_pips(&self, price_delta: f64) -> f64 {
        price_delta / self.pip_size
    }

    /// Bars a signal check looks back over: the volume window plus the rejection and
    /// confirmation bars.
    pub fn lookback_bars(&self) -> usize {
        self.volume_window + 2
    }
}
