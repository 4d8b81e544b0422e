//! Risk manager: stop and target prices from fixed pip distances.

use super::config::StrategyConfig;
use super::signal::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLevels {
    pub stop_price: f64,
    pub target1_price: f64,
    pub target2_price: f64,
}

/// Stop `stop_loss_pips` against the direction, targets `target1_pips` and
/// `target2_pips` in favour of it. Pure; the same pip conversion is used for exits.
pub fn compute_levels(entry_price: f64, direction: Direction, config: &StrategyConfig) -> RiskLevels {
    let sign = direction.sign();
    RiskLevels {
        stop_price: entry_price - sign * config.pips_to_price(config.stop_loss_pips),
        target1_price: entry_price + sign * config.pips_to_price(config.target1_pips),
        target2_price: entry_price + sign * config.pips_to_price(config.target2_pips),
    }
}

/// Pips gained moving from `entry_price` to `exit_price` in `direction`.
pub fn pips_between(
    entry_price: f64,
    exit_price: f64,
    direction: Direction,
    config: &StrategyConfig,
) -> f64 {
    config.price_to_pips((exit_price - entry_price) * direction.sign())
}
