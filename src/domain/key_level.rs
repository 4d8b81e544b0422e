//! Key price levels: round numbers and the prior trading day's high/low.

use super::bar::Bar;
use super::config::StrategyConfig;
use super::signal::Direction;
use chrono::NaiveDate;
use std::fmt;

/// Slack for float noise when comparing pip distances.
pub const PIP_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLevelKind {
    RoundNumber,
    PriorDayHigh,
    PriorDayLow,
}

impl fmt::Display for KeyLevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyLevelKind::RoundNumber => write!(f, "round_number"),
            KeyLevelKind::PriorDayHigh => write!(f, "prior_day_high"),
            KeyLevelKind::PriorDayLow => write!(f, "prior_day_low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyLevel {
    pub kind: KeyLevelKind,
    pub price: f64,
}

/// Prior-day high/low, rolled forward when the first bar of a new trading date arrives.
///
/// The levels for a date are fixed before any bar of that date is checked for a
/// signal: `observe` rolls the completed day into `prior` and only then folds the new
/// bar into the running extremes.
#[derive(Debug, Clone, Default)]
pub struct PriorDayLevels {
    current_date: Option<NaiveDate>,
    day_high: f64,
    day_low: f64,
    prior: Option<(f64, f64)>,
}

impl PriorDayLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, date: NaiveDate, bar: &Bar) {
        match self.current_date {
            Some(current) if current == date => {
                self.day_high = self.day_high.max(bar.high);
                self.day_low = self.day_low.min(bar.low);
                return;
            }
            Some(_) => {
                self.prior = Some((self.day_high, self.day_low));
            }
            None => {}
        }
        self.current_date = Some(date);
        self.day_high = bar.high;
        self.day_low = bar.low;
    }

    /// (high, low) of the most recent completed date with bars.
    pub fn prior(&self) -> Option<(f64, f64)> {
        self.prior
    }

    pub fn levels(&self) -> Vec<KeyLevel> {
        match self.prior {
            Some((high, low)) => vec![
                KeyLevel {
                    kind: KeyLevelKind::PriorDayHigh,
                    price: high,
                },
                KeyLevel {
                    kind: KeyLevelKind::PriorDayLow,
                    price: low,
                },
            ],
            None => Vec::new(),
        }
    }
}

/// The round-number levels directly below and above `price`.
pub fn round_levels(price: f64, config: &StrategyConfig) -> [KeyLevel; 2] {
    let step = config.pips_to_price(config.round_number_step_pips);
    let below = (price / step).floor() * step;
    [
        KeyLevel {
            kind: KeyLevelKind::RoundNumber,
            price: below,
        },
        KeyLevel {
            kind: KeyLevelKind::RoundNumber,
            price: below + step,
        },
    ]
}

/// Pick the level a close refers to for a given direction.
///
/// Returns the level and the signed pip distance of the close from it (positive when
/// the close sits on the side away from the level for `direction`). Levels on the away
/// side are preferred; ties resolve by distance, then by candidate order.
pub fn nearest_level(
    close: f64,
    direction: Direction,
    candidates: &[KeyLevel],
    config: &StrategyConfig,
) -> Option<(KeyLevel, f64)> {
    candidates
        .iter()
        .map(|level| {
            let distance = config.price_to_pips((close - level.price) * direction.sign());
            (*level, distance)
        })
        .min_by(|(_, a), (_, b)| {
            let a_wrong_side = *a < -PIP_EPSILON;
            let b_wrong_side = *b < -PIP_EPSILON;
            a_wrong_side
                .cmp(&b_wrong_side)
                .then(a.abs().total_cmp(&b.abs()))
        })
}
