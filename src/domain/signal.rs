//! Signal detection: the five entry conditions of the London-open imbalance setup.
//!
//! For a candidate bar `i` the rejection bar is `i - 1` and `i` itself is the
//! confirmation bar. A long setup rejects from below a level (long lower wick, bullish
//! confirmation closing above the rejection high); a short setup is the mirror image.
//!
//! The detector is fed every bar in order through [`SignalDetector::advance`]; indicator
//! state (EMA, trailing volume, prior-day levels) is updated incrementally, so a
//! [`SignalDetector::check`] on bar `i` can only ever read bars `..=i`.

use super::bar::Bar;
use super::config::StrategyConfig;
use super::error::ConditionError;
use super::indicator::{Ema, RollingWindow};
use super::key_level::{self, KeyLevel, PriorDayLevels, PIP_EPSILON};
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Measurements behind a signal, all signed along the trade direction where a sign
/// matters. Re-evaluating them with [`EntryConditions::evaluate`] reproduces the decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalMetrics {
    /// Close minus key level, in pips; positive on the away side.
    pub level_distance_pips: f64,
    /// Rejection-bar volume over the mean of the `volume_window` bars before it; the
    /// spike bar itself is not part of the baseline.
    pub volume_ratio: f64,
    /// Rejection wick on the setup side, in pips.
    pub wick_pips: f64,
    /// Confirmation body, positive when the candle closes in the trade direction.
    pub body_pips: f64,
    /// How far the confirmation close broke beyond the rejection bar's extreme.
    pub breakout_pips: f64,
    /// EMA[i] - EMA[i-1] in price units.
    pub ema_slope: f64,
    /// Close minus EMA in pips, positive on the trade side.
    pub ema_offset_pips: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryConditions {
    pub key_level: bool,
    pub volume_spike: bool,
    pub rejection_wick: bool,
    pub confirmation: bool,
    pub ema_alignment: bool,
}

impl EntryConditions {
    pub fn evaluate(
        metrics: &SignalMetrics,
        direction: Direction,
        config: &StrategyConfig,
    ) -> Self {
        let ema_side_ok = !config.require_price_beyond_ema || metrics.ema_offset_pips > 0.0;
        EntryConditions {
            key_level: metrics.level_distance_pips.abs()
                <= config.key_level_tolerance_pips + PIP_EPSILON,
            volume_spike: metrics.volume_ratio > config.volume_spike_multiple,
            rejection_wick: metrics.wick_pips >= config.min_wick_pips - PIP_EPSILON,
            confirmation: metrics.body_pips >= config.min_body_pips - PIP_EPSILON
                && metrics.breakout_pips > 0.0
                && metrics.level_distance_pips >= -PIP_EPSILON,
            ema_alignment: metrics.ema_slope * direction.sign() > 0.0 && ema_side_ok,
        }
    }

    pub fn all(&self) -> bool {
        self.key_level
            && self.volume_spike
            && self.rejection_wick
            && self.confirmation
            && self.ema_alignment
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    pub entry_price: f64,
    pub key_level: KeyLevel,
    pub metrics: SignalMetrics,
}

impl Signal {
    pub fn conditions(&self, config: &StrategyConfig) -> EntryConditions {
        EntryConditions::evaluate(&self.metrics, self.direction, config)
    }
}

#[derive(Debug, Clone, Copy)]
struct Gap {
    index: usize,
    missing_bars: i64,
}

/// Incremental scanner over one bar series.
pub struct SignalDetector<'a> {
    config: &'a StrategyConfig,
    bars: &'a [Bar],
    next_index: usize,
    ema: Ema,
    /// Volumes of the bars preceding the current rejection bar.
    volume: RollingWindow,
    levels: PriorDayLevels,
    last_gap: Option<Gap>,
    gaps_detected: usize,
}

impl<'a> SignalDetector<'a> {
    pub fn new(config: &'a StrategyConfig, bars: &'a [Bar]) -> Self {
        Self {
            config,
            bars,
            next_index: 0,
            ema: Ema::new(config.ema_period),
            volume: RollingWindow::new(config.volume_window),
            levels: PriorDayLevels::new(),
            last_gap: None,
            gaps_detected: 0,
        }
    }

    pub fn gaps_detected(&self) -> usize {
        self.gaps_detected
    }

    /// Fold bar `index` into the indicator state. Must be called for every bar, in order.
    pub fn advance(&mut self, index: usize) {
        debug_assert_eq!(index, self.next_index, "bars must be advanced in order");
        self.next_index = index + 1;
        let bar = &self.bars[index];

        if index > 0 {
            let previous = &self.bars[index - 1];
            let elapsed = (bar.timestamp - previous.timestamp).num_minutes();
            if elapsed > self.config.bar_interval_minutes {
                let missing_bars = elapsed / self.config.bar_interval_minutes.max(1) - 1;
                warn!(
                    "data gap before {}: {} bar(s) missing after {}",
                    bar.timestamp, missing_bars, previous.timestamp
                );
                self.last_gap = Some(Gap {
                    index,
                    missing_bars: missing_bars.max(1),
                });
                self.gaps_detected += 1;
            }
        }
        if index >= 2 {
            self.volume.push(self.bars[index - 2].volume);
        }

        self.ema.update(bar.close);
        let date = self.config.session.trading_date(bar.timestamp);
        self.levels.observe(date, bar);
    }

    /// Evaluate bar `index` (already advanced) as a confirmation bar.
    ///
    /// `Err` means the bar could not be evaluated (gap or warmup); `Ok(None)` means it
    /// was evaluated and at least one condition failed.
    pub fn check(&self, index: usize) -> Result<Option<Signal>, ConditionError> {
        debug_assert!(index < self.next_index, "bar checked before it was advanced");

        if let Some(gap) = self.last_gap {
            // The gap sits between bars gap.index-1 and gap.index; the lookback span
            // starts at index + 1 - lookback.
            if gap.index + self.config.lookback_bars() > index + 1 {
                return Err(ConditionError::DataGap {
                    at: self.bars[gap.index].timestamp,
                    missing_bars: gap.missing_bars,
                });
            }
        }

        let average_volume = self
            .volume
            .mean()
            .ok_or(ConditionError::InsufficientHistory {
                needed: self.config.lookback_bars(),
                available: index + 1,
            })?;
        let (ema_value, ema_slope) = match (self.ema.value(), self.ema.slope()) {
            (Some(value), Some(slope)) => (value, slope),
            _ => {
                return Err(ConditionError::InsufficientHistory {
                    needed: self.config.ema_period + 1,
                    available: self.ema.len(),
                });
            }
        };

        let confirm = &self.bars[index];
        let reject = &self.bars[index - 1];
        let config = self.config;

        let long_wick = config.price_to_pips(reject.lower_wick());
        let short_wick = config.price_to_pips(reject.upper_wick());
        let long_setup = long_wick >= config.min_wick_pips - PIP_EPSILON;
        let short_setup = short_wick >= config.min_wick_pips - PIP_EPSILON;

        let direction = match (long_setup, short_setup) {
            (true, false) => Direction::Long,
            (false, true) => Direction::Short,
            (true, true) => {
                if ema_slope > 0.0 {
                    Direction::Long
                } else if ema_slope < 0.0 {
                    Direction::Short
                } else {
                    debug!("{}: two-sided rejection with flat EMA", confirm.timestamp);
                    return Ok(None);
                }
            }
            (false, false) => return Ok(None),
        };
        let sign = direction.sign();

        let mut candidates = key_level::round_levels(confirm.close, config).to_vec();
        candidates.extend(self.levels.levels());
        let Some((level, level_distance_pips)) =
            key_level::nearest_level(confirm.close, direction, &candidates, config)
        else {
            return Ok(None);
        };

        let volume_ratio = if average_volume > 0.0 {
            reject.volume / average_volume
        } else if reject.volume > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let breakout = match direction {
            Direction::Long => confirm.close - reject.high,
            Direction::Short => reject.low - confirm.close,
        };

        let metrics = SignalMetrics {
            level_distance_pips,
            volume_ratio,
            wick_pips: match direction {
                Direction::Long => long_wick,
                Direction::Short => short_wick,
            },
            body_pips: config.price_to_pips((confirm.close - confirm.open) * sign),
            breakout_pips: config.price_to_pips(breakout),
            ema_slope,
            ema_offset_pips: config.price_to_pips((confirm.close - ema_value) * sign),
        };

        let conditions = EntryConditions::evaluate(&metrics, direction, config);
        if !conditions.all() {
            debug!(
                "{}: {} setup rejected {:?}",
                confirm.timestamp, direction, conditions
            );
            return Ok(None);
        }

        Ok(Some(Signal {
            bar_index: index,
            timestamp: confirm.timestamp,
            direction,
            entry_price: confirm.close,
            key_level: level,
            metrics,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> StrategyConfig {
        StrategyConfig::default()
    }

    fn sample_metrics() -> SignalMetrics {
        SignalMetrics {
            level_distance_pips: 0.0,
            volume_ratio: 4.0,
            wick_pips: 10.0,
            body_pips: 8.0,
            breakout_pips: 12.0,
            ema_slope: 0.00002,
            ema_offset_pips: 3.0,
        }
    }

    #[test]
    fn all_conditions_hold() {
        let c = EntryConditions::evaluate(&sample_metrics(), Direction::Long, &config());
        assert!(c.all());
    }

    #[test]
    fn each_condition_can_fail_independently() {
        let cfg = config();
        let cases = [
            SignalMetrics {
                level_distance_pips: 6.0,
                ..sample_metrics()
            },
            SignalMetrics {
                volume_ratio: 1.5,
                ..sample_metrics()
            },
            SignalMetrics {
                wick_pips: 7.5,
                ..sample_metrics()
            },
            SignalMetrics {
                body_pips: 4.0,
                ..sample_metrics()
            },
            SignalMetrics {
                breakout_pips: 0.0,
                ..sample_metrics()
            },
            SignalMetrics {
                level_distance_pips: -1.0,
                ..sample_metrics()
            },
            SignalMetrics {
                ema_slope: -0.00001,
                ..sample_metrics()
            },
        ];
        for metrics in cases {
            let c = EntryConditions::evaluate(&metrics, Direction::Long, &cfg);
            assert!(!c.all(), "{metrics:?} should fail");
        }
    }

    #[test]
    fn volume_spike_is_strictly_greater() {
        let c = EntryConditions::evaluate(
            &SignalMetrics {
                volume_ratio: 1.5,
                ..sample_metrics()
            },
            Direction::Long,
            &config(),
        );
        assert!(!c.volume_spike);
        assert!(c.key_level && c.rejection_wick && c.confirmation && c.ema_alignment);
    }

    #[test]
    fn ema_alignment_follows_direction() {
        let metrics = SignalMetrics {
            ema_slope: -0.00002,
            ..sample_metrics()
        };
        assert!(EntryConditions::evaluate(&metrics, Direction::Short, &config()).ema_alignment);
        assert!(!EntryConditions::evaluate(&metrics, Direction::Long, &config()).ema_alignment);
    }

    #[test]
    fn price_beyond_ema_filter() {
        let cfg = StrategyConfig {
            require_price_beyond_ema: true,
            ..config()
        };
        let metrics = SignalMetrics {
            ema_offset_pips: -2.0,
            ..sample_metrics()
        };
        assert!(!EntryConditions::evaluate(&metrics, Direction::Long, &cfg).ema_alignment);
        assert!(EntryConditions::evaluate(&metrics, Direction::Long, &config()).ema_alignment);
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Long.to_string(), "long");
        assert_eq!(Direction::Short.to_string(), "short");
        assert_eq!(Direction::Short.sign(), -1.0);
    }

    fn flat_bars(count: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 16)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        (0..count)
            .map(|i| Bar {
                timestamp: start + chrono::Duration::minutes(5 * i as i64),
                open: 1.1020,
                high: 1.1021,
                low: 1.1019,
                close: 1.1020,
                volume: 100.0,
            })
            .collect()
    }

    #[test]
    fn warmup_reports_insufficient_history() {
        let cfg = config();
        let bars = flat_bars(5);
        let mut detector = SignalDetector::new(&cfg, &bars);
        for i in 0..bars.len() {
            detector.advance(i);
        }
        let err = detector.check(4).unwrap_err();
        assert!(matches!(err, ConditionError::InsufficientHistory { .. }));
    }

    #[test]
    fn gap_inside_lookback_suppresses_checks() {
        let cfg = config();
        let mut bars = flat_bars(40);
        // drop two bars' worth of time before bar 30
        for bar in bars.iter_mut().skip(30) {
            bar.timestamp += chrono::Duration::minutes(10);
        }
        let mut detector = SignalDetector::new(&cfg, &bars);
        for i in 0..bars.len() {
            detector.advance(i);
        }
        assert_eq!(detector.gaps_detected(), 1);

        let err = detector.check(35).unwrap_err();
        assert_eq!(
            err,
            ConditionError::DataGap {
                at: bars[30].timestamp,
                missing_bars: 2,
            }
        );
    }

    #[test]
    fn two_sided_rejection_with_flat_ema_is_no_signal() {
        // period 1 tracks the close exactly, so equal closes give a slope of 0.0
        let cfg = StrategyConfig {
            ema_period: 1,
            ..config()
        };
        let mut bars = flat_bars(30);
        bars[28].high = 1.1030;
        bars[28].low = 1.1010;
        bars[28].volume = 400.0;
        let mut detector = SignalDetector::new(&cfg, &bars);
        for i in 0..bars.len() {
            detector.advance(i);
        }
        assert_eq!(detector.check(29), Ok(None));
    }

    #[test]
    fn quiet_bars_evaluate_to_no_signal() {
        let cfg = config();
        let bars = flat_bars(30);
        let mut detector = SignalDetector::new(&cfg, &bars);
        for i in 0..bars.len() {
            detector.advance(i);
        }
        assert_eq!(detector.check(29), Ok(None));
    }
}
