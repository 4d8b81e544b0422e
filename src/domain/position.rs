//! Position tracking and exit simulation.
//!
//! One [`TradeSimulator`] owns one [`Position`] from entry to exit:
//!
//! ```text
//! OPEN ──stop──────────────▶ CLOSED(stop)
//! OPEN ──target1───────────▶ PARTIAL ──stop────▶ CLOSED(stop)
//!                                    └─target2─▶ CLOSED(target2)
//! OPEN|PARTIAL ──session over / data exhausted──▶ CLOSED(session_end)
//! ```
//!
//! Modelling assumptions, since intrabar ordering is unknown:
//! - a bar whose range reaches both the stop and a target exits at the stop;
//! - stop and target fills happen exactly at the level price, even across gaps;
//! - a break-even trail applies from the bar after target1 is touched.

use super::bar::Bar;
use super::config::StrategyConfig;
use super::risk::{compute_levels, pips_between};
use super::signal::{Direction, Signal};
use chrono::NaiveDateTime;
use log::debug;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Stop,
    Target1,
    Target2,
    SessionEnd,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Stop => write!(f, "stop"),
            ExitReason::Target1 => write!(f, "target1"),
            ExitReason::Target2 => write!(f, "target2"),
            ExitReason::SessionEnd => write!(f, "session_end"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Open,
    Partial,
    Closed(ExitReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target1_price: f64,
    pub target2_price: f64,
    /// Fraction of the entry size still open, 1.0 at entry.
    pub remaining_size: f64,
    pub opened_at: NaiveDateTime,
}

impl Position {
    pub fn stop_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop_price,
            Direction::Short => bar.high >= self.stop_price,
        }
    }

    pub fn reached(&self, bar: &Bar, price: f64) -> bool {
        match self.direction {
            Direction::Long => bar.high >= price,
            Direction::Short => bar.low <= price,
        }
    }
}

/// Size realised at target1 before the final exit.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialExit {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub signal: Signal,
    pub exit_timestamp: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Stop in force when the trade closed; the entry price once a break-even trail applied.
    pub stop_price: f64,
    /// Size-weighted P&L over all legs, in pips.
    pub pnl_pips: f64,
    pub bars_in_trade: usize,
    pub partial_exit: Option<PartialExit>,
}

impl Trade {
    pub fn direction(&self) -> Direction {
        self.signal.direction
    }

    pub fn entry_price(&self) -> f64 {
        self.signal.entry_price
    }

    pub fn entry_timestamp(&self) -> NaiveDateTime {
        self.signal.timestamp
    }
}

pub struct TradeSimulator<'a> {
    config: &'a StrategyConfig,
    signal: Signal,
    position: Position,
    state: PositionState,
    realized_pips: f64,
    partial_exit: Option<PartialExit>,
    bars_in_trade: usize,
    last_timestamp: NaiveDateTime,
    last_close: f64,
}

impl<'a> TradeSimulator<'a> {
    /// Open a full-size position at the signal's entry price.
    pub fn open(signal: Signal, config: &'a StrategyConfig) -> Self {
        let levels = compute_levels(signal.entry_price, signal.direction, config);
        let position = Position {
            direction: signal.direction,
            entry_price: signal.entry_price,
            stop_price: levels.stop_price,
            target1_price: levels.target1_price,
            target2_price: levels.target2_price,
            remaining_size: 1.0,
            opened_at: signal.timestamp,
        };
        Self {
            config,
            last_timestamp: signal.timestamp,
            last_close: signal.entry_price,
            signal,
            position,
            state: PositionState::Open,
            realized_pips: 0.0,
            partial_exit: None,
            bars_in_trade: 0,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn opened_at(&self) -> NaiveDateTime {
        self.position.opened_at
    }

    /// Advance by one bar after the entry bar. Returns the trade once it closes.
    pub fn on_bar(&mut self, bar: &Bar) -> Option<Trade> {
        self.bars_in_trade += 1;
        self.last_timestamp = bar.timestamp;
        self.last_close = bar.close;

        let t1 = self.position.target1_price;
        let t2 = self.position.target2_price;
        match self.state {
            PositionState::Open => {
                if self.position.stop_hit(bar) {
                    Some(self.close(bar.timestamp, self.position.stop_price, ExitReason::Stop))
                } else if self.position.reached(bar, t1) {
                    if self.config.partial_close_fraction >= 1.0 {
                        return Some(self.close(bar.timestamp, t1, ExitReason::Target1));
                    }
                    self.take_partial(bar.timestamp);
                    if self.position.reached(bar, t2) {
                        Some(self.close(bar.timestamp, t2, ExitReason::Target2))
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            PositionState::Partial => {
                if self.position.stop_hit(bar) {
                    Some(self.close(bar.timestamp, self.position.stop_price, ExitReason::Stop))
                } else if self.position.reached(bar, t2) {
                    Some(self.close(bar.timestamp, t2, ExitReason::Target2))
                } else {
                    None
                }
            }
            PositionState::Closed(_) => None,
        }
    }

    /// Close whatever is open at the last close seen, because the session window ended
    /// or the series ran out.
    pub fn close_at_session_end(mut self) -> Trade {
        let (timestamp, price) = (self.last_timestamp, self.last_close);
        self.close(timestamp, price, ExitReason::SessionEnd)
    }

    fn take_partial(&mut self, timestamp: NaiveDateTime) {
        let fraction = self.config.partial_close_fraction;
        let t1 = self.position.target1_price;
        if fraction > 0.0 {
            self.realized_pips +=
                fraction * pips_between(self.position.entry_price, t1, self.position.direction, self.config);
            self.position.remaining_size -= fraction;
            self.partial_exit = Some(PartialExit {
                timestamp,
                price: t1,
                fraction,
            });
        }
        if self.config.trail_to_breakeven {
            self.position.stop_price = self.position.entry_price;
        }
        self.state = PositionState::Partial;
        debug!(
            "{}: target1 touched, {:.2} open, stop at {:.5}",
            timestamp, self.position.remaining_size, self.position.stop_price
        );
    }

    fn close(&mut self, timestamp: NaiveDateTime, price: f64, reason: ExitReason) -> Trade {
        let leg = pips_between(self.position.entry_price, price, self.position.direction, self.config);
        let pnl_pips = self.realized_pips + self.position.remaining_size * leg;
        self.position.remaining_size = 0.0;
        self.state = PositionState::Closed(reason);
        debug!("{}: closed ({}) at {:.5}, {:+.1} pips", timestamp, reason, price, pnl_pips);
        Trade {
            signal: self.signal.clone(),
            exit_timestamp: timestamp,
            exit_price: price,
            exit_reason: reason,
            stop_price: self.position.stop_price,
            pnl_pips,
            bars_in_trade: self.bars_in_trade,
            partial_exit: self.partial_exit.clone(),
        }
    }
}
