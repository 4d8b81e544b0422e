//! Backtest driver: one sequential pass over a bar series.
//!
//! The engine alternates between scanning for a signal and managing exactly one open
//! trade. Indicator state keeps advancing on every bar while a trade is open, but no
//! new signal is looked for until the trade has closed.

use super::bar::{validate_series, Bar};
use super::config::StrategyConfig;
use super::error::EngineError;
use super::metrics::PerformanceSummary;
use super::position::{Trade, TradeSimulator};
use super::signal::{Signal, SignalDetector};
use log::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub summary: PerformanceSummary,
    pub bars_scanned: usize,
    pub session_bars_checked: usize,
    pub gaps_detected: usize,
}

impl BacktestResult {
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.trades.iter().map(|t| &t.signal)
    }
}

enum EngineState<'a> {
    Scanning,
    InTrade(TradeSimulator<'a>),
}

/// Run the strategy over one ordered bar series.
///
/// Malformed input aborts the run before any signal is evaluated; data gaps and warmup
/// only suppress signals.
pub fn run_backtest(bars: &[Bar], config: &StrategyConfig) -> Result<BacktestResult, EngineError> {
    validate_series(bars)?;

    let mut detector = SignalDetector::new(config, bars);
    let mut state = EngineState::Scanning;
    let mut trades = Vec::new();
    let mut session_bars_checked = 0usize;

    for (index, bar) in bars.iter().enumerate() {
        detector.advance(index);

        state = match state {
            EngineState::InTrade(mut sim) => {
                if config.session.same_session(sim.opened_at(), bar.timestamp) {
                    match sim.on_bar(bar) {
                        Some(trade) => {
                            trades.push(trade);
                            EngineState::Scanning
                        }
                        None => EngineState::InTrade(sim),
                    }
                } else {
                    trades.push(sim.close_at_session_end());
                    scan(&detector, index, bar, config, &mut session_bars_checked)
                }
            }
            EngineState::Scanning => scan(&detector, index, bar, config, &mut session_bars_checked),
        };
    }

    if let EngineState::InTrade(sim) = state {
        trades.push(sim.close_at_session_end());
    }

    let summary = PerformanceSummary::compute(&trades);
    info!(
        "{} bars, {} trades, {} data gaps",
        bars.len(),
        trades.len(),
        detector.gaps_detected()
    );

    Ok(BacktestResult {
        trades,
        summary,
        bars_scanned: bars.len(),
        session_bars_checked,
        gaps_detected: detector.gaps_detected(),
    })
}

fn scan<'a>(
    detector: &SignalDetector<'_>,
    index: usize,
    bar: &Bar,
    config: &'a StrategyConfig,
    session_bars_checked: &mut usize,
) -> EngineState<'a> {
    if !config.session.contains(bar.timestamp) {
        return EngineState::Scanning;
    }
    *session_bars_checked += 1;
    match detector.check(index) {
        Ok(Some(signal)) => {
            info!(
                "{}: {} signal at {:.5} ({} {:.5})",
                signal.timestamp,
                signal.direction,
                signal.entry_price,
                signal.key_level.kind,
                signal.key_level.price
            );
            EngineState::InTrade(TradeSimulator::open(signal, config))
        }
        Ok(None) => EngineState::Scanning,
        Err(err) => {
            debug!("{}: skipped, {err}", bar.timestamp);
            EngineState::Scanning
        }
    }
}

/// Run independent series (e.g. separate date ranges) with the same configuration.
/// Each run owns its own detector, simulator and trade log.
pub fn run_backtests(
    series: &[Vec<Bar>],
    config: &StrategyConfig,
) -> Vec<Result<BacktestResult, EngineError>> {
    series.iter().map(|bars| run_backtest(bars, config)).collect()
}
