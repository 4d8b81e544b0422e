//! Markdown summary report sink.
//!
//! Renders the run parameters, a metric table, an assessment line and a short exit
//! breakdown into a single `.md` file.

use crate::domain::backtest::BacktestResult;
use crate::domain::config::StrategyConfig;
use crate::domain::error::EngineError;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::position::ExitReason;
use crate::ports::report_port::ReportPort;
use log::info;
use std::fmt;
use std::fs;
use std::path::Path;

/// Coarse verdict on a run, keyed off the win rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    Tradeable,
    Marginal,
    NeedsWork,
}

impl Assessment {
    pub fn from_summary(summary: &PerformanceSummary) -> Self {
        if summary.trade_count == 0 {
            Assessment::NeedsWork
        } else if summary.win_rate >= 0.70 {
            Assessment::Tradeable
        } else if summary.win_rate >= 0.60 {
            Assessment::Marginal
        } else {
            Assessment::NeedsWork
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assessment::Tradeable => write!(f, "tradeable (win rate at least 70%)"),
            Assessment::Marginal => write!(f, "marginal (win rate 60-70%)"),
            Assessment::NeedsWork => write!(f, "needs work (win rate below 60%)"),
        }
    }
}

pub fn format_profit_factor(pf: f64) -> String {
    if pf.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", pf)
    }
}

pub fn render(result: &BacktestResult, config: &StrategyConfig) -> String {
    let s = &result.summary;
    let mut out = String::new();

    out.push_str(&format!("# {} London open imbalance backtest\n\n", config.symbol));

    out.push_str("## Parameters\n\n");
    out.push_str(&format!(
        "- Session: {} to {} (UTC offset {} min)\n",
        config.session.start.format("%H:%M"),
        config.session.end.format("%H:%M"),
        config.session.utc_offset_minutes
    ));
    out.push_str(&format!(
        "- Stop / target1 / target2: {} / {} / {} pips\n",
        config.stop_loss_pips, config.target1_pips, config.target2_pips
    ));
    out.push_str(&format!(
        "- Partial close: {:.0}%, break-even trail: {}\n",
        config.partial_close_fraction * 100.0,
        if config.trail_to_breakeven { "on" } else { "off" }
    ));
    out.push_str(&format!(
        "- Volume spike: {}x over {} bars, min wick {} pips, min body {} pips, EMA {}\n\n",
        config.volume_spike_multiple,
        config.volume_window,
        config.min_wick_pips,
        config.min_body_pips,
        config.ema_period
    ));

    out.push_str("## Results\n\n");
    out.push_str("| Metric | Value |\n|---|---|\n");
    let rows = [
        ("Bars scanned", result.bars_scanned.to_string()),
        ("Session bars checked", result.session_bars_checked.to_string()),
        ("Data gaps", result.gaps_detected.to_string()),
        ("Trades", s.trade_count.to_string()),
        ("Winners", s.winners.to_string()),
        ("Losers", s.losers.to_string()),
        ("Break-even", s.breakeven.to_string()),
        ("Win rate", format!("{:.1}%", s.win_rate * 100.0)),
        ("Profit factor", format_profit_factor(s.profit_factor)),
        ("Total pips", format!("{:.1}", s.total_pips)),
        ("Expectancy (pips/trade)", format!("{:.2}", s.expectancy_pips)),
        ("Average win (pips)", format!("{:.1}", s.average_win_pips)),
        ("Average loss (pips)", format!("{:.1}", s.average_loss_pips)),
        ("Largest win (pips)", format!("{:.1}", s.largest_win_pips)),
        ("Largest loss (pips)", format!("{:.1}", s.largest_loss_pips)),
        ("Average bars in trade", format!("{:.1}", s.average_bars_in_trade)),
    ];
    for (name, value) in rows {
        out.push_str(&format!("| {} | {} |\n", name, value));
    }

    out.push_str(&format!(
        "\n**Assessment:** {}\n\n",
        Assessment::from_summary(s)
    ));

    out.push_str("## Exits\n\n");
    for reason in [
        ExitReason::Stop,
        ExitReason::Target1,
        ExitReason::Target2,
        ExitReason::SessionEnd,
    ] {
        let count = result
            .trades
            .iter()
            .filter(|t| t.exit_reason == reason)
            .count();
        out.push_str(&format!("- {}: {}\n", reason, count));
    }

    out
}

pub struct MarkdownReport;

impl ReportPort for MarkdownReport {
    fn write(
        &self,
        result: &BacktestResult,
        config: &StrategyConfig,
        output_path: &Path,
    ) -> Result<(), EngineError> {
        fs::write(output_path, render(result, config)).map_err(|e| EngineError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;
        info!("wrote report to {}", output_path.display());
        Ok(())
    }
}
