//! CSV trade log sink: one row per completed trade.

use crate::domain::backtest::BacktestResult;
use crate::domain::config::StrategyConfig;
use crate::domain::error::EngineError;
use crate::domain::risk::compute_levels;
use crate::ports::report_port::ReportPort;
use log::info;
use std::path::Path;

const HEADER: [&str; 16] = [
    "entry_time",
    "direction",
    "entry_price",
    "exit_time",
    "exit_price",
    "exit_reason",
    "pnl_pips",
    "bars_in_trade",
    "key_level",
    "key_level_price",
    "stop_price",
    "target1_price",
    "target2_price",
    "partial_exit_time",
    "partial_exit_price",
    "partial_fraction",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvTradeLog;

fn report_err(e: csv::Error) -> EngineError {
    EngineError::Report {
        reason: format!("trade log: {}", e),
    }
}

impl ReportPort for CsvTradeLog {
    fn write(
        &self,
        result: &BacktestResult,
        config: &StrategyConfig,
        output_path: &Path,
    ) -> Result<(), EngineError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(report_err)?;
        wtr.write_record(HEADER).map_err(report_err)?;

        for trade in &result.trades {
            let levels = compute_levels(trade.entry_price(), trade.direction(), config);
            let (partial_time, partial_price, partial_fraction) = match &trade.partial_exit {
                Some(p) => (
                    p.timestamp.format(TIME_FORMAT).to_string(),
                    format!("{:.5}", p.price),
                    format!("{:.2}", p.fraction),
                ),
                None => (String::new(), String::new(), String::new()),
            };
            wtr.write_record([
                trade.entry_timestamp().format(TIME_FORMAT).to_string(),
                trade.direction().to_string(),
                format!("{:.5}", trade.entry_price()),
                trade.exit_timestamp.format(TIME_FORMAT).to_string(),
                format!("{:.5}", trade.exit_price),
                trade.exit_reason.to_string(),
                format!("{:.1}", trade.pnl_pips),
                trade.bars_in_trade.to_string(),
                trade.signal.key_level.kind.to_string(),
                format!("{:.5}", trade.signal.key_level.price),
                format!("{:.5}", trade.stop_price),
                format!("{:.5}", levels.target1_price),
                format!("{:.5}", levels.target2_price),
                partial_time,
                partial_price,
                partial_fraction,
            ])
            .map_err(report_err)?;
        }

        wtr.flush()?;
        info!(
            "wrote {} trades to {}",
            result.trades.len(),
            output_path.display()
        );
        Ok(())
    }
}
