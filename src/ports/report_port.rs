//! Report sink port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::config::StrategyConfig;
use crate::domain::error::EngineError;
use std::path::Path;

/// Port for writing backtest output (trade log, summary report).
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        config: &StrategyConfig,
        output_path: &Path,
    ) -> Result<(), EngineError>;
}
