//! Engine error types.
//!
//! [`EngineError`] aborts a run and is surfaced to the caller. [`ConditionError`] is local to
//! the signal detector and only ever degrades a bar to "no signal".

use chrono::NaiveDateTime;

/// A recoverable reason why entry conditions could not be evaluated on a bar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("data gap at {at}: {missing_bars} bar(s) missing")]
    DataGap { at: NaiveDateTime, missing_bars: i64 },

    #[error("insufficient history: need {needed} bars, have {available}")]
    InsufficientHistory { needed: usize, available: usize },
}

/// Top-level error type for the backtester.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no bars in {source_name}")]
    NoData { source_name: String },

    #[error("malformed bar #{index} at {timestamp}: {reason}")]
    MalformedBar {
        index: usize,
        timestamp: NaiveDateTime,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) | EngineError::Report { .. } => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Data { .. } => 3,
            EngineError::NoData { .. } => 5,
            EngineError::MalformedBar { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
