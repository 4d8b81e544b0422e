//! OHLCV bar representation and input validation.

use super::error::EngineError;
use chrono::NaiveDateTime;

/// One fixed-interval price bar. Timestamps are UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// high - max(open, close)
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// min(open, close) - low
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn inconsistency(&self) -> Option<String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Some(format!("non-finite {name} ({value})"));
            }
        }
        if self.low <= 0.0 {
            return Some(format!("non-positive low ({})", self.low));
        }
        if self.volume < 0.0 {
            return Some(format!("negative volume ({})", self.volume));
        }
        if self.low > self.high {
            return Some(format!("low {} > high {}", self.low, self.high));
        }
        if self.open.max(self.close) > self.high {
            return Some(format!("body above high {}", self.high));
        }
        if self.open.min(self.close) < self.low {
            return Some(format!("body below low {}", self.low));
        }
        None
    }
}

/// Check every bar for finite, self-consistent OHLC values and strictly increasing
/// timestamps. The first violation is returned with the offending bar's identity.
pub fn validate_series(bars: &[Bar]) -> Result<(), EngineError> {
    for (index, bar) in bars.iter().enumerate() {
        if let Some(reason) = bar.inconsistency() {
            return Err(EngineError::MalformedBar {
                index,
                timestamp: bar.timestamp,
                reason,
            });
        }
        if index > 0 && bars[index - 1].timestamp >= bar.timestamp {
            return Err(EngineError::MalformedBar {
                index,
                timestamp: bar.timestamp,
                reason: format!(
                    "timestamp not after previous bar ({})",
                    bars[index - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}

/// Number of inter-bar intervals longer than `interval_minutes`.
pub fn count_gaps(bars: &[Bar], interval_minutes: i64) -> usize {
    bars.windows(2)
        .filter(|w| (w[1].timestamp - w[0].timestamp).num_minutes() > interval_minutes)
        .count()
}
