//! CSV bar file adapter.
//!
//! Expects a header `timestamp,open,high,low,close,volume`. Timestamps are either naive
//! `YYYY-MM-DD HH:MM:SS` (taken as UTC) or carry an explicit offset, in which case they
//! are converted to UTC.

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> Result<Vec<Bar>, EngineError> {
        let content = fs::read_to_string(&self.path).map_err(|e| EngineError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| EngineError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            // header is line 1
            let line = row + 2;

            let timestamp = parse_timestamp(field(&record, 0, "timestamp", line)?).ok_or_else(
                || EngineError::Data {
                    reason: format!("line {}: invalid timestamp", line),
                },
            )?;

            bars.push(Bar {
                timestamp,
                open: number(&record, 1, "open", line)?,
                high: number(&record, 2, "high", line)?,
                low: number(&record, 3, "low", line)?,
                close: number(&record, 4, "close", line)?,
                volume: number(&record, 5, "volume", line)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<&'r str, EngineError> {
    record.get(idx).ok_or_else(|| EngineError::Data {
        reason: format!("line {}: missing {} column", line, name),
    })
}

fn number(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<f64, EngineError> {
    field(record, idx, name, line)?
        .parse()
        .map_err(|e| EngineError::Data {
            reason: format!("line {}: invalid {} value: {}", line, name, e),
        })
}

/// Parse a bar timestamp into naive UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z")
        .ok()
        .map(|ts| ts.naive_utc())
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, EngineError> {
        let all = self.read_all()?;
        let total = all.len();
        let bars: Vec<Bar> = all
            .into_iter()
            .filter(|b| start_date.is_none_or(|d| b.timestamp.date() >= d))
            .filter(|b| end_date.is_none_or(|d| b.timestamp.date() <= d))
            .collect();
        debug!(
            "{}: kept {} of {} bars after date filter",
            self.path.display(),
            bars.len(),
            total
        );
        Ok(bars)
    }

    fn get_data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, EngineError> {
        let bars = self.read_all()?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }

    fn source_name(&self) -> String {
        self.path.display().to_string()
    }
}
