//! Bar loader port trait.

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;
use chrono::{NaiveDate, NaiveDateTime};

pub trait DataPort {
    /// Bars in ascending timestamp order, optionally bounded by inclusive UTC dates.
    fn fetch_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, EngineError>;

    /// First and last timestamp plus bar count, or `None` for an empty source.
    fn get_data_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, EngineError>;

    /// Human readable name used in log and error messages.
    fn source_name(&self) -> String;
}
