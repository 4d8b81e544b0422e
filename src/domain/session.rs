//! Trading-session window in fixed-offset local time.
//!
//! Bars carry UTC timestamps; the window bounds are local wall-clock times
//! (3:00-6:00 EST by default). A fixed offset is used, so daylight-saving shifts are
//! not modelled.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub utc_offset_minutes: i32,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, utc_offset_minutes: i32) -> Self {
        Self {
            start,
            end,
            utc_offset_minutes,
        }
    }

    /// Convert a UTC timestamp to session-local wall-clock time.
    pub fn local(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc + chrono::Duration::minutes(i64::from(self.utc_offset_minutes))
    }

    /// Local calendar date a bar belongs to.
    pub fn trading_date(&self, utc: NaiveDateTime) -> NaiveDate {
        self.local(utc).date()
    }

    /// Whether the bar opening at `utc` lies inside `[start, end)` local time.
    pub fn contains(&self, utc: NaiveDateTime) -> bool {
        let time = self.local(utc).time();
        time >= self.start && time < self.end
    }

    /// Whether `later` still belongs to the same session occurrence as `earlier`.
    pub fn same_session(&self, earlier: NaiveDateTime, later: NaiveDateTime) -> bool {
        self.contains(later) && self.trading_date(earlier) == self.trading_date(later)
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            utc_offset_minutes: -5 * 60,
        }
    }
}
