#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
pub use london_imbalance::domain::bar::Bar;
use london_imbalance::domain::error::EngineError;
use london_imbalance::ports::data_port::DataPort;

/// In-memory bar source.
pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            bars: Vec::new(),
            error: None,
        }
    }

    pub fn with_bars(mut self, bars: Vec<Bar>) -> Self {
        self.bars = bars;
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, EngineError> {
        if let Some(reason) = &self.error {
            return Err(EngineError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| start_date.is_none_or(|d| b.timestamp.date() >= d))
            .filter(|b| end_date.is_none_or(|d| b.timestamp.date() <= d))
            .cloned()
            .collect())
    }

    fn get_data_range(
        &self,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, EngineError> {
        Ok(match (self.bars.first(), self.bars.last()) {
            (Some(f), Some(l)) => Some((f.timestamp, l.timestamp, self.bars.len())),
            _ => None,
        })
    }

    fn source_name(&self) -> String {
        "mock".to_string()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2024-01-16 06:00 UTC (01:00 local at UTC-5), where every fixture series starts.
pub fn series_start() -> NaiveDateTime {
    date(2024, 1, 16).and_hms_opt(6, 0, 0).unwrap()
}

/// Timestamp of the k-th 5-minute bar of the fixture day.
pub fn bar_time(k: usize) -> NaiveDateTime {
    series_start() + Duration::minutes(5 * k as i64)
}

pub fn make_bar(k: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: bar_time(k),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Index of the confirmation (signal) bar in [`long_setup_series`], 08:35 UTC.
pub const SIGNAL_INDEX: usize = 31;

/// Entry price of the fixture signal, sitting on the 1.10500 round number.
pub const ENTRY: f64 = 1.10500;

/// Thirty quiet, gently rising bars followed by a long rejection of 1.10500 and a
/// bullish confirmation bar closing on the level:
///
/// - rejection bar (08:30 UTC): 10 pip lower wick, volume 4x the trailing mean;
/// - confirmation bar (08:35 UTC): 8 pip body, closes 12 pips above the rejection high.
pub fn long_setup_series() -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..30)
        .map(|k| {
            let close = 1.1020 + 0.00005 * k as f64;
            make_bar(k, close - 0.00002, close + 0.0001, close - 0.0001, close, 100.0)
        })
        .collect();
    bars.push(make_bar(30, 1.10350, 1.10380, 1.10250, 1.10360, 400.0));
    bars.push(make_bar(SIGNAL_INDEX, 1.10420, 1.10510, 1.10410, ENTRY, 100.0));
    bars
}

/// Append bars after the signal bar, given as (open, high, low, close).
pub fn with_followup(mut bars: Vec<Bar>, followup: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let start = bars.len();
    for (i, &(o, h, l, c)) in followup.iter().enumerate() {
        bars.push(make_bar(start + i, o, h, l, c, 100.0));
    }
    bars
}

/// Follow-up that touches target1 (1.10700) then target2 (1.10800) without
/// revisiting the stop (1.10350).
pub const RUN_TO_TARGET2: [(f64, f64, f64, f64); 3] = [
    (1.1050, 1.1060, 1.1045, 1.1058),
    (1.1058, 1.1071, 1.1052, 1.1068),
    (1.1068, 1.1081, 1.1062, 1.1078),
];

/// Follow-up whose first bar trades through the stop.
pub const STOPPED_OUT: [(f64, f64, f64, f64); 1] = [(1.1050, 1.1055, 1.1034, 1.1040)];

const MIRROR_PIVOT: f64 = 2.21;

/// Reflect a bar around 1.10500 so a long setup becomes the equivalent short one.
pub fn mirror(bar: &Bar) -> Bar {
    Bar {
        timestamp: bar.timestamp,
        open: MIRROR_PIVOT - bar.open,
        high: MIRROR_PIVOT - bar.low,
        low: MIRROR_PIVOT - bar.high,
        close: MIRROR_PIVOT - bar.close,
        volume: bar.volume,
    }
}

/// Render bars in the CSV layout the loader reads.
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{:.5},{:.5},{:.5},{:.5},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
