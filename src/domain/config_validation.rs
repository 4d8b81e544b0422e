//! Configuration validation.
//!
//! Validates all config fields before any data is loaded.

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveTime};

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_backtest(config)?;
    validate_instrument(config)?;
    validate_session(config)?;
    validate_signal(config)?;
    validate_risk(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let start = parse_optional_date(config, "start_date")?;
    let end = parse_optional_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

pub fn parse_optional_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, EngineError> {
    match config.get_string("backtest", field) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "backtest",
                    field,
                    &format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

fn validate_instrument(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let pip_size = config.get_double("instrument", "pip_size", 0.0001);
    if pip_size <= 0.0 || !pip_size.is_finite() {
        return Err(invalid("instrument", "pip_size", "pip_size must be positive"));
    }
    let interval = config.get_int("instrument", "bar_interval_minutes", 5);
    if interval < 1 {
        return Err(invalid(
            "instrument",
            "bar_interval_minutes",
            "bar_interval_minutes must be at least 1",
        ));
    }
    Ok(())
}

pub fn parse_session_time(
    config: &dyn ConfigPort,
    key: &str,
    default: &str,
) -> Result<NaiveTime, EngineError> {
    let raw = config
        .get_string("session", key)
        .unwrap_or_else(|| default.to_string());
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| invalid("session", key, "expected HH:MM"))
}

fn validate_session(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let start = parse_session_time(config, "start", "03:00")?;
    let end = parse_session_time(config, "end", "06:00")?;
    if start >= end {
        return Err(invalid("session", "start", "session start must be before end"));
    }
    let offset = config.get_double("session", "utc_offset_hours", -5.0);
    if !(-14.0..=14.0).contains(&offset) {
        return Err(invalid(
            "session",
            "utc_offset_hours",
            "utc_offset_hours must be between -14 and 14",
        ));
    }
    Ok(())
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let multiple = config.get_double("signal", "volume_spike_multiple", 1.5);
    if multiple <= 0.0 || !multiple.is_finite() {
        return Err(invalid(
            "signal",
            "volume_spike_multiple",
            "volume_spike_multiple must be positive",
        ));
    }
    for key in ["volume_window", "ema_period"] {
        if config.get_int("signal", key, 20) < 1 {
            return Err(invalid("signal", key, &format!("{key} must be at least 1")));
        }
    }
    for (key, default) in [
        ("min_wick_pips", 8.0),
        ("min_body_pips", 5.0),
        ("key_level_tolerance_pips", 5.0),
    ] {
        if config.get_double("signal", key, default) < 0.0 {
            return Err(invalid("signal", key, &format!("{key} must be non-negative")));
        }
    }
    if config.get_double("signal", "round_number_step_pips", 50.0) <= 0.0 {
        return Err(invalid(
            "signal",
            "round_number_step_pips",
            "round_number_step_pips must be positive",
        ));
    }
    Ok(())
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), EngineError> {
    let stop = config.get_double("risk", "stop_loss_pips", 15.0);
    let target1 = config.get_double("risk", "target1_pips", 20.0);
    let target2 = config.get_double("risk", "target2_pips", 30.0);
    for (key, value) in [
        ("stop_loss_pips", stop),
        ("target1_pips", target1),
        ("target2_pips", target2),
    ] {
        if value <= 0.0 {
            return Err(invalid("risk", key, &format!("{key} must be positive")));
        }
    }
    if target1 >= target2 {
        return Err(invalid(
            "risk",
            "target2_pips",
            "target2_pips must be beyond target1_pips",
        ));
    }
    let fraction = config.get_double("risk", "partial_close_fraction", 0.0);
    if !(0.0..=1.0).contains(&fraction) {
        return Err(invalid(
            "risk",
            "partial_close_fraction",
            "partial_close_fraction must be between 0 and 1",
        ));
    }
    Ok(())
}
