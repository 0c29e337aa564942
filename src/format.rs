use crate::metrics::{ConnectivityState, StateClass};
use std::fmt::Display;

/// Rendered in place of any absent scalar.
pub const PLACEHOLDER: &str = "-";

/// Collector cadence is roughly one reading every 2s.
pub const DEFAULT_POINTS_PER_MINUTE: u32 = 30;

/// Lower bound on the number of history points requested.
pub const MIN_HISTORY_POINTS: u32 = 30;

pub fn display_or_dash<T: Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Numeric field as shown in the status panel: `-60`, `12.5`, or the placeholder.
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format_number(v),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// `"2026-02-03T04:12:30Z"` -> `"04:12:30"`. Anything without a `T` gives `""`.
pub fn format_time(ts: Option<&str>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    let Some(time) = ts.split('T').nth(1) else {
        return String::new();
    };
    time.replacen('Z', "", 1).chars().take(8).collect()
}

/// Number of history points to ask for when showing `minutes` of data.
pub fn compute_n(minutes: u32, points_per_minute: u32) -> u32 {
    minutes
        .saturating_mul(points_per_minute)
        .max(MIN_HISTORY_POINTS)
}

pub fn state_class(state: &str) -> Option<StateClass> {
    ConnectivityState::parse(state).class()
}
