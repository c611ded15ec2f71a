//! Quiet-hours window evaluation.
//!
//! Boundaries are `"HH:MM"` wall-clock strings. A window whose end is at or
//! before its start wraps past midnight (e.g. `22:00`-`08:00`). The start
//! minute is inside the window, the end minute is not.

use chrono::{NaiveTime, Timelike};

use crate::error::CoreError;
use crate::settings::NotificationSettings;

const MINUTES_PER_HOUR: u32 = 60;

/// A parsed quiet-hours window in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietWindow {
    start: u32,
    end: u32,
}

impl QuietWindow {
    /// Parse both boundaries of a window.
    pub fn parse(start: &str, end: &str) -> Result<Self, CoreError> {
        Ok(Self {
            start: parse_clock_minutes(start)?,
            end: parse_clock_minutes(end)?,
        })
    }

    /// Whether `minute` (minutes since midnight) falls inside the window.
    pub fn contains(&self, minute: u32) -> bool {
        if self.end <= self.start {
            minute >= self.start || minute < self.end
        } else {
            minute >= self.start && minute < self.end
        }
    }
}

/// Parse `"HH:MM"` into minutes since midnight.
///
/// Hours and minutes take one or two ASCII digits; hours must be below 24
/// and minutes below 60.
pub fn parse_clock_minutes(value: &str) -> Result<u32, CoreError> {
    let invalid = || CoreError::Validation(format!("invalid quiet-hours time {value:?}"));

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let component = |part: &str, limit: u32| -> Result<u32, CoreError> {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let n: u32 = part.parse().map_err(|_| invalid())?;
        if n >= limit {
            return Err(invalid());
        }
        Ok(n)
    };

    Ok(component(hours, 24)? * MINUTES_PER_HOUR + component(minutes, MINUTES_PER_HOUR)?)
}

/// Decide whether quiet hours suppress delivery at wall-clock time `now`.
///
/// Returns `Ok(false)` when either boundary is absent and an error when a
/// boundary is malformed; callers decide how to treat the error.
pub fn evaluate(settings: &NotificationSettings, now: NaiveTime) -> Result<bool, CoreError> {
    let Some((start, end)) = settings.quiet_window() else {
        return Ok(false);
    };
    let window = QuietWindow::parse(start, end)?;
    Ok(window.contains(now.hour() * MINUTES_PER_HOUR + now.minute()))
}
