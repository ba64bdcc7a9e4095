//! Date helpers
//!
//! Formats the current date for file naming and shifts it by relative
//! offsets ("three days ago", "one month from now").

use std::str::FromStr;

use chrono::{Datelike, Local, Months, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid time unit: {0}")]
    InvalidUnit(String),

    #[error("Invalid amount for {unit}: {value}")]
    InvalidAmount { unit: String, value: String },

    #[error("Expected unit=amount, got '{0}'")]
    Malformed(String),

    #[error("Resulting date is out of range")]
    OutOfRange,
}

pub type Result<T> = std::result::Result<T, DateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl FromStr for TimeUnit {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "years" => Ok(Self::Years),
            "months" => Ok(Self::Months),
            "days" => Ok(Self::Days),
            "hours" => Ok(Self::Hours),
            "minutes" => Ok(Self::Minutes),
            "seconds" => Ok(Self::Seconds),
            other => Err(DateError::InvalidUnit(other.to_string())),
        }
    }
}

/// Signed amount of time to shift a date by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOffset {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeOffset {
    /// Add `amount` of `unit` to this offset
    pub fn with(mut self, unit: TimeUnit, amount: i64) -> Self {
        let slot = match unit {
            TimeUnit::Years => &mut self.years,
            TimeUnit::Months => &mut self.months,
            TimeUnit::Days => &mut self.days,
            TimeUnit::Hours => &mut self.hours,
            TimeUnit::Minutes => &mut self.minutes,
            TimeUnit::Seconds => &mut self.seconds,
        };
        *slot = slot.saturating_add(amount);
        self
    }

    /// Build an offset from `unit=amount` strings such as `days=3`
    pub fn parse_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        assignments.into_iter().try_fold(Self::default(), |offset, item| -> Result<Self> {
            let item = item.as_ref();
            let (unit, value) = item
                .split_once('=')
                .ok_or_else(|| DateError::Malformed(item.to_string()))?;
            let unit_kind: TimeUnit = unit.parse()?;
            let amount = value.trim().parse::<i64>().map_err(|_| DateError::InvalidAmount {
                unit: unit.trim().to_string(),
                value: value.to_string(),
            })?;
            Ok(offset.with(unit_kind, amount))
        })
    }
}

/// Wall-clock instant captured once and formatted or shifted on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateHelper {
    now: NaiveDateTime,
}

impl DateHelper {
    /// Capture the current local time
    pub fn now() -> Self {
        Self {
            now: Local::now().naive_local(),
        }
    }

    pub fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn current(&self) -> NaiveDateTime {
        self.now
    }

    /// Month number without padding, e.g. "3"
    pub fn current_month(&self) -> String {
        self.now.month().to_string()
    }

    /// `M-D-YYYY` without padding, e.g. "3-7-2024"
    pub fn current_full_date(&self) -> String {
        format!("{}-{}-{}", self.now.month(), self.now.day(), self.now.year())
    }

    /// "AM" or "PM"
    pub fn time_of_day(&self) -> &'static str {
        if self.now.hour() < 12 {
            "AM"
        } else {
            "PM"
        }
    }

    /// Shift forward. Months count as 30 days and years as 365 days.
    pub fn add_time(&self, offset: &TimeOffset) -> Result<NaiveDateTime> {
        let days = offset
            .years
            .checked_mul(365)
            .and_then(|d| offset.months.checked_mul(30).and_then(|m| d.checked_add(m)))
            .and_then(|d| d.checked_add(offset.days))
            .ok_or(DateError::OutOfRange)?;

        let delta = exact_delta(days, offset.hours, offset.minutes, offset.seconds)?;
        self.now.checked_add_signed(delta).ok_or(DateError::OutOfRange)
    }

    /// Shift backward. Months and years follow the calendar, clamping the
    /// day to the end of a shorter month.
    pub fn subtract_time(&self, offset: &TimeOffset) -> Result<NaiveDateTime> {
        let months = offset
            .years
            .checked_mul(12)
            .and_then(|m| m.checked_add(offset.months))
            .ok_or(DateError::OutOfRange)?;

        let shifted = shift_months(self.now, months.checked_neg().ok_or(DateError::OutOfRange)?)?;
        let delta = exact_delta(offset.days, offset.hours, offset.minutes, offset.seconds)?;
        shifted.checked_sub_signed(delta).ok_or(DateError::OutOfRange)
    }
}

impl Default for DateHelper {
    fn default() -> Self {
        Self::now()
    }
}

fn shift_months(date: NaiveDateTime, months: i64) -> Result<NaiveDateTime> {
    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| DateError::OutOfRange)?;
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    };
    shifted.ok_or(DateError::OutOfRange)
}

fn exact_delta(days: i64, hours: i64, minutes: i64, seconds: i64) -> Result<TimeDelta> {
    [
        TimeDelta::try_days(days),
        TimeDelta::try_hours(hours),
        TimeDelta::try_minutes(minutes),
        TimeDelta::try_seconds(seconds),
    ]
    .into_iter()
    .try_fold(TimeDelta::zero(), |total, part| total.checked_add(&part?))
    .ok_or(DateError::OutOfRange)
}
