//! Cron triggers
//!
//! Schedules are cron expressions with a seconds field. Five-field
//! expressions in the classic crontab layout are accepted and run at second
//! zero; `@hourly`-style shorthands are passed through unchanged.
//!
//! Numeric weekdays use crontab numbering, `0` (Sunday) to `6` (Saturday).
//! They are shifted to the parser's `1` to `7` numbering internally, so
//! [`Trigger::expression`] always shows the form that was configured.
//!
//! Fire times are computed in the configured [`ScheduleTimezone`].

use crate::config::schema::ScheduleTimezone;
use crate::domain::{Result, SluiceError};
use chrono::{DateTime, Local, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;

/// A parsed job schedule
#[derive(Debug, Clone)]
pub struct Trigger {
    expression: String,
    schedule: Schedule,
    timezone: ScheduleTimezone,
}

impl Trigger {
    /// Parse a schedule expression, evaluated in UTC
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the expression is empty, has the
    /// wrong number of fields, uses a weekday outside `0-6`, or is rejected
    /// by the cron parser.
    pub fn parse(expression: &str) -> Result<Self> {
        let expression = normalize(expression)?;
        let schedule = Schedule::from_str(&to_parser_form(&expression)?)?;

        if schedule.upcoming(Utc).next().is_none() {
            return Err(SluiceError::Configuration(format!(
                "Schedule '{expression}' never fires"
            )));
        }

        Ok(Self {
            expression,
            schedule,
            timezone: ScheduleTimezone::Utc,
        })
    }

    /// Evaluate the schedule in `timezone`
    pub fn with_timezone(mut self, timezone: ScheduleTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Normalized expression, always with a seconds field
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Zone the schedule is evaluated in
    pub fn timezone(&self) -> ScheduleTimezone {
        self.timezone
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.timezone {
            ScheduleTimezone::Utc => self.schedule.after(&after).next(),
            ScheduleTimezone::Local => self
                .schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|at| at.with_timezone(&Utc)),
        }
    }

    /// Next fire time after `now` and how long until it
    pub fn next_fire(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Duration)> {
        let at = self.next_after(now)?;
        let wait = (at - now).to_std().unwrap_or(Duration::ZERO);
        Some((at, wait))
    }
}

fn normalize(expression: &str) -> Result<String> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(SluiceError::Configuration(
            "Schedule expression cannot be empty".to_string(),
        ));
    }
    if trimmed.starts_with('@') {
        return Ok(trimmed.to_string());
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 | 7 => Ok(fields.join(" ")),
        n => Err(SluiceError::Configuration(format!(
            "Schedule '{trimmed}' has {n} fields; expected 5, 6 or 7"
        ))),
    }
}

// Index of the day-of-week field once a seconds field is present
const WEEKDAY_FIELD: usize = 5;

fn to_parser_form(expression: &str) -> Result<String> {
    if expression.starts_with('@') {
        return Ok(expression.to_string());
    }

    expression
        .split(' ')
        .enumerate()
        .map(|(index, field)| {
            if index == WEEKDAY_FIELD {
                shift_weekdays(field)
            } else {
                Ok(field.to_string())
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(|fields| fields.join(" "))
}

fn shift_weekdays(field: &str) -> Result<String> {
    field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let range = range
                .split('-')
                .map(shift_weekday)
                .collect::<Result<Vec<_>>>()?
                .join("-");
            Ok(match step {
                Some(step) => format!("{range}/{step}"),
                None => range,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(|items| items.join(","))
}

fn shift_weekday(value: &str) -> Result<String> {
    match value.parse::<u8>() {
        Ok(day @ 0..=6) => Ok((day + 1).to_string()),
        Ok(day) => Err(SluiceError::Configuration(format!(
            "Day of week {day} is out of range; use 0-6 with Sunday = 0"
        ))),
        Err(_) => Ok(value.to_string()),
    }
}
