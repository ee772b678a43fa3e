use crate::error::ScheduleError;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Monthly schedules never pick a day the shortest month lacks.
pub const MAX_ALIGNED_DAY_OF_MONTH: u32 = 28;

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleKind {
    Manual,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

/// Next trigger strictly after `from` for a standard 5-field expression.
pub fn next_trigger(expression: &str, from: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
    let schedule = parse_schedule(expression)?;
    schedule
        .after(&from)
        .next()
        .ok_or_else(|| invalid(expression, "no future occurrence"))
}

/// Parse-only check used before a job is persisted or dispatched.
pub fn validate(expression: &str) -> Result<(), ScheduleError> {
    parse_schedule(expression).map(|_| ())
}

fn parse_schedule(expression: &str) -> Result<Schedule, ScheduleError> {
    let normalized = normalize_expression(expression)?;
    Schedule::from_str(&normalized).map_err(|e| invalid(expression, &e.to_string()))
}

/// Standard crontab syntax (minute hour day month weekday) to the `cron`
/// crate's seconds-first form. Weekday numbering is shifted: crontab uses
/// 0-7 with Sunday at both ends, the crate uses 1-7 starting at Sunday.
fn normalize_expression(expression: &str) -> Result<String, ScheduleError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(invalid(
            expression,
            &format!("expected 5 fields, got {}", fields.len()),
        ));
    }
    let weekday = translate_weekday_field(expression, fields[4])?;
    Ok(format!(
        "0 {} {} {} {} {weekday}",
        fields[0], fields[1], fields[2], fields[3]
    ))
}

fn translate_weekday_field(expression: &str, field: &str) -> Result<String, ScheduleError> {
    let mut parts = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };
        let translated = match range.split_once('-') {
            Some((start, end)) => match (parse_weekday(start), parse_weekday(end)) {
                (Some(start), Some(end)) => {
                    if start > end {
                        return Err(invalid(expression, "weekday range runs backwards"));
                    }
                    let mapped_start = start + 1;
                    if end == 7 {
                        if step.is_some() {
                            return Err(invalid(
                                expression,
                                "stepped weekday ranges cannot end on 7",
                            ));
                        }
                        if start == 0 {
                            "1-7".to_string()
                        } else {
                            format!("{mapped_start}-7,1")
                        }
                    } else {
                        format!("{mapped_start}-{}", end + 1)
                    }
                }
                _ => range.to_string(),
            },
            None => match parse_weekday(range) {
                Some(day) => map_single_weekday(day).to_string(),
                None => range.to_string(),
            },
        };
        match step {
            Some(step) => parts.push(format!("{translated}/{step}")),
            None => parts.push(translated),
        }
    }
    Ok(parts.join(","))
}

fn parse_weekday(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|day| *day <= 7)
}

fn map_single_weekday(day: u32) -> u32 {
    if day == 0 || day == 7 { 1 } else { day + 1 }
}

fn invalid(expression: &str, reason: &str) -> ScheduleError {
    ScheduleError::InvalidSchedule {
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

fn is_wildcard(field: &str) -> bool {
    field == "*"
}

fn is_concrete(field: &str) -> bool {
    !field.contains('*')
}

/// Structural classification by wildcard placement; no cron evaluation.
pub fn classify(expression: &str) -> ScheduleKind {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.is_empty() {
        return ScheduleKind::Manual;
    }
    let [minute, hour, day, month, weekday] = fields.as_slice() else {
        return ScheduleKind::Custom;
    };
    if !(is_concrete(minute) && is_concrete(hour) && is_wildcard(month)) {
        return ScheduleKind::Custom;
    }
    match (is_wildcard(day), is_wildcard(weekday)) {
        (true, true) => ScheduleKind::Daily,
        (true, false) if is_concrete(weekday) => ScheduleKind::Weekly,
        (false, true) if is_concrete(day) => ScheduleKind::Monthly,
        _ => ScheduleKind::Custom,
    }
}

/// Single-value schedule of `kind` aligned to the wall-clock time of `at`.
pub fn aligned_expression(kind: ScheduleKind, at: DateTime<Utc>) -> Option<String> {
    let (minute, hour) = (at.minute(), at.hour());
    match kind {
        ScheduleKind::Manual => Some(String::new()),
        ScheduleKind::Daily => Some(format!("{minute} {hour} * * *")),
        ScheduleKind::Weekly => Some(format!(
            "{minute} {hour} * * {}",
            at.weekday().num_days_from_sunday()
        )),
        ScheduleKind::Monthly => Some(format!(
            "{minute} {hour} {} * *",
            at.day().min(MAX_ALIGNED_DAY_OF_MONTH)
        )),
        ScheduleKind::Custom => None,
    }
}

/// Short human label for listings.
pub fn describe(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let time = match fields.as_slice() {
        [minute, hour, ..] => match (minute.parse::<u32>(), hour.parse::<u32>()) {
            (Ok(minute), Ok(hour)) => Some(format!("{hour:02}:{minute:02} UTC")),
            _ => None,
        },
        _ => None,
    };
    let at = time.map(|t| format!(" at {t}")).unwrap_or_default();

    match classify(expression) {
        ScheduleKind::Manual => "Manual".to_string(),
        ScheduleKind::Daily => format!("Daily{at}"),
        ScheduleKind::Weekly => {
            let day = fields
                .get(4)
                .and_then(|d| d.parse::<usize>().ok())
                .and_then(|d| WEEKDAY_NAMES.get(d % 7))
                .map_or_else(|| fields[4].to_string(), |name| (*name).to_string());
            format!("Weekly on {day}{at}")
        }
        ScheduleKind::Monthly => format!("Monthly on day {}{at}", fields[2]),
        ScheduleKind::Custom => "Custom schedule".to_string(),
    }
}

/// Fixed-width UTC timestamps so that text comparison is chronological and
/// conditional updates can match an observed value byte for byte.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid RFC3339 timestamp in job store: {raw}"))?;
    Ok(parsed.with_timezone(&Utc))
}
