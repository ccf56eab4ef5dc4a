//! A five-field cron expression, parsed just far enough to drive a
//! minute-resolution tick-check loop — not a full cron-expression engine.
//! Each field is either `*` or a comma-separated list of exact values, the
//! subset operators actually needed for "daily at 03:00" style schedules.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

use crate::error::{RetentionError, Result};

/// One field of a cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Any,
    List(Vec<u32>),
}

impl Field {
    fn parse(raw: &str, max: u32) -> Result<Self> {
        if raw == "*" {
            return Ok(Field::Any);
        }
        let mut values = Vec::new();
        for part in raw.split(',') {
            let v: u32 = part
                .parse()
                .map_err(|_| RetentionError::InvalidCron(raw.to_string(), "expected \"*\" or a comma-separated list of integers"))?;
            if v > max {
                return Err(RetentionError::InvalidCron(raw.to_string(), "value out of range"));
            }
            values.push(v);
        }
        Ok(Field::List(values))
    }

    fn matches(&self, value: u32) -> bool {
        match self {
            Field::Any => true,
            Field::List(values) => values.contains(&value),
        }
    }
}

/// A parsed five-field cron expression: `minute hour day-of-month month
/// day-of-week`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronSchedule {
    /// Parse a standard five-field cron expression.
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(RetentionError::InvalidCron(expr.to_string(), "expected exactly 5 whitespace-separated fields"));
        }
        Ok(Self {
            minute: Field::parse(fields[0], 59)?,
            hour: Field::parse(fields[1], 23)?,
            day_of_month: Field::parse(fields[2], 31)?,
            month: Field::parse(fields[3], 12)?,
            day_of_week: Field::parse(fields[4], 6)?,
        })
    }

    /// Whether `at` (truncated to the minute) is a scheduled fire time.
    pub fn matches<Tz: TimeZone>(&self, at: DateTime<Tz>) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self.day_of_week.matches(at.weekday().num_days_from_sunday())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronSchedule::parse("0 3 * *").is_err());
    }

    #[test]
    fn rejects_out_of_range_value() {
        assert!(CronSchedule::parse("99 3 * * *").is_err());
    }

    #[test]
    fn daily_at_three_matches_only_that_minute() {
        let schedule = CronSchedule::parse("0 3 * * *").unwrap();
        let hit = Utc.with_ymd_and_hms(2026, 7, 28, 3, 0, 0).unwrap();
        let miss_hour = Utc.with_ymd_and_hms(2026, 7, 28, 4, 0, 0).unwrap();
        let miss_minute = Utc.with_ymd_and_hms(2026, 7, 28, 3, 1, 0).unwrap();
        assert!(schedule.matches(hit));
        assert!(!schedule.matches(miss_hour));
        assert!(!schedule.matches(miss_minute));
    }

    #[test]
    fn list_field_matches_any_listed_value() {
        let schedule = CronSchedule::parse("0,30 * * * *").unwrap();
        let at_zero = Utc.with_ymd_and_hms(2026, 7, 28, 3, 0, 0).unwrap();
        let at_thirty = Utc.with_ymd_and_hms(2026, 7, 28, 3, 30, 0).unwrap();
        let at_fifteen = Utc.with_ymd_and_hms(2026, 7, 28, 3, 15, 0).unwrap();
        assert!(schedule.matches(at_zero));
        assert!(schedule.matches(at_thirty));
        assert!(!schedule.matches(at_fifteen));
    }
}
