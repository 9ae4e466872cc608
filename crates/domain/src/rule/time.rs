//! Time condition — satisfied depending on the wall clock (UTC).

use chrono::{Datelike, Days, Months, NaiveDate, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, from_unix_seconds, start_of_day};

use super::condition::NumericCompare;

/// Which component of the current time is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeKind {
    /// Seconds since midnight.
    HourMinSec,
    /// 0-23.
    Hour,
    /// 0 = Sunday.
    DayOfWeek,
    /// 1-31.
    DayOfMonth,
    /// 1-366.
    DayOfYear,
    /// 1-12.
    Month,
    Year,
    /// Unix seconds.
    Absolute,
}

/// Compares a component of the current time against `time1` / `time2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeCondition {
    pub time1: i64,
    #[serde(default)]
    pub time2: i64,
    pub compare: NumericCompare,
    pub kind: TimeKind,
}

impl TimeCondition {
    #[must_use]
    pub fn new(kind: TimeKind, compare: NumericCompare, time1: i64, time2: i64) -> Self {
        Self {
            time1,
            time2,
            compare,
            kind,
        }
    }

    /// One-shot trigger at the given unix time.
    #[must_use]
    pub fn at(timestamp: Timestamp) -> Self {
        Self::new(
            TimeKind::Absolute,
            NumericCompare::Equals,
            timestamp.timestamp(),
            0,
        )
    }

    /// Whether the condition holds at `now`.
    #[must_use]
    pub fn is_satisfied_at(&self, now: Timestamp) -> bool {
        self.compare
            .holds(self.field_value(now), self.time1, self.time2)
    }

    fn field_value(&self, now: Timestamp) -> i64 {
        match self.kind {
            TimeKind::HourMinSec => i64::from(now.num_seconds_from_midnight()),
            TimeKind::Hour => i64::from(now.hour()),
            TimeKind::DayOfWeek => i64::from(now.weekday().num_days_from_sunday()),
            TimeKind::DayOfMonth => i64::from(now.day()),
            TimeKind::DayOfYear => i64::from(now.ordinal()),
            TimeKind::Month => i64::from(now.month()),
            TimeKind::Year => i64::from(now.year()),
            TimeKind::Absolute => now.timestamp(),
        }
    }

    /// Next instant at or after `now` worth re-checking this condition.
    ///
    /// For `less`, that is the start of the next period; otherwise the next
    /// start of the period where the component equals `time1`. `Year` and
    /// `Absolute` never repeat and yield `None` once in the past.
    #[must_use]
    pub fn next_execution_time(&self, now: Timestamp) -> Option<Timestamp> {
        let today = now.date_naive();
        let less = self.compare == NumericCompare::Less;
        match self.kind {
            TimeKind::HourMinSec | TimeKind::Hour if less => {
                Some(start_of_day(today.checked_add_days(Days::new(1))?))
            }
            TimeKind::HourMinSec => {
                let offset = TimeDelta::try_seconds(self.time1.rem_euclid(86_400))?;
                roll_daily(start_of_day(today).checked_add_signed(offset)?, now)
            }
            TimeKind::Hour => {
                if !(0..24).contains(&self.time1) {
                    return None;
                }
                let offset = TimeDelta::try_hours(self.time1)?;
                roll_daily(start_of_day(today).checked_add_signed(offset)?, now)
            }
            TimeKind::DayOfWeek => {
                let week_start = today
                    .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_sunday())))?;
                if less {
                    return Some(start_of_day(week_start.checked_add_days(Days::new(7))?));
                }
                let offset = u64::try_from(self.time1).ok().filter(|d| *d < 7)?;
                let target = start_of_day(week_start.checked_add_days(Days::new(offset))?);
                if target < now {
                    Some(start_of_day(
                        week_start.checked_add_days(Days::new(offset + 7))?,
                    ))
                } else {
                    Some(target)
                }
            }
            TimeKind::DayOfMonth => {
                let first = today.with_day(1)?;
                if less {
                    return Some(start_of_day(first.checked_add_months(Months::new(1))?));
                }
                let day = u32::try_from(self.time1).ok().filter(|d| (1..=31).contains(d))?;
                (0..=12)
                    .filter_map(|months| first.checked_add_months(Months::new(months)))
                    .filter_map(|month| month.with_day(day))
                    .map(start_of_day)
                    .find(|target| *target >= now)
            }
            TimeKind::DayOfYear => {
                if less {
                    return Some(start_of_day(NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?));
                }
                let ordinal = u32::try_from(self.time1)
                    .ok()
                    .filter(|d| (1..=366).contains(d))?;
                (0..=8)
                    .filter_map(|years| NaiveDate::from_yo_opt(today.year() + years, ordinal))
                    .map(start_of_day)
                    .find(|target| *target >= now)
            }
            TimeKind::Month => {
                if less {
                    return Some(start_of_day(NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?));
                }
                let month = u32::try_from(self.time1).ok().filter(|m| (1..=12).contains(m))?;
                let target = start_of_day(NaiveDate::from_ymd_opt(today.year(), month, 1)?);
                if target < now {
                    Some(start_of_day(NaiveDate::from_ymd_opt(
                        today.year() + 1,
                        month,
                        1,
                    )?))
                } else {
                    Some(target)
                }
            }
            TimeKind::Year => {
                if less {
                    return None;
                }
                let year = i32::try_from(self.time1).ok()?;
                let target = start_of_day(NaiveDate::from_ymd_opt(year, 1, 1)?);
                (target >= now).then_some(target)
            }
            TimeKind::Absolute => {
                if less {
                    return None;
                }
                let target = from_unix_seconds(self.time1)?;
                (target >= now).then_some(target)
            }
        }
    }
}

fn roll_daily(target: Timestamp, now: Timestamp) -> Option<Timestamp> {
    if target < now {
        target.checked_add_signed(TimeDelta::days(1))
    } else {
        Some(target)
    }
}
