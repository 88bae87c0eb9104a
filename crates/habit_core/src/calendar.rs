//! Gapless day/week/month/year bucketing of a date interval.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::{check_year, days_inclusive, DateKey};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            _ => Err(CoreError::UnknownGranularity(s.to_string())),
        }
    }
}

/// One calendar unit. `anchor` is the unit's natural first day (a Monday for
/// weeks, the 1st for months); `start..=end` is the part inside the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub anchor: DateKey,
    pub start: DateKey,
    pub end: DateKey,
}

impl Bucket {
    pub fn days(&self) -> impl Iterator<Item = DateKey> {
        days_inclusive(self.start, self.end)
    }

    pub fn len_days(&self) -> usize {
        (self.start.days_until(self.end) + 1) as usize
    }
}

fn natural_bounds(day: DateKey, granularity: Granularity) -> (DateKey, DateKey) {
    match granularity {
        Granularity::Day => (day, day),
        Granularity::Week => (day.week_start(), day.week_end()),
        Granularity::Month => (day.month_start(), day.month_end()),
        Granularity::Year => (
            DateKey::first_of_year(day.year()).unwrap_or(day),
            day.year_end(),
        ),
    }
}

/// The whole calendar unit of `granularity` that contains `day`.
pub fn bucket_of(day: DateKey, granularity: Granularity) -> Bucket {
    let (anchor, end) = natural_bounds(day, granularity);
    Bucket {
        anchor,
        start: anchor,
        end,
    }
}

/// Ordered buckets covering `from..=to`; every day lands in exactly one.
pub fn buckets(from: DateKey, to: DateKey, granularity: Granularity) -> Result<Vec<Bucket>> {
    if from > to {
        return Err(CoreError::InvalidRange { from, to });
    }
    let mut out = Vec::new();
    let mut cursor = from;
    loop {
        let (anchor, natural_end) = natural_bounds(cursor, granularity);
        let end = natural_end.min(to);
        out.push(Bucket {
            anchor,
            start: cursor,
            end,
        });
        match end.succ() {
            Some(next) if end < to => cursor = next,
            _ => break,
        }
    }
    Ok(out)
}

pub fn year_buckets(year: i32, granularity: Granularity) -> Result<Vec<Bucket>> {
    check_year(year)?;
    buckets(
        DateKey::first_of_year(year)?,
        DateKey::last_of_year(year)?,
        granularity,
    )
}
