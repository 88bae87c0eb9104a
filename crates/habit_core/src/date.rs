use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// A calendar day in `YYYY-MM-DD` form.
///
/// Ordering is chronological, which for this fixed-width format is the same as
/// comparing the string keys lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Parses a strict `YYYY-MM-DD` key. Anything else (missing zero padding,
    /// trailing time component, impossible dates) is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let bytes = input.as_bytes();
        let shaped = bytes.len() == 10
            && bytes.iter().enumerate().all(|(idx, byte)| match idx {
                4 | 7 => *byte == b'-',
                _ => byte.is_ascii_digit(),
            });
        if !shaped {
            return Err(CoreError::InvalidDateKey(input.to_string()));
        }
        let date = NaiveDate::parse_from_str(input, DATE_KEY_FORMAT)
            .map_err(|_| CoreError::InvalidDateKey(input.to_string()))?;
        check_year(date.year())?;
        Ok(Self(date))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        check_year(year)?;
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidDateKey(format!("{year:04}-{month:02}-{day:02}")))
    }

    pub fn first_of_year(year: i32) -> Result<Self> {
        Self::from_ymd(year, 1, 1)
    }

    pub fn last_of_year(year: i32) -> Result<Self> {
        Self::from_ymd(year, 12, 31)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    /// Keeps every key inside `MIN_YEAR..=MAX_YEAR`.
    fn checked(date: NaiveDate) -> Option<Self> {
        check_year(date.year()).ok().map(|()| Self(date))
    }

    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().and_then(Self::checked)
    }

    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().and_then(Self::checked)
    }

    pub fn add_days(self, days: i64) -> Option<Self> {
        self.0.checked_add_signed(Duration::days(days)).and_then(Self::checked)
    }

    /// Shifts by whole months, clamping the day to the target month's length.
    pub fn add_months(self, months: i32) -> Option<Self> {
        let shifted = if months >= 0 {
            self.0.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.0.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.and_then(Self::checked)
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(self, other: DateKey) -> i64 {
        other.0.signed_duration_since(self.0).num_days()
    }

    /// Monday on or before this day.
    pub fn week_start(self) -> Self {
        let back = i64::from(self.0.weekday().num_days_from_monday());
        self.add_days(-back).unwrap_or(self)
    }

    /// Sunday on or after this day, or Dec 31 of `MAX_YEAR` when that Sunday
    /// falls past the supported range.
    pub fn week_end(self) -> Self {
        let forward = 6 - i64::from(self.0.weekday().num_days_from_monday());
        self.add_days(forward).unwrap_or_else(|| self.year_end())
    }

    pub fn month_start(self) -> Self {
        Self(self.0.with_day(1).unwrap_or(self.0))
    }

    pub fn month_end(self) -> Self {
        let last = days_in_month(self.year(), self.month());
        Self(self.0.with_day(last).unwrap_or(self.0))
    }

    pub fn year_end(self) -> Self {
        Self(NaiveDate::from_ymd_opt(self.year(), 12, 31).unwrap_or(self.0))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<DateKey> for NaiveDate {
    fn from(key: DateKey) -> Self {
        key.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

pub fn check_year(year: i32) -> Result<()> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(CoreError::YearOutOfRange(year))
    }
}

/// Every day from `from` to `to`, both inclusive. Empty when `from > to`.
pub fn days_inclusive(from: DateKey, to: DateKey) -> impl Iterator<Item = DateKey> {
    std::iter::successors(Some(from), move |day| day.succ().filter(|next| *next <= to))
        .take_while(move |day| *day <= to)
}

pub fn months_between(start: DateKey, end: DateKey) -> i32 {
    (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
}

/// Whole months elapsed from `start` to `end`, the way a calendar counts them:
/// the last month only counts once its day-of-month has been reached.
pub fn whole_months_between(start: DateKey, end: DateKey) -> i32 {
    let months = months_between(start, end);
    if months > 0 && end.day() < start.day() {
        months - 1
    } else {
        months
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
