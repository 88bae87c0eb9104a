use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::percent;
use crate::date::DateKey;
use crate::habit::HabitStatus;

/// One reading status per day; days without an entry are unmarked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingLog {
    days: BTreeMap<DateKey, HabitStatus>,
}

impl ReadingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, date: DateKey) -> Option<HabitStatus> {
        self.days.get(&date).copied()
    }

    pub fn set(&mut self, date: DateKey, status: HabitStatus) {
        self.days.insert(date, status);
    }

    pub fn clear(&mut self, date: DateKey) -> Option<HabitStatus> {
        self.days.remove(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateKey, HabitStatus)> + '_ {
        self.days.iter().map(|(date, status)| (*date, *status))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl FromIterator<(DateKey, HabitStatus)> for ReadingLog {
    fn from_iter<T: IntoIterator<Item = (DateKey, HabitStatus)>>(iter: T) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingYear {
    pub year: i32,
    pub days_read: usize,
    pub days_missed: usize,
    pub longest_streak: usize,
    /// Share of marked days that were read, as a whole percentage.
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingStats {
    pub years: Vec<ReadingYear>,
    pub current_streak: usize,
}

impl ReadingStats {
    /// Years with at least one entry; just `fallback` when the log is empty.
    pub fn available_years(&self, fallback: i32) -> Vec<i32> {
        if self.years.is_empty() {
            vec![fallback]
        } else {
            self.years.iter().map(|year| year.year).collect()
        }
    }

    pub fn year(&self, year: i32) -> Option<&ReadingYear> {
        self.years.iter().find(|entry| entry.year == year)
    }
}

/// Per-year reading totals. Entries dated after `today` are ignored.
pub fn reading_stats(log: &ReadingLog, today: DateKey) -> ReadingStats {
    let mut years: BTreeMap<i32, ReadingYear> = BTreeMap::new();
    let mut run = 0usize;
    let mut previous: Option<DateKey> = None;

    for (date, status) in log.iter().filter(|(date, _)| *date <= today) {
        let entry = years.entry(date.year()).or_insert_with(|| ReadingYear {
            year: date.year(),
            days_read: 0,
            days_missed: 0,
            longest_streak: 0,
            percentage: 0,
        });
        match status {
            HabitStatus::Done => {
                entry.days_read += 1;
                let continues = previous.and_then(DateKey::succ) == Some(date)
                    && previous.map(DateKey::year) == Some(date.year());
                run = if continues { run + 1 } else { 1 };
                entry.longest_streak = entry.longest_streak.max(run);
                previous = Some(date);
            }
            HabitStatus::Missed => {
                entry.days_missed += 1;
                run = 0;
                previous = None;
            }
        }
    }

    for entry in years.values_mut() {
        entry.percentage = percent(entry.days_read, entry.days_read + entry.days_missed);
    }

    ReadingStats {
        years: years.into_values().collect(),
        current_streak: current_streak(log, today),
    }
}

/// Consecutive read days ending today, or yesterday when today is still unmarked.
fn current_streak(log: &ReadingLog, today: DateKey) -> usize {
    let mut cursor = match log.status(today) {
        Some(_) => Some(today),
        None => today.pred(),
    };
    let mut streak = 0;
    while let Some(date) = cursor {
        if log.status(date) != Some(HabitStatus::Done) {
            break;
        }
        streak += 1;
        cursor = date.pred();
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).unwrap()
    }

    fn log(entries: &[(&str, HabitStatus)]) -> ReadingLog {
        entries.iter().map(|(raw, status)| (key(raw), *status)).collect()
    }

    #[test]
    fn yearly_totals_and_streaks() {
        use HabitStatus::*;
        let log = log(&[
            ("2023-12-30", Done),
            ("2023-12-31", Done),
            ("2024-01-01", Done),
            ("2024-01-02", Missed),
            ("2024-01-03", Done),
            ("2024-01-04", Done),
            ("2024-01-05", Done),
        ]);
        let stats = reading_stats(&log, key("2024-01-06"));
        assert_eq!(stats.available_years(2030), vec![2023, 2024]);

        let y2023 = stats.year(2023).unwrap();
        assert_eq!((y2023.days_read, y2023.longest_streak, y2023.percentage), (2, 2, 100));

        let y2024 = stats.year(2024).unwrap();
        assert_eq!((y2024.days_read, y2024.days_missed), (4, 1));
        assert_eq!(y2024.longest_streak, 3, "streaks restart at the year boundary");
        assert_eq!(y2024.percentage, 80);
        assert_eq!(stats.current_streak, 3);
    }

    #[test]
    fn empty_log_falls_back_to_given_year() {
        let stats = reading_stats(&ReadingLog::new(), key("2024-05-05"));
        assert!(stats.years.is_empty());
        assert_eq!(stats.available_years(2024), vec![2024]);
        assert_eq!(stats.current_streak, 0);
    }

    #[test]
    fn future_entries_are_ignored() {
        let log = log(&[("2024-05-06", HabitStatus::Done)]);
        let stats = reading_stats(&log, key("2024-05-05"));
        assert!(stats.years.is_empty());
    }
}
