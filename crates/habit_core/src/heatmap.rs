//! Monday-aligned week columns for a single year.

use serde::Serialize;

use crate::aggregate::{aggregate_day, DayAggregate};
use crate::date::{days_inclusive, DateKey};
use crate::error::{CoreError, Result};
use crate::habit::{DayLog, Habit, HabitStatus};
use crate::reading::ReadingLog;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell<T> {
    pub date: DateKey,
    pub in_year: bool,
    pub future: bool,
    pub value: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthLabel {
    pub month: u32,
    pub week_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap<T> {
    pub year: i32,
    pub weeks: Vec<[HeatmapCell<T>; 7]>,
    pub month_labels: Vec<MonthLabel>,
}

/// Builds the week columns for `year`. `cell_fn` is only consulted for
/// in-year days that are not after `today`.
///
/// Padding days before Jan 1 and after Dec 31 must themselves be valid keys,
/// so a year whose last week runs past `MAX_YEAR` is rejected.
pub fn heatmap_weeks<T, F>(year: i32, today: DateKey, mut cell_fn: F) -> Result<Heatmap<T>>
where
    F: FnMut(DateKey) -> Option<T>,
{
    let first = DateKey::first_of_year(year)?;
    let last = DateKey::last_of_year(year)?;
    let trailing = 6 - i64::from(last.weekday().num_days_from_monday());
    let padded_end = last.add_days(trailing).ok_or(CoreError::YearOutOfRange(year))?;

    let days: Vec<DateKey> = days_inclusive(first.week_start(), padded_end).collect();
    let mut weeks = Vec::with_capacity(days.len() / 7);
    for chunk in days.chunks_exact(7) {
        let week: [HeatmapCell<T>; 7] = std::array::from_fn(|offset| {
            let date = chunk[offset];
            let in_year = date.year() == year;
            let future = date > today;
            let value = if in_year && !future { cell_fn(date) } else { None };
            HeatmapCell {
                date,
                in_year,
                future,
                value,
            }
        });
        weeks.push(week);
    }

    let month_labels = month_labels(&weeks);
    Ok(Heatmap {
        year,
        weeks,
        month_labels,
    })
}

fn month_labels<T>(weeks: &[[HeatmapCell<T>; 7]]) -> Vec<MonthLabel> {
    let mut labels = Vec::new();
    let mut last_month = None;
    for (week_index, week) in weeks.iter().enumerate() {
        if let Some(cell) = week.iter().find(|cell| cell.in_year) {
            let month = cell.date.month();
            if last_month != Some(month) {
                labels.push(MonthLabel { month, week_index });
                last_month = Some(month);
            }
        }
    }
    labels
}

pub fn habit_heatmap(habits: &[Habit], log: &DayLog, year: i32, today: DateKey) -> Result<Heatmap<DayAggregate>> {
    heatmap_weeks(year, today, |date| Some(aggregate_day(habits, log, date)))
}

pub fn reading_heatmap(log: &ReadingLog, year: i32, today: DateKey) -> Result<Heatmap<HabitStatus>> {
    heatmap_weeks(year, today, |date| log.status(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).unwrap()
    }

    #[test]
    fn every_column_is_a_monday_aligned_week() {
        for year in [2023, 2024, 2025, 2026] {
            let map = heatmap_weeks(year, key("2100-01-01"), |_| Some(())).unwrap();
            for week in &map.weeks {
                assert_eq!(week[0].date.weekday(), Weekday::Mon);
                assert_eq!(week[6].date.weekday(), Weekday::Sun);
            }
            let in_year = map.weeks.iter().flatten().filter(|cell| cell.in_year).count();
            assert_eq!(in_year, if year == 2024 { 366 } else { 365 });
            assert!(map.weeks.last().unwrap().iter().any(|c| c.date == key(&format!("{year}-12-31"))));
        }
    }

    #[test]
    fn padding_and_future_cells_carry_no_value() {
        // 2025-01-01 is a Wednesday: Monday and Tuesday belong to 2024.
        let map = heatmap_weeks(2025, key("2025-01-03"), |_| Some(1u8)).unwrap();
        let first = &map.weeks[0];
        assert!(!first[0].in_year && first[0].value.is_none());
        assert_eq!(first[2].value, Some(1));
        assert_eq!(first[4].value, Some(1));
        assert!(first[5].future && first[5].value.is_none());
    }

    #[test]
    fn month_labels_follow_first_in_year_day() {
        let map = heatmap_weeks(2025, key("2100-01-01"), |_| Some(())).unwrap();
        assert_eq!(map.month_labels.len(), 12);
        assert_eq!(map.month_labels[0], MonthLabel { month: 1, week_index: 0 });
        // Week starting Monday 2025-01-27 opens on a January day, so February's
        // label goes on the next column.
        assert_eq!(map.month_labels[1], MonthLabel { month: 2, week_index: 5 });
    }

    #[test]
    fn padding_dates_stay_parseable_at_the_top_of_the_range() {
        let map = heatmap_weeks(9998, key("2000-01-01"), |_| Some(())).unwrap();
        let tail = map.weeks.last().unwrap();
        assert_eq!(tail[6].date, key("9999-01-03"));
        for cell in map.weeks.iter().flatten() {
            assert_eq!(DateKey::parse(&cell.date.to_string()), Ok(cell.date));
        }
        assert_eq!(
            heatmap_weeks(9999, key("2000-01-01"), |_| Some(())),
            Err(CoreError::YearOutOfRange(9999))
        );
    }

    #[test]
    fn reading_heatmap_reads_statuses() {
        let mut log = ReadingLog::new();
        log.set(key("2024-02-05"), HabitStatus::Missed);
        let map = reading_heatmap(&log, 2024, key("2024-12-31")).unwrap();
        let cell = map
            .weeks
            .iter()
            .flatten()
            .find(|cell| cell.date == key("2024-02-05"))
            .unwrap();
        assert_eq!(cell.value, Some(HabitStatus::Missed));
    }
}
