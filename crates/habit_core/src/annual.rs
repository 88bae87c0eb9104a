use chrono::{Duration, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::instrument;

use crate::aggregate::{aggregate_day, DayAggregate};
use crate::calendar::{year_buckets, Granularity};
use crate::date::DateKey;
use crate::error::Result;
use crate::habit::{DayLog, Habit};
use crate::intensity::{shade_for_day, CellShade};

/// Yesterday stays editable until this local hour.
pub const EDIT_YESTERDAY_UNTIL_HOUR: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualCell {
    pub date: DateKey,
    pub aggregate: DayAggregate,
    pub future: bool,
    pub is_today: bool,
    pub editable: bool,
    pub shade: CellShade,
}

/// Whether statuses for `date` may still be changed at wall-clock time `now`.
pub fn is_editable(date: DateKey, now: NaiveDateTime) -> bool {
    let today = now.date();
    if date.date() == today {
        return true;
    }
    let yesterday = today - Duration::days(1);
    date.date() == yesterday && now.hour() < EDIT_YESTERDAY_UNTIL_HOUR
}

/// One cell per calendar day of `year`, in order.
#[instrument(level = "debug", skip(habits, log))]
pub fn annual_grid(habits: &[Habit], log: &DayLog, year: i32, now: NaiveDateTime) -> Result<Vec<AnnualCell>> {
    let today = DateKey::from(now.date());
    let cells = year_buckets(year, Granularity::Day)?
        .into_iter()
        .map(|bucket| {
            let date = bucket.start;
            let future = date > today;
            let aggregate = if future {
                DayAggregate::default()
            } else {
                aggregate_day(habits, log, date)
            };
            AnnualCell {
                date,
                aggregate,
                future,
                is_today: date == today,
                editable: is_editable(date, now),
                shade: shade_for_day(&aggregate, future),
            }
        })
        .collect();
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::habit::HabitStatus;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).unwrap()
    }

    #[test]
    fn yesterday_is_editable_only_before_noon() {
        let day = key("2024-05-10");
        let morning = FixedClock::at(day, 11, 59).now();
        let afternoon = FixedClock::at(day, 12, 0).now();
        assert!(is_editable(day, afternoon));
        assert!(is_editable(key("2024-05-09"), morning));
        assert!(!is_editable(key("2024-05-09"), afternoon));
        assert!(!is_editable(key("2024-05-08"), morning));
        assert!(!is_editable(key("2024-05-11"), morning));
    }

    #[test]
    fn grid_spans_the_year_and_blanks_the_future() {
        let habits = vec![Habit::new("A", key("2024-01-01"), None).unwrap()];
        let log: DayLog = [
            (key("2024-03-01"), "A", HabitStatus::Done),
            (key("2024-03-03"), "A", HabitStatus::Done),
        ]
        .into_iter()
        .collect();
        let now = FixedClock::on(key("2024-03-02")).now();
        let grid = annual_grid(&habits, &log, 2024, now).unwrap();

        assert_eq!(grid.len(), 366);
        let march_first = &grid[60];
        assert_eq!(march_first.date, key("2024-03-01"));
        assert_eq!(march_first.shade, CellShade::Hue(142));

        let today = &grid[61];
        assert!(today.is_today && today.editable && !today.future);
        assert_eq!(today.shade, CellShade::NoActivity);

        let tomorrow = &grid[62];
        assert!(tomorrow.future);
        assert_eq!(tomorrow.aggregate, DayAggregate::default());
        assert_eq!(tomorrow.shade, CellShade::Future);
    }

    #[test]
    fn days_before_any_habit_stay_uncoloured() {
        let habits = vec![Habit::new("A", key("2024-06-01"), None).unwrap()];
        let now = FixedClock::on(key("2024-12-31")).now();
        let grid = annual_grid(&habits, &DayLog::new(), 2024, now).unwrap();
        assert_eq!(grid[0].aggregate.total, 0);
        assert_eq!(grid[0].shade, CellShade::NoActivity);
    }
}
