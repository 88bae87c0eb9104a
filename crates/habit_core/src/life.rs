//! Life-in-months grid: one cell per calendar month between a birth year and
//! a horizon year, chunked into fixed-width rows.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::aggregate::{aggregate_range, RangeAggregate};
use crate::calendar::{buckets, Granularity};
use crate::date::{check_year, whole_months_between, DateKey};
use crate::error::{CoreError, Result};
use crate::habit::{DayLog, Habit};
use crate::intensity::{shade_for_range, CellShade};

pub const DEFAULT_BIRTH_YEAR: i32 = 2003;
pub const DEFAULT_END_YEAR: i32 = 2088;
pub const DEFAULT_MONTHS_PER_ROW: usize = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeSpan {
    pub birth_year: i32,
    pub end_year: i32,
    pub months_per_row: usize,
}

impl Default for LifeSpan {
    fn default() -> Self {
        Self {
            birth_year: DEFAULT_BIRTH_YEAR,
            end_year: DEFAULT_END_YEAR,
            months_per_row: DEFAULT_MONTHS_PER_ROW,
        }
    }
}

impl LifeSpan {
    pub fn new(birth_year: i32, end_year: i32, months_per_row: usize) -> Result<Self> {
        let span = Self {
            birth_year,
            end_year,
            months_per_row,
        };
        span.validate()?;
        Ok(span)
    }

    pub fn validate(&self) -> Result<()> {
        check_year(self.birth_year)?;
        check_year(self.end_year)?;
        if self.end_year < self.birth_year {
            return Err(CoreError::InvalidLifeSpan(format!(
                "end year {} is before birth year {}",
                self.end_year, self.birth_year
            )));
        }
        if self.months_per_row == 0 {
            return Err(CoreError::InvalidLifeSpan("months per row must be positive".into()));
        }
        Ok(())
    }

    pub fn total_months(&self) -> usize {
        ((self.end_year - self.birth_year + 1) * 12) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifeCell {
    pub month_start: DateKey,
    pub year: i32,
    pub month: u32,
    pub aggregate: RangeAggregate,
    pub future: bool,
    pub pre_tracking: bool,
    pub is_current: bool,
    pub shade: CellShade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifeGrid {
    pub rows: Vec<Vec<LifeCell>>,
    pub months_lived: i32,
    pub current_age: i32,
    pub months_remaining: i32,
    pub total_months: usize,
}

impl LifeGrid {
    pub fn cells(&self) -> impl Iterator<Item = &LifeCell> {
        self.rows.iter().flatten()
    }
}

/// First month with any habit tracking; `today`'s month when there are no habits.
fn first_tracking_month(habits: &[Habit], today: DateKey) -> DateKey {
    habits
        .iter()
        .map(|habit| habit.start_date)
        .fold(today, DateKey::min)
        .month_start()
}

#[instrument(level = "debug", skip(habits, log))]
pub fn life_grid(habits: &[Habit], log: &DayLog, span: LifeSpan, today: DateKey) -> Result<LifeGrid> {
    span.validate()?;
    let first = DateKey::first_of_year(span.birth_year)?;
    let last = DateKey::last_of_year(span.end_year)?;
    let tracking_from = first_tracking_month(habits, today);
    let current_month = today.month_start();

    let cells: Vec<LifeCell> = buckets(first, last, Granularity::Month)?
        .into_iter()
        .map(|bucket| {
            let future = bucket.start > today;
            let pre_tracking = bucket.start < tracking_from;
            let aggregate = if future || pre_tracking {
                RangeAggregate::default()
            } else {
                aggregate_range(habits, log, bucket.days(), today)
            };
            LifeCell {
                month_start: bucket.start,
                year: bucket.start.year(),
                month: bucket.start.month(),
                aggregate,
                future,
                pre_tracking,
                is_current: bucket.start == current_month,
                shade: shade_for_range(&aggregate, future, pre_tracking),
            }
        })
        .collect();

    debug!(months = cells.len(), %tracking_from, "life grid built");
    let months_lived = whole_months_between(first, today).max(0);
    let rows = cells
        .chunks(span.months_per_row)
        .map(<[LifeCell]>::to_vec)
        .collect();

    Ok(LifeGrid {
        rows,
        months_lived,
        current_age: today.year() - span.birth_year,
        months_remaining: ((span.end_year - span.birth_year) * 12 - months_lived).max(0),
        total_months: span.total_months(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitStatus;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).unwrap()
    }

    #[test]
    fn default_span_produces_expected_row_count() {
        let grid = life_grid(&[], &DayLog::new(), LifeSpan::default(), key("2025-06-15")).unwrap();
        assert_eq!(grid.total_months, 86 * 12);
        assert_eq!(grid.rows.len(), (86 * 12 + 28) / 29);
        assert_eq!(grid.rows[0].len(), 29);
        assert_eq!(grid.cells().count(), 86 * 12);
        assert_eq!(grid.current_age, 22);
        assert_eq!(grid.months_lived, 22 * 12 + 5);
        assert_eq!(grid.months_remaining, 85 * 12 - grid.months_lived);
    }

    #[test]
    fn current_month_excludes_days_after_today() {
        let habits = vec![Habit::new("A", key("2025-03-01"), None).unwrap()];
        let log: DayLog = [
            (key("2025-03-01"), "A", HabitStatus::Done),
            (key("2025-03-20"), "A", HabitStatus::Done),
        ]
        .into_iter()
        .collect();
        let span = LifeSpan::new(2025, 2026, 12).unwrap();
        let grid = life_grid(&habits, &log, span, key("2025-03-10")).unwrap();
        let march = &grid.rows[0][2];
        assert!(march.is_current);
        assert!(!march.future);
        assert_eq!(march.aggregate.total, 10);
        assert_eq!(march.aggregate.completed, 1);

        let april = &grid.rows[0][3];
        assert!(april.future);
        assert_eq!(april.shade, CellShade::Future);
    }

    #[test]
    fn months_before_first_habit_are_pre_tracking() {
        let habits = vec![Habit::new("A", key("2025-03-15"), None).unwrap()];
        let span = LifeSpan::new(2025, 2025, 6).unwrap();
        let grid = life_grid(&habits, &DayLog::new(), span, key("2025-05-01")).unwrap();
        let cells: Vec<&LifeCell> = grid.cells().collect();
        assert!(cells[1].pre_tracking);
        assert_eq!(cells[1].shade, CellShade::PreTracking);
        assert!(!cells[2].pre_tracking);
        // unmarked slots still count as tracked, so the month is coloured red
        assert_eq!(cells[2].aggregate.total, 17);
        assert_eq!(cells[2].shade, CellShade::Hue(0));
        assert_eq!(grid.rows.len(), 2);
    }

    #[test]
    fn rejects_inverted_or_degenerate_spans() {
        assert!(matches!(LifeSpan::new(2000, 1999, 12), Err(CoreError::InvalidLifeSpan(_))));
        assert!(matches!(LifeSpan::new(2000, 2001, 0), Err(CoreError::InvalidLifeSpan(_))));
        assert_eq!(LifeSpan::new(0, 2001, 12), Err(CoreError::YearOutOfRange(0)));
    }
}
