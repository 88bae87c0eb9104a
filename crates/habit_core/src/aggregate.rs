//! Validity filtering and completion counting shared by every calendar view.

use serde::Serialize;

use crate::date::DateKey;
use crate::habit::{DayLog, Habit, HabitStatus};

/// Counts for a single day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DayAggregate {
    pub completed: usize,
    pub missed: usize,
    pub total: usize,
    pub ratio: f64,
}

impl DayAggregate {
    pub fn marked(&self) -> usize {
        self.completed + self.missed
    }

    pub fn unmarked(&self) -> usize {
        self.total - self.marked()
    }

    /// Something was recorded for at least one valid habit.
    pub fn has_activity(&self) -> bool {
        self.total > 0 && self.marked() > 0
    }
}

/// Counts summed over a run of days. `total` is valid-habit slots, not days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RangeAggregate {
    pub completed: usize,
    pub missed: usize,
    pub total: usize,
    pub ratio: f64,
}

impl RangeAggregate {
    pub fn combine(self, other: RangeAggregate) -> RangeAggregate {
        let completed = self.completed + other.completed;
        let total = self.total + other.total;
        RangeAggregate {
            completed,
            missed: self.missed + other.missed,
            total,
            ratio: ratio(completed, total),
        }
    }

    pub fn has_activity(&self) -> bool {
        self.total > 0
    }
}

impl From<DayAggregate> for RangeAggregate {
    fn from(day: DayAggregate) -> Self {
        RangeAggregate {
            completed: day.completed,
            missed: day.missed,
            total: day.total,
            ratio: day.ratio,
        }
    }
}

/// `completed / total`, defined as zero for an empty denominator.
pub fn ratio(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

/// Ratio expressed as a whole percentage, rounded half up.
pub fn percent(completed: usize, total: usize) -> u32 {
    (ratio(completed, total) * 100.0).round() as u32
}

/// Habits whose validity window contains `date`, in input order.
pub fn valid_habits(habits: &[Habit], date: DateKey) -> Vec<&Habit> {
    habits.iter().filter(|habit| habit.is_valid_on(date)).collect()
}

pub fn aggregate_day(habits: &[Habit], log: &DayLog, date: DateKey) -> DayAggregate {
    let day = log.day(date);
    let mut aggregate = DayAggregate::default();
    for habit in habits.iter().filter(|habit| habit.is_valid_on(date)) {
        aggregate.total += 1;
        match day.and_then(|entries| entries.get(&habit.id)) {
            Some(HabitStatus::Done) => aggregate.completed += 1,
            Some(HabitStatus::Missed) => aggregate.missed += 1,
            None => {}
        }
    }
    aggregate.ratio = ratio(aggregate.completed, aggregate.total);
    aggregate
}

/// Sums day aggregates over `dates`, skipping every date after `today`.
pub fn aggregate_range<I>(habits: &[Habit], log: &DayLog, dates: I, today: DateKey) -> RangeAggregate
where
    I: IntoIterator<Item = DateKey>,
{
    dates
        .into_iter()
        .filter(|date| *date <= today)
        .map(|date| RangeAggregate::from(aggregate_day(habits, log, date)))
        .fold(RangeAggregate::default(), RangeAggregate::combine)
}
