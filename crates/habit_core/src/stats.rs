//! Per-habit and dashboard-wide statistics.

use chrono::Weekday;
use serde::Serialize;

use crate::aggregate::{aggregate_day, aggregate_range, percent, RangeAggregate};
use crate::calendar::{bucket_of, buckets, Bucket, Granularity};
use crate::date::{days_inclusive, DateKey};
use crate::error::Result;
use crate::habit::{DayLog, Habit, HabitId, HabitStatus};

/// Habits at or above this completion rate are not flagged as critical.
pub const CRITICAL_RATE_THRESHOLD: u32 = 85;
pub const MAX_CRITICAL_HABITS: usize = 3;

const TREND_DAYS: i64 = 30;
const TREND_WEEKS: i64 = 12;
const TREND_MONTHS: i32 = 12;

/// Periods compared against their predecessor on the stats page.
pub const COMPARED_PERIODS: [Granularity; 3] = [Granularity::Week, Granularity::Month, Granularity::Year];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayRate {
    pub weekday: String,
    pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitStat {
    pub habit_id: HabitId,
    pub title: String,
    pub color: Option<String>,
    pub completed: usize,
    pub missed: usize,
    pub tracked_days: usize,
    pub completion_rate: u32,
    pub current_streak: usize,
    pub best_streak: usize,
    pub worst_day: Option<WeekdayRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_active_days: usize,
    pub global_success_rate: u32,
    pub best_streak: usize,
    pub worst_day: Option<WeekdayRate>,
    /// Monday first; weekdays without any tracked slot read 0.
    pub weekday_rates: [WeekdayRate; 7],
    pub tracked: RangeAggregate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub bucket: Bucket,
    pub aggregate: RangeAggregate,
    pub rate: u32,
}

/// The calendar unit containing today next to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub granularity: Granularity,
    pub current: TrendPoint,
    pub previous: TrendPoint,
    /// Percentage points gained (positive) or lost since the previous period.
    pub change: i32,
}

#[derive(Default, Clone, Copy)]
struct Tally {
    completed: usize,
    total: usize,
}

/// Lowest-rate weekday among those with any tracked slot; Monday wins ties.
fn worst_weekday(tallies: &[Tally; 7]) -> Option<WeekdayRate> {
    WEEKDAYS
        .iter()
        .zip(tallies)
        .filter(|(_, tally)| tally.total > 0)
        .map(|(day, tally)| (*day, percent(tally.completed, tally.total)))
        .fold(None, |worst: Option<(Weekday, u32)>, (day, rate)| match worst {
            Some((_, lowest)) if lowest <= rate => worst,
            _ => Some((day, rate)),
        })
        .map(|(day, rate)| WeekdayRate {
            weekday: weekday_name(day).to_string(),
            rate,
        })
}

fn weekday_rates(tallies: &[Tally; 7]) -> [WeekdayRate; 7] {
    std::array::from_fn(|idx| WeekdayRate {
        weekday: weekday_name(WEEKDAYS[idx]).to_string(),
        rate: percent(tallies[idx].completed, tallies[idx].total),
    })
}

fn tracked_window(habit: &Habit, today: DateKey) -> Option<(DateKey, DateKey)> {
    let last = habit.end_date.map_or(today, |end| end.min(today));
    (habit.start_date <= last).then_some((habit.start_date, last))
}

pub fn habit_stat(habit: &Habit, log: &DayLog, today: DateKey) -> HabitStat {
    let mut stat = HabitStat {
        habit_id: habit.id.clone(),
        title: habit.title.clone(),
        color: habit.color.clone(),
        completed: 0,
        missed: 0,
        tracked_days: 0,
        completion_rate: 0,
        current_streak: 0,
        best_streak: 0,
        worst_day: None,
    };
    let Some((first, last)) = tracked_window(habit, today) else {
        return stat;
    };

    let mut weekdays = [Tally::default(); 7];
    let mut run = 0;
    for date in days_inclusive(first, last) {
        let status = log.status(date, &habit.id);
        let tally = &mut weekdays[date.weekday().num_days_from_monday() as usize];
        stat.tracked_days += 1;
        tally.total += 1;
        match status {
            Some(HabitStatus::Done) => {
                stat.completed += 1;
                tally.completed += 1;
                run += 1;
                stat.best_streak = stat.best_streak.max(run);
            }
            Some(HabitStatus::Missed) => {
                stat.missed += 1;
                run = 0;
            }
            None => run = 0,
        }
    }

    stat.completion_rate = percent(stat.completed, stat.tracked_days);
    stat.current_streak = current_streak(habit, log, today);
    stat.worst_day = worst_weekday(&weekdays);
    stat
}

/// Done days counted back from today. An unmarked today does not break
/// the streak since it can still be completed.
fn current_streak(habit: &Habit, log: &DayLog, today: DateKey) -> usize {
    let mut cursor = match log.status(today, &habit.id) {
        Some(_) => Some(today),
        None => today.pred(),
    };
    let mut streak = 0;
    while let Some(date) = cursor.filter(|date| habit.is_valid_on(*date)) {
        if log.status(date, &habit.id) != Some(HabitStatus::Done) {
            break;
        }
        streak += 1;
        cursor = date.pred();
    }
    streak
}

pub fn habit_stats(habits: &[Habit], log: &DayLog, today: DateKey) -> Vec<HabitStat> {
    habits.iter().map(|habit| habit_stat(habit, log, today)).collect()
}

pub fn overview(habits: &[Habit], log: &DayLog, today: DateKey) -> Overview {
    let stats = habit_stats(habits, log, today);
    let best_streak = stats.iter().map(|stat| stat.best_streak).max().unwrap_or(0);

    let mut tracked = RangeAggregate::default();
    let mut weekdays = [Tally::default(); 7];
    if let Some(first) = habits.iter().map(|habit| habit.start_date).min() {
        for date in days_inclusive(first, today) {
            let day = aggregate_day(habits, log, date);
            let tally = &mut weekdays[date.weekday().num_days_from_monday() as usize];
            tally.completed += day.completed;
            tally.total += day.total;
            tracked = tracked.combine(day.into());
        }
    }

    let total_active_days = log
        .iter()
        .filter(|(date, entries)| *date <= today && !entries.is_empty())
        .count();

    Overview {
        total_active_days,
        global_success_rate: percent(tracked.completed, tracked.total),
        best_streak,
        worst_day: worst_weekday(&weekdays),
        weekday_rates: weekday_rates(&weekdays),
        tracked,
    }
}

fn trend_point(habits: &[Habit], log: &DayLog, bucket: Bucket, today: DateKey) -> TrendPoint {
    let aggregate = aggregate_range(habits, log, bucket.days(), today);
    TrendPoint {
        bucket,
        aggregate,
        rate: percent(aggregate.completed, aggregate.total),
    }
}

/// Completion per `granularity` bucket over `from..=to`. Days after `today`
/// add nothing, so a partly elapsed bucket is rated on its past days only.
pub fn trend(
    habits: &[Habit],
    log: &DayLog,
    from: DateKey,
    to: DateKey,
    granularity: Granularity,
    today: DateKey,
) -> Result<Vec<TrendPoint>> {
    Ok(buckets(from, to, granularity)?
        .into_iter()
        .map(|bucket| trend_point(habits, log, bucket, today))
        .collect())
}

/// Default lookback for a trend ending today: 30 days, 12 weeks, 12 months,
/// or every year since tracking began. Never starts before the earliest habit.
/// `None` when no habit has started yet.
pub fn trend_window(habits: &[Habit], granularity: Granularity, today: DateKey) -> Option<(DateKey, DateKey)> {
    let earliest = habits.iter().map(|habit| habit.start_date).min()?;
    if earliest > today {
        return None;
    }
    let lookback = match granularity {
        Granularity::Day => today.add_days(1 - TREND_DAYS),
        Granularity::Week => today.week_start().add_days(-7 * (TREND_WEEKS - 1)),
        Granularity::Month => today.month_start().add_months(1 - TREND_MONTHS),
        Granularity::Year => None,
    };
    let from = lookback.map_or(earliest, |start| start.max(earliest));
    Some((from, today))
}

pub fn compare_period(
    habits: &[Habit],
    log: &DayLog,
    granularity: Granularity,
    today: DateKey,
) -> Option<PeriodComparison> {
    let current = bucket_of(today, granularity);
    let previous = bucket_of(current.anchor.pred()?, granularity);
    let current = trend_point(habits, log, current, today);
    let previous = trend_point(habits, log, previous, today);
    Some(PeriodComparison {
        granularity,
        current,
        previous,
        change: current.rate as i32 - previous.rate as i32,
    })
}

pub fn period_comparisons(habits: &[Habit], log: &DayLog, today: DateKey) -> Vec<PeriodComparison> {
    COMPARED_PERIODS
        .iter()
        .filter_map(|granularity| compare_period(habits, log, *granularity, today))
        .collect()
}

/// Habits needing attention: some progress but below the threshold, worst first.
pub fn critical_habits(stats: &[HabitStat]) -> Vec<&HabitStat> {
    let mut critical: Vec<&HabitStat> = stats
        .iter()
        .filter(|stat| stat.completion_rate > 0 && stat.completion_rate < CRITICAL_RATE_THRESHOLD)
        .collect();
    critical.sort_by_key(|stat| stat.completion_rate);
    critical.truncate(MAX_CRITICAL_HABITS);
    critical
}

#[cfg(test)]
mod tests {
    use super::*;
    use HabitStatus::*;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).unwrap()
    }

    fn habit(id: &str, start: &str) -> Habit {
        Habit::new(id, key(start), None).unwrap().with_title(id.to_uppercase())
    }

    #[test]
    fn counts_rates_and_streaks_for_one_habit() {
        // 2024-01-01 is a Monday.
        let habits = vec![habit("run", "2024-01-01")];
        let log: DayLog = [
            (key("2024-01-01"), "run", Done),
            (key("2024-01-02"), "run", Done),
            (key("2024-01-03"), "run", Done),
            (key("2024-01-04"), "run", Missed),
            (key("2024-01-06"), "run", Done),
            (key("2024-01-07"), "run", Done),
        ]
        .into_iter()
        .collect();
        let stat = habit_stat(&habits[0], &log, key("2024-01-08"));
        assert_eq!(stat.tracked_days, 8);
        assert_eq!((stat.completed, stat.missed), (5, 1));
        assert_eq!(stat.completion_rate, 63);
        assert_eq!(stat.best_streak, 3);
        assert_eq!(stat.current_streak, 2, "unmarked today keeps yesterday's run");
        assert_eq!(
            stat.worst_day,
            Some(WeekdayRate {
                weekday: "Thursday".into(),
                rate: 0
            })
        );
    }

    #[test]
    fn habit_starting_after_today_is_untracked() {
        let stat = habit_stat(&habit("later", "2024-02-01"), &DayLog::new(), key("2024-01-15"));
        assert_eq!(stat.tracked_days, 0);
        assert_eq!(stat.completion_rate, 0);
        assert_eq!(stat.worst_day, None);
    }

    #[test]
    fn overview_weights_all_slots() {
        let habits = vec![habit("a", "2024-01-01"), habit("b", "2024-01-02")];
        let log: DayLog = [
            (key("2024-01-01"), "a", Done),
            (key("2024-01-02"), "a", Done),
            (key("2024-01-02"), "b", Missed),
            (key("2024-01-05"), "a", Done),
        ]
        .into_iter()
        .collect();
        let overview = overview(&habits, &log, key("2024-01-03"));
        assert_eq!(overview.total_active_days, 2);
        assert_eq!(overview.tracked.total, 5);
        assert_eq!(overview.tracked.completed, 2);
        assert_eq!(overview.global_success_rate, 40);
        assert_eq!(overview.best_streak, 2);
        // 2024-01-01 Monday: one slot, done. Tuesday: two slots, one done.
        assert_eq!(overview.weekday_rates[0].rate, 100);
        assert_eq!(overview.weekday_rates[1].rate, 50);
        assert_eq!(overview.weekday_rates[2].rate, 0);
        assert_eq!(overview.weekday_rates[6].weekday, "Sunday");
    }

    #[test]
    fn trend_rates_each_bucket_on_elapsed_days() {
        let habits = vec![habit("a", "2024-01-01")];
        let log: DayLog = [
            (key("2024-01-01"), "a", Done),
            (key("2024-01-02"), "a", Done),
            (key("2024-01-08"), "a", Done),
            (key("2024-01-09"), "a", Missed),
        ]
        .into_iter()
        .collect();
        let (from, to, today) = (key("2024-01-01"), key("2024-01-14"), key("2024-01-10"));
        let points = trend(&habits, &log, from, to, Granularity::Week, today).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].aggregate.completed, points[0].aggregate.total), (2, 7));
        assert_eq!(points[0].rate, 29);
        assert_eq!((points[1].aggregate.completed, points[1].aggregate.total), (1, 3));
        assert_eq!(points[1].rate, 33);
    }

    #[test]
    fn trend_window_starts_at_the_earliest_habit() {
        let habits = vec![habit("a", "2023-06-15")];
        let today = key("2024-03-20");
        assert_eq!(
            trend_window(&habits, Granularity::Month, today),
            Some((key("2023-06-15"), today))
        );
        assert_eq!(
            trend_window(&habits, Granularity::Day, today),
            Some((key("2024-02-20"), today))
        );
        assert_eq!(
            trend_window(&habits, Granularity::Week, today),
            Some((key("2024-01-01"), today))
        );
        assert_eq!(trend_window(&habits, Granularity::Year, today), Some((key("2023-06-15"), today)));
        assert_eq!(trend_window(&[], Granularity::Week, today), None);
        assert_eq!(trend_window(&habits, Granularity::Week, key("2023-01-01")), None);
    }

    #[test]
    fn compares_current_week_with_the_previous_one() {
        let habits = vec![habit("a", "2024-01-01")];
        let mut log = DayLog::new();
        for day in ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05", "2024-01-06", "2024-01-07"] {
            log.set(key(day), "a", Done);
        }
        log.set(key("2024-01-08"), "a", Missed);
        log.set(key("2024-01-09"), "a", Done);

        let week = compare_period(&habits, &log, Granularity::Week, key("2024-01-09")).unwrap();
        assert_eq!(week.previous.bucket.start, key("2024-01-01"));
        assert_eq!(week.previous.rate, 100);
        assert_eq!(week.current.rate, 50);
        assert_eq!(week.change, -50);

        let all = period_comparisons(&habits, &log, key("2024-01-09"));
        let granularities: Vec<Granularity> = all.iter().map(|c| c.granularity).collect();
        assert_eq!(granularities, COMPARED_PERIODS.to_vec());
    }

    #[test]
    fn critical_habits_are_sorted_and_capped() {
        let stat = |id: &str, rate: u32| HabitStat {
            habit_id: id.into(),
            title: id.into(),
            color: None,
            completed: 0,
            missed: 0,
            tracked_days: 0,
            completion_rate: rate,
            current_streak: 0,
            best_streak: 0,
            worst_day: None,
        };
        let stats = vec![
            stat("a", 0),
            stat("b", 84),
            stat("c", 85),
            stat("d", 10),
            stat("e", 50),
            stat("f", 30),
        ];
        let ids: Vec<&str> = critical_habits(&stats).iter().map(|s| s.habit_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "f", "e"]);
    }
}
