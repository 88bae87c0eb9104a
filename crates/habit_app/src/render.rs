//! Plain-text rendering of the dashboard views.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use chrono::Month;
use habit_core::annual::AnnualCell;
use habit_core::goals::MacroGoalStats;
use habit_core::heatmap::Heatmap;
use habit_core::intensity::{shade_for_day, MAX_HUE};
use habit_core::life::LifeGrid;
use habit_core::reading::ReadingYear;
use habit_core::stats::{weekday_name, PeriodComparison};
use habit_core::{CellShade, DayAggregate, HabitStatus};
use habit_data::service::{DayDetails, StatsReport, Trend};
use habit_data::ImportReport;

type Rendered = Result<String, fmt::Error>;

/// Glyphs from an all-missed cell up to a fully completed one.
const LEVELS: [char; 5] = ['▁', '▂', '▄', '▆', '█'];

pub fn shade_glyph(shade: CellShade) -> char {
    match shade {
        CellShade::Future => ' ',
        CellShade::PreTracking => '-',
        CellShade::NoActivity => '·',
        CellShade::Hue(hue) => {
            let idx = usize::from(hue.min(MAX_HUE)) * (LEVELS.len() - 1) / usize::from(MAX_HUE);
            LEVELS[idx]
        }
    }
}

fn month_abbrev(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .map_or("???", |month| &month.name()[..3])
}

fn status_glyph(status: Option<HabitStatus>) -> char {
    match status {
        Some(HabitStatus::Done) => 'x',
        Some(HabitStatus::Missed) => '-',
        None => ' ',
    }
}

/// One line per month, one glyph per day.
pub fn annual(cells: &[AnnualCell]) -> Rendered {
    let mut out = String::new();
    let mut current_month = None;
    for cell in cells {
        if current_month != Some(cell.date.month()) {
            if current_month.is_some() {
                out.push('\n');
            }
            current_month = Some(cell.date.month());
            write!(out, "{} ", month_abbrev(cell.date.month()))?;
        }
        out.push(if cell.is_today { '@' } else { shade_glyph(cell.shade) });
    }
    if !cells.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

pub fn life(grid: &LifeGrid) -> Rendered {
    let mut out = String::new();
    writeln!(
        out,
        "age {} · {} months lived · {} remaining · {} total",
        grid.current_age, grid.months_lived, grid.months_remaining, grid.total_months
    )?;
    for row in &grid.rows {
        write!(out, "{} ", row.first().map_or(0, |cell| cell.year))?;
        for cell in row {
            out.push(if cell.is_current { '@' } else { shade_glyph(cell.shade) });
        }
        out.push('\n');
    }
    Ok(out)
}

fn weekday_from_index(index: usize) -> chrono::Weekday {
    use chrono::Weekday::*;
    [Mon, Tue, Wed, Thu, Fri, Sat, Sun][index % 7]
}

fn heatmap_rows<T>(map: &Heatmap<T>, glyph: impl Fn(&T) -> char) -> Rendered {
    let mut out = String::new();
    let mut header = vec![' '; map.weeks.len()];
    for label in &map.month_labels {
        for (offset, ch) in month_abbrev(label.month).chars().enumerate() {
            if let Some(slot) = header.get_mut(label.week_index + offset) {
                *slot = ch;
            }
        }
    }
    writeln!(out, "{} {}", map.year, header.into_iter().collect::<String>().trim_end())?;
    for weekday in 0..7 {
        let name = &weekday_name(weekday_from_index(weekday))[..3];
        write!(out, "{name}  ")?;
        for week in &map.weeks {
            let cell = &week[weekday];
            let ch = match &cell.value {
                Some(value) => glyph(value),
                None if cell.in_year && !cell.future => '·',
                None => ' ',
            };
            out.push(ch);
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn habit_heatmap(map: &Heatmap<DayAggregate>) -> Rendered {
    heatmap_rows(map, |day| shade_glyph(shade_for_day(day, false)))
}

pub fn reading_heatmap(map: &Heatmap<HabitStatus>, year: Option<&ReadingYear>) -> Rendered {
    let mut out = heatmap_rows(map, |status| match status {
        HabitStatus::Done => '█',
        HabitStatus::Missed => '▁',
    })?;
    if let Some(year) = year {
        writeln!(
            out,
            "read {} · missed {} · longest streak {} · {}%",
            year.days_read, year.days_missed, year.longest_streak, year.percentage
        )?;
    }
    Ok(out)
}

pub fn day(details: &DayDetails) -> Rendered {
    let mut out = String::new();
    let lock = if details.editable { "" } else { " (read-only)" };
    writeln!(
        out,
        "{}{lock}: {}/{} done, {} missed",
        details.date, details.aggregate.completed, details.aggregate.total, details.aggregate.missed
    )?;
    for entry in &details.entries {
        let title = if entry.title.is_empty() { &entry.habit_id } else { &entry.title };
        writeln!(out, "[{}] {title} ({})", status_glyph(entry.status), entry.habit_id)?;
    }
    Ok(out)
}

fn comparison_line(out: &mut String, comparison: &PeriodComparison) -> fmt::Result {
    writeln!(
        out,
        "  {:<6} {:>3}% (from {}) vs {:>3}% (from {})  {:+}",
        comparison.granularity,
        comparison.current.rate,
        comparison.current.bucket.start,
        comparison.previous.rate,
        comparison.previous.bucket.start,
        comparison.change
    )
}

fn trend_lines(out: &mut String, trend: &Trend) -> fmt::Result {
    writeln!(out, "\ntrend by {}", trend.granularity)?;
    if trend.points.is_empty() {
        return writeln!(out, "  nothing tracked yet");
    }
    for point in &trend.points {
        let bar: String = std::iter::repeat(LEVELS[4]).take((point.rate / 5) as usize).collect();
        writeln!(
            out,
            "  {}..{} {:>3}% {bar}",
            point.bucket.start, point.bucket.end, point.rate
        )?;
    }
    Ok(())
}

pub fn stats(report: &StatsReport) -> Rendered {
    let mut out = String::new();
    let overview = &report.overview;
    writeln!(out, "active days      {}", overview.total_active_days)?;
    writeln!(out, "success rate     {}%", overview.global_success_rate)?;
    writeln!(out, "best streak      {}", overview.best_streak)?;
    if let Some(worst) = &overview.worst_day {
        writeln!(out, "weakest weekday  {} ({}%)", worst.weekday, worst.rate)?;
    }
    let by_weekday: Vec<String> = overview
        .weekday_rates
        .iter()
        .map(|day| format!("{} {}%", &day.weekday[..3], day.rate))
        .collect();
    writeln!(out, "by weekday       {}", by_weekday.join("  "))?;

    if !report.comparisons.is_empty() {
        out.push_str("\nthis period vs last\n");
        for comparison in &report.comparisons {
            comparison_line(&mut out, comparison)?;
        }
    }

    out.push('\n');
    for habit in &report.habits {
        writeln!(
            out,
            "{:<20} {:>3}%  done {:>4}  missed {:>4}  streak {:>3} (best {})",
            habit.title, habit.completion_rate, habit.completed, habit.missed, habit.current_streak, habit.best_streak
        )?;
    }
    if !report.critical.is_empty() {
        out.push_str("\nneeds attention\n");
        for habit in &report.critical {
            let worst = habit
                .worst_day
                .as_ref()
                .map(|day| format!(", weakest on {}", day.weekday))
                .unwrap_or_default();
            writeln!(out, "  {} at {}%{worst}", habit.title, habit.completion_rate)?;
        }
    }
    if let Some(trend) = &report.trend {
        trend_lines(&mut out, trend)?;
    }
    Ok(out)
}

pub fn goals(stats: &MacroGoalStats) -> Rendered {
    let mut out = String::new();
    writeln!(
        out,
        "{}: {}/{} goals completed ({}%)",
        stats.year, stats.completed, stats.total, stats.completion_rate
    )?;
    for (kind, count) in &stats.by_kind {
        writeln!(out, "  {kind:?}: {count}")?;
    }
    for month in stats.monthly.iter().filter(|month| month.total > 0) {
        writeln!(
            out,
            "  {} {}/{} ({}%)",
            month_abbrev(month.month),
            month.completed,
            month.total,
            month.rate
        )?;
    }
    for share in &stats.categories {
        writeln!(out, "  {}: {}", share.label, share.count)?;
    }
    Ok(out)
}

/// Colour → category name, one per line.
pub fn labels(labels: &BTreeMap<String, String>) -> Rendered {
    let mut out = String::new();
    for (color, label) in labels {
        writeln!(out, "{color:<10} {label}")?;
    }
    Ok(out)
}

pub fn import_report(report: &ImportReport) -> Rendered {
    let mut out = String::new();
    writeln!(out, "processed {} records", report.total_processed)?;
    for (table, counts) in &report.by_table {
        writeln!(
            out,
            "  {table:<24} +{} ~{} ={}",
            counts.inserted, counts.updated, counts.unchanged
        )?;
        for error in &counts.errors {
            writeln!(out, "    error: {error}")?;
        }
    }
    if !report.settings_restored.is_empty() {
        writeln!(out, "settings restored: {}", report.settings_restored.join(", "))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::annual::annual_grid;
    use habit_core::clock::Clock;
    use habit_core::heatmap::heatmap_weeks;
    use habit_core::{DateKey, DayLog, FixedClock, Habit};

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).unwrap()
    }

    #[test]
    fn glyph_levels_span_the_hue_range() {
        assert_eq!(shade_glyph(CellShade::Hue(0)), '▁');
        assert_eq!(shade_glyph(CellShade::Hue(MAX_HUE)), '█');
        assert_eq!(shade_glyph(CellShade::Hue(71)), '▄');
        assert_eq!(shade_glyph(CellShade::Future), ' ');
    }

    #[test]
    fn annual_has_a_line_per_month() {
        let habits = vec![Habit::new("a", key("2024-01-01"), None).unwrap()];
        let log: DayLog = [(key("2024-01-01"), "a", HabitStatus::Done)].into_iter().collect();
        let now = FixedClock::on(key("2024-01-02")).now();
        let text = annual(&annual_grid(&habits, &log, 2024, now).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 12);
        assert!(lines[0].starts_with("Jan █@"));
        assert_eq!(lines[1].chars().count(), 4 + 29);
    }

    #[test]
    fn heatmap_has_seven_weekday_rows() {
        let map = heatmap_weeks(2025, key("2025-12-31"), |_| Some(HabitStatus::Done)).unwrap();
        let text = reading_heatmap(&map, None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("2025 Jan"));
        assert!(lines[1].starts_with("Mon  "));
        assert!(lines[7].starts_with("Sun  "));
    }

    #[test]
    fn labels_are_listed_by_colour() {
        let map: BTreeMap<String, String> = [("blue", "Work"), ("red", "Health")]
            .into_iter()
            .map(|(color, label)| (color.to_string(), label.to_string()))
            .collect();
        let text = labels(&map).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["blue       Work", "red        Health"]);
    }
}
