//! Record → domain conversion. Bad records are logged and skipped so one
//! malformed row never hides the rest of a table.

use std::collections::BTreeMap;

use habit_core::goals::{CategoryLabels, MacroGoal};
use habit_core::{DateKey, DayLog, Habit, HabitStatus, ReadingLog};
use serde_json::Value;
use tracing::warn;

use crate::store::{record_key, Record};

fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Accepts plain `YYYY-MM-DD` values as well as timestamps that start with one.
pub fn date_field(record: &Record, field: &str) -> Option<DateKey> {
    let raw = str_field(record, field)?;
    let day = match raw.char_indices().nth(10) {
        Some((idx, 'T' | ' ')) => &raw[..idx],
        _ => raw,
    };
    DateKey::parse(day).ok()
}

pub fn habit_from_record(record: &Record) -> Option<Habit> {
    let id = record_key(record, "id")?;
    let start = date_field(record, "start_date")?;
    let end = match record.get("end_date") {
        None | Some(Value::Null) => None,
        Some(_) => Some(date_field(record, "end_date")?),
    };
    let mut habit = Habit::new(id, start, end).ok()?;
    if let Some(title) = str_field(record, "title") {
        habit = habit.with_title(title);
    }
    if let Some(color) = str_field(record, "color") {
        habit = habit.with_color(color);
    }
    Some(habit)
}

pub fn load_habits(records: &[Record]) -> Vec<Habit> {
    let mut habits = Vec::with_capacity(records.len());
    for record in records {
        match habit_from_record(record) {
            Some(habit) => habits.push(habit),
            None => warn!(id = ?record.get("id"), "skipping malformed habit record"),
        }
    }
    habits
}

fn status_field(record: &Record) -> Option<HabitStatus> {
    str_field(record, "status")?.parse().ok()
}

pub fn load_day_log(records: &[Record]) -> DayLog {
    let mut log = DayLog::new();
    let mut skipped = 0usize;
    for record in records {
        let entry = str_field(record, "goal_id")
            .zip(date_field(record, "date"))
            .zip(status_field(record));
        match entry {
            Some(((goal_id, date), status)) => log.set(date, goal_id, status),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "skipped malformed goal_log records");
    }
    log
}

pub fn load_reading_log(records: &[Record]) -> ReadingLog {
    let mut skipped = 0usize;
    let log = records
        .iter()
        .filter_map(|record| {
            let entry = date_field(record, "date").zip(status_field(record));
            if entry.is_none() {
                skipped += 1;
            }
            entry
        })
        .collect();
    if skipped > 0 {
        warn!(skipped, "skipped malformed reading_log records");
    }
    log
}

pub fn load_macro_goals(records: &[Record]) -> Vec<MacroGoal> {
    records
        .iter()
        .filter_map(|record| match serde_json::from_value(Value::Object(record.clone())) {
            Ok(goal) => Some(goal),
            Err(err) => {
                warn!(id = ?record.get("id"), error = %err, "skipping malformed long-term goal");
                None
            }
        })
        .collect()
}

pub fn load_category_labels(settings: Option<&Record>) -> CategoryLabels {
    let overrides: BTreeMap<String, String> = settings
        .and_then(|record| record.get("mappings"))
        .and_then(Value::as_object)
        .map(|mappings| {
            mappings
                .iter()
                .filter_map(|(color, label)| Some((color.clone(), label.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();
    CategoryLabels::new(overrides)
}
