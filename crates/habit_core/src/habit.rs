use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::DateKey;
use crate::error::{CoreError, Result};

pub type HabitId = String;

/// A trackable daily habit with an inclusive validity window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: HabitId,
    #[serde(default)]
    pub title: String,
    pub start_date: DateKey,
    #[serde(default)]
    pub end_date: Option<DateKey>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Habit {
    pub fn new(id: impl Into<HabitId>, start_date: DateKey, end_date: Option<DateKey>) -> Result<Self> {
        let habit = Self {
            id: id.into(),
            title: String::new(),
            start_date,
            end_date,
            color: None,
        };
        habit.validate()?;
        Ok(habit)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.end_date {
            Some(end) if end < self.start_date => Err(CoreError::InvertedValidity {
                id: self.id.clone(),
                start: self.start_date,
                end,
            }),
            _ => Ok(()),
        }
    }

    /// `start_date <= date` and the habit has not ended before `date`.
    pub fn is_valid_on(&self, date: DateKey) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| end >= date)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HabitStatus {
    Done,
    Missed,
}

impl HabitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HabitStatus::Done => "done",
            HabitStatus::Missed => "missed",
        }
    }
}

impl fmt::Display for HabitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "done" => Ok(HabitStatus::Done),
            "missed" => Ok(HabitStatus::Missed),
            other => Err(format!("unknown habit status `{other}`")),
        }
    }
}

/// Cycle used by the day-details toggle: unmarked, done, missed, unmarked.
pub fn next_status(current: Option<HabitStatus>) -> Option<HabitStatus> {
    match current {
        None => Some(HabitStatus::Done),
        Some(HabitStatus::Done) => Some(HabitStatus::Missed),
        Some(HabitStatus::Missed) => None,
    }
}

/// Sparse per-day record of habit statuses. A habit without an entry on a
/// date is *unmarked*, which is distinct from *missed*.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DayLog {
    days: BTreeMap<DateKey, BTreeMap<HabitId, HabitStatus>>,
}

impl DayLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(&self, date: DateKey) -> Option<&BTreeMap<HabitId, HabitStatus>> {
        self.days.get(&date)
    }

    pub fn status(&self, date: DateKey, habit_id: &str) -> Option<HabitStatus> {
        self.days.get(&date)?.get(habit_id).copied()
    }

    pub fn set(&mut self, date: DateKey, habit_id: impl Into<HabitId>, status: HabitStatus) {
        self.days.entry(date).or_default().insert(habit_id.into(), status);
    }

    pub fn clear(&mut self, date: DateKey, habit_id: &str) -> Option<HabitStatus> {
        let day = self.days.get_mut(&date)?;
        let removed = day.remove(habit_id);
        if day.is_empty() {
            self.days.remove(&date);
        }
        removed
    }

    /// Applies `status` (or clears when `None`) and returns it.
    pub fn apply(&mut self, date: DateKey, habit_id: &str, status: Option<HabitStatus>) -> Option<HabitStatus> {
        match status {
            Some(status) => self.set(date, habit_id, status),
            None => {
                self.clear(date, habit_id);
            }
        }
        status
    }

    pub fn toggle(&mut self, date: DateKey, habit_id: &str) -> Option<HabitStatus> {
        let next = next_status(self.status(date, habit_id));
        self.apply(date, habit_id, next)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateKey, &BTreeMap<HabitId, HabitStatus>)> {
        self.days.iter().map(|(date, day)| (*date, day))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<I: Into<HabitId>> FromIterator<(DateKey, I, HabitStatus)> for DayLog {
    fn from_iter<T: IntoIterator<Item = (DateKey, I, HabitStatus)>>(iter: T) -> Self {
        let mut log = DayLog::new();
        for (date, habit_id, status) in iter {
            log.set(date, habit_id, status);
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> DateKey {
        DateKey::parse(raw).unwrap()
    }

    #[test]
    fn rejects_inverted_validity_window() {
        let err = Habit::new("read", key("2024-02-01"), Some(key("2024-01-01"))).unwrap_err();
        assert!(matches!(err, CoreError::InvertedValidity { ref id, .. } if id == "read"));
        assert!(Habit::new("read", key("2024-01-01"), Some(key("2024-01-01"))).is_ok());
    }

    #[test]
    fn validity_bounds_are_inclusive() {
        let habit = Habit::new("a", key("2024-01-01"), Some(key("2024-01-31"))).unwrap();
        assert!(!habit.is_valid_on(key("2023-12-31")));
        assert!(habit.is_valid_on(key("2024-01-01")));
        assert!(habit.is_valid_on(key("2024-01-31")));
        assert!(!habit.is_valid_on(key("2024-02-01")));

        let open = Habit::new("b", key("2024-01-01"), None).unwrap();
        assert!(open.is_valid_on(key("2099-12-31")));
    }

    #[test]
    fn toggle_cycles_through_three_states() {
        let mut log = DayLog::new();
        let day = key("2024-03-03");
        assert_eq!(log.toggle(day, "a"), Some(HabitStatus::Done));
        assert_eq!(log.toggle(day, "a"), Some(HabitStatus::Missed));
        assert_eq!(log.toggle(day, "a"), None);
        assert!(log.is_empty(), "clearing the last entry drops the day");
    }

    #[test]
    fn deserializes_nested_log_maps() {
        let log: DayLog =
            serde_json::from_str(r#"{"2024-01-05":{"A":"done","B":"missed"}}"#).unwrap();
        assert_eq!(log.status(key("2024-01-05"), "A"), Some(HabitStatus::Done));
        assert_eq!(log.status(key("2024-01-05"), "B"), Some(HabitStatus::Missed));
        assert_eq!(log.status(key("2024-01-05"), "C"), None);
        assert!(serde_json::from_str::<DayLog>(r#"{"2024-01-05":{"A":"skipped"}}"#).is_err());
    }

    #[test]
    fn habit_deserializes_with_optional_fields() {
        let habit: Habit = serde_json::from_str(
            r#"{"id":"g1","title":"Run","start_date":"2024-01-01","end_date":null,"color":"red","frequency_days":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(habit.end_date, None);
        assert_eq!(habit.color.as_deref(), Some("red"));
    }
}
