//! Long-term ("macro") goals and their yearly summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::percent;

pub const GENERAL_LABEL: &str = "General";

const DEFAULT_LABELS: [(&str, &str); 7] = [
    ("red", "Red"),
    ("orange", "Orange"),
    ("yellow", "Yellow"),
    ("blue", "Blue"),
    ("purple", "Purple"),
    ("pink", "Pink"),
    ("cyan", "Cyan"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    Annual,
    Quarterly,
    Monthly,
    Weekly,
    Lifetime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroGoal {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: GoalKind,
    pub year: i32,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

/// Colour → category name. User overrides win over the built-in names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryLabels {
    overrides: BTreeMap<String, String>,
}

impl CategoryLabels {
    pub fn new(overrides: BTreeMap<String, String>) -> Self {
        Self { overrides }
    }

    pub fn label(&self, color: Option<&str>) -> String {
        let Some(color) = color else {
            return GENERAL_LABEL.to_string();
        };
        if let Some(custom) = self.overrides.get(color).filter(|label| !label.is_empty()) {
            return custom.clone();
        }
        DEFAULT_LABELS
            .iter()
            .find(|(key, _)| *key == color)
            .map_or_else(|| color.to_string(), |(_, label)| (*label).to_string())
    }

    /// Defaults merged with overrides, for display in a settings listing.
    pub fn merged(&self) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = DEFAULT_LABELS
            .iter()
            .map(|(color, label)| ((*color).to_string(), (*label).to_string()))
            .collect();
        merged.extend(self.overrides.clone());
        merged
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthProgress {
    pub month: u32,
    pub total: usize,
    pub completed: usize,
    pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub color: Option<String>,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroGoalStats {
    pub year: i32,
    pub total: usize,
    pub completed: usize,
    pub completion_rate: u32,
    pub by_kind: BTreeMap<GoalKind, usize>,
    pub monthly: [MonthProgress; 12],
    pub categories: Vec<CategoryShare>,
}

/// Summary of the goals belonging to `year`. Goals from other years are ignored.
pub fn macro_goal_stats(goals: &[MacroGoal], year: i32, labels: &CategoryLabels) -> MacroGoalStats {
    let in_year: Vec<&MacroGoal> = goals.iter().filter(|goal| goal.year == year).collect();
    let completed = in_year.iter().filter(|goal| goal.is_completed).count();

    let mut by_kind = BTreeMap::new();
    let mut monthly: [MonthProgress; 12] = std::array::from_fn(|idx| MonthProgress {
        month: idx as u32 + 1,
        ..MonthProgress::default()
    });
    let mut by_color: BTreeMap<Option<&str>, usize> = BTreeMap::new();

    for goal in &in_year {
        *by_kind.entry(goal.kind).or_insert(0) += 1;
        if let Some(slot) = goal
            .month
            .filter(|month| (1..=12).contains(month))
            .map(|month| &mut monthly[month as usize - 1])
        {
            slot.total += 1;
            if goal.is_completed {
                slot.completed += 1;
            }
        }
        *by_color.entry(goal.color.as_deref()).or_insert(0) += 1;
    }

    for slot in &mut monthly {
        slot.rate = percent(slot.completed, slot.total);
    }

    let categories = by_color
        .into_iter()
        .map(|(color, count)| CategoryShare {
            color: color.map(str::to_string),
            label: labels.label(color),
            count,
        })
        .collect();

    MacroGoalStats {
        year,
        total: in_year.len(),
        completed,
        completion_rate: percent(completed, in_year.len()),
        by_kind,
        monthly,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(id: &str, kind: GoalKind, year: i32, month: Option<u32>, color: Option<&str>, done: bool) -> MacroGoal {
        MacroGoal {
            id: id.into(),
            title: id.into(),
            kind,
            year,
            month,
            color: color.map(str::to_string),
            is_completed: done,
        }
    }

    #[test]
    fn labels_prefer_overrides_then_defaults() {
        let labels = CategoryLabels::new([("red".to_string(), "Health".to_string())].into());
        assert_eq!(labels.label(Some("red")), "Health");
        assert_eq!(labels.label(Some("blue")), "Blue");
        assert_eq!(labels.label(Some("teal")), "teal");
        assert_eq!(labels.label(None), GENERAL_LABEL);
        assert_eq!(labels.merged().get("red").map(String::as_str), Some("Health"));
    }

    #[test]
    fn summarises_one_year() {
        let goals = vec![
            goal("a", GoalKind::Annual, 2024, None, Some("red"), true),
            goal("b", GoalKind::Monthly, 2024, Some(3), Some("red"), false),
            goal("c", GoalKind::Monthly, 2024, Some(3), None, true),
            goal("d", GoalKind::Weekly, 2024, Some(13), Some("blue"), false),
            goal("e", GoalKind::Annual, 2023, None, Some("blue"), true),
        ];
        let stats = macro_goal_stats(&goals, 2024, &CategoryLabels::default());
        assert_eq!((stats.total, stats.completed, stats.completion_rate), (4, 2, 50));
        assert_eq!(stats.by_kind.get(&GoalKind::Monthly), Some(&2));
        assert_eq!(stats.by_kind.get(&GoalKind::Lifetime), None);
        assert_eq!(stats.monthly[2], MonthProgress { month: 3, total: 2, completed: 1, rate: 50 });
        assert_eq!(stats.monthly.iter().map(|m| m.total).sum::<usize>(), 2);

        let general = stats.categories.iter().find(|share| share.color.is_none()).unwrap();
        assert_eq!((general.label.as_str(), general.count), (GENERAL_LABEL, 1));
        let red = stats.categories.iter().find(|share| share.label == "Red").unwrap();
        assert_eq!(red.count, 2);
    }

    #[test]
    fn empty_year_has_zero_rate() {
        let stats = macro_goal_stats(&[], 2024, &CategoryLabels::default());
        assert_eq!(stats.completion_rate, 0);
        assert!(stats.categories.is_empty());
    }

    #[test]
    fn deserializes_type_field() {
        let goal: MacroGoal =
            serde_json::from_str(r#"{"id":"x","title":"Read 20 books","type":"annual","year":2024,"color":null}"#).unwrap();
        assert_eq!(goal.kind, GoalKind::Annual);
        assert!(!goal.is_completed);
    }
}
