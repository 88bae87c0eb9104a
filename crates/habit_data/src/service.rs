use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{Datelike, Utc};
use habit_core::aggregate::{aggregate_day, DayAggregate};
use habit_core::annual::{annual_grid, is_editable, AnnualCell};
use habit_core::goals::{macro_goal_stats, CategoryLabels, MacroGoal, MacroGoalStats};
use habit_core::habit::next_status;
use habit_core::heatmap::{habit_heatmap, reading_heatmap, Heatmap};
use habit_core::life::{life_grid, LifeGrid, LifeSpan};
use habit_core::reading::{reading_stats, ReadingStats};
use habit_core::stats::{
    critical_habits, habit_stats, overview, period_comparisons, trend, trend_window, HabitStat, Overview,
    PeriodComparison, TrendPoint,
};
use habit_core::{Clock, DateKey, DayLog, Granularity, Habit, HabitStatus, ReadingLog, SystemClock};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backup::{
    export_backup, import_backup, read_backup, write_backup, Backup, ImportReport, GOALS, GOAL_CATEGORY_SETTINGS,
    GOAL_LOGS, LONG_TERM_GOALS, READING_LOGS,
};
use crate::error::{DataError, Result};
use crate::loader::{date_field, load_category_labels, load_day_log, load_habits, load_macro_goals, load_reading_log};
use crate::pagination::{fetch_all_paginated, DEFAULT_PAGE_SIZE};
use crate::store::{record_key, JsonDirStore, Record, TableStore};

/// Everything the views read, loaded from the store in one pass.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub habits: Vec<Habit>,
    pub log: DayLog,
    pub reading: ReadingLog,
    pub macro_goals: Vec<MacroGoal>,
    pub labels: CategoryLabels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayEntry {
    pub habit_id: String,
    pub title: String,
    pub status: Option<HabitStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDetails {
    pub date: DateKey,
    pub editable: bool,
    pub aggregate: DayAggregate,
    pub entries: Vec<DayEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub overview: Overview,
    pub habits: Vec<HabitStat>,
    pub critical: Vec<HabitStat>,
    pub comparisons: Vec<PeriodComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub granularity: Granularity,
    pub points: Vec<TrendPoint>,
}

pub struct DashboardService {
    store: Arc<dyn TableStore>,
    clock: Arc<dyn Clock>,
    life_span: LifeSpan,
    page_size: usize,
    snapshot: RwLock<Snapshot>,
    write_gate: Mutex<()>,
}

pub struct DashboardServiceBuilder {
    data_dir: Option<PathBuf>,
    store: Option<Arc<dyn TableStore>>,
    clock: Arc<dyn Clock>,
    life_span: LifeSpan,
    page_size: usize,
}

impl DashboardServiceBuilder {
    pub fn new() -> Self {
        Self {
            data_dir: None,
            store: None,
            clock: Arc::new(SystemClock),
            life_span: LifeSpan::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Uses `store` instead of opening a data directory.
    pub fn store(mut self, store: impl TableStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn life_span(mut self, span: LifeSpan) -> Self {
        self.life_span = span;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn build(self) -> anyhow::Result<DashboardService> {
        self.life_span.validate().context("invalid life span")?;
        let store = match (self.store, self.data_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => {
                let store = JsonDirStore::open(&dir)
                    .with_context(|| format!("opening data directory {}", dir.display()))?;
                Arc::new(store) as Arc<dyn TableStore>
            }
            (None, None) => return Err(anyhow!("no data directory or store configured")),
        };
        let service = DashboardService {
            store,
            clock: self.clock,
            life_span: self.life_span,
            page_size: self.page_size,
            snapshot: RwLock::new(Snapshot::default()),
            write_gate: Mutex::new(()),
        };
        service.reload().context("loading dashboard data")?;
        Ok(service)
    }
}

impl Default for DashboardServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardService {
    pub fn builder() -> DashboardServiceBuilder {
        DashboardServiceBuilder::new()
    }

    pub fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }

    pub fn life_span(&self) -> LifeSpan {
        self.life_span
    }

    pub fn today(&self) -> DateKey {
        self.clock.today()
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.snapshot.read().habits.clone()
    }

    fn fetch(&self, table: &str) -> Result<Vec<Record>> {
        fetch_all_paginated(self.store.as_ref(), table, self.page_size)
    }

    /// Re-reads every table. Holds the write gate throughout so a concurrent
    /// `toggle` cannot land between the read and the snapshot swap.
    #[instrument(skip(self))]
    pub fn reload(&self) -> Result<()> {
        let _gate = self.write_gate.lock();
        self.reload_locked()
    }

    /// Caller must hold `write_gate`.
    fn reload_locked(&self) -> Result<()> {
        let snapshot = Snapshot {
            habits: load_habits(&self.fetch(GOALS)?),
            log: load_day_log(&self.fetch(GOAL_LOGS)?),
            reading: load_reading_log(&self.fetch(READING_LOGS)?),
            macro_goals: load_macro_goals(&self.fetch(LONG_TERM_GOALS)?),
            labels: load_category_labels(self.store.get_single(GOAL_CATEGORY_SETTINGS)?.as_ref()),
        };
        info!(
            habits = snapshot.habits.len(),
            logged_days = snapshot.log.len(),
            "dashboard data loaded"
        );
        *self.snapshot.write() = snapshot;
        Ok(())
    }

    pub fn annual(&self, year: Option<i32>) -> Result<Vec<AnnualCell>> {
        let now = self.clock.now();
        let snapshot = self.snapshot.read();
        let year = year.unwrap_or_else(|| now.year());
        Ok(annual_grid(&snapshot.habits, &snapshot.log, year, now)?)
    }

    pub fn life(&self) -> Result<LifeGrid> {
        let today = self.today();
        let snapshot = self.snapshot.read();
        Ok(life_grid(&snapshot.habits, &snapshot.log, self.life_span, today)?)
    }

    pub fn habit_heatmap(&self, year: Option<i32>) -> Result<Heatmap<DayAggregate>> {
        let today = self.today();
        let snapshot = self.snapshot.read();
        Ok(habit_heatmap(
            &snapshot.habits,
            &snapshot.log,
            year.unwrap_or_else(|| today.year()),
            today,
        )?)
    }

    pub fn reading_heatmap(&self, year: Option<i32>) -> Result<Heatmap<HabitStatus>> {
        let today = self.today();
        let snapshot = self.snapshot.read();
        Ok(reading_heatmap(&snapshot.reading, year.unwrap_or_else(|| today.year()), today)?)
    }

    pub fn day(&self, date: DateKey) -> DayDetails {
        let now = self.clock.now();
        let snapshot = self.snapshot.read();
        let entries = snapshot
            .habits
            .iter()
            .filter(|habit| habit.is_valid_on(date))
            .map(|habit| DayEntry {
                habit_id: habit.id.clone(),
                title: habit.title.clone(),
                status: snapshot.log.status(date, &habit.id),
            })
            .collect();
        DayDetails {
            date,
            editable: is_editable(date, now),
            aggregate: aggregate_day(&snapshot.habits, &snapshot.log, date),
            entries,
        }
    }

    /// Overview, per-habit figures and period comparisons, plus a trend
    /// series over the default window when `trend_by` names a granularity.
    pub fn stats(&self, trend_by: Option<Granularity>) -> Result<StatsReport> {
        let today = self.today();
        let snapshot = self.snapshot.read();
        let habits = habit_stats(&snapshot.habits, &snapshot.log, today);
        let critical = critical_habits(&habits).into_iter().cloned().collect();
        let series = match trend_by {
            Some(granularity) => {
                let points = match trend_window(&snapshot.habits, granularity, today) {
                    Some((from, to)) => trend(&snapshot.habits, &snapshot.log, from, to, granularity, today)?,
                    None => Vec::new(),
                };
                Some(Trend { granularity, points })
            }
            None => None,
        };
        Ok(StatsReport {
            overview: overview(&snapshot.habits, &snapshot.log, today),
            habits,
            critical,
            comparisons: period_comparisons(&snapshot.habits, &snapshot.log, today),
            trend: series,
        })
    }

    pub fn reading_stats(&self) -> ReadingStats {
        let today = self.today();
        reading_stats(&self.snapshot.read().reading, today)
    }

    /// Colour → category name, built-in names merged with the user's overrides.
    pub fn category_labels(&self) -> BTreeMap<String, String> {
        self.snapshot.read().labels.merged()
    }

    pub fn macro_stats(&self, year: Option<i32>) -> MacroGoalStats {
        let year = year.unwrap_or_else(|| self.today().year());
        let snapshot = self.snapshot.read();
        macro_goal_stats(&snapshot.macro_goals, year, &snapshot.labels)
    }

    /// Advances `habit_id` on `date` to its next status and persists it.
    #[instrument(skip(self))]
    pub fn toggle(&self, date: DateKey, habit_id: &str) -> Result<Option<HabitStatus>> {
        let _gate = self.write_gate.lock();
        if !is_editable(date, self.clock.now()) {
            return Err(DataError::ReadOnlyDate(date));
        }
        let current = {
            let snapshot = self.snapshot.read();
            let known = snapshot
                .habits
                .iter()
                .any(|habit| habit.id == habit_id && habit.is_valid_on(date));
            if !known {
                return Err(DataError::UnknownHabit(habit_id.to_string()));
            }
            snapshot.log.status(date, habit_id)
        };
        let next = next_status(current);
        self.persist_status(date, habit_id, next)?;
        self.snapshot.write().log.apply(date, habit_id, next);
        debug!(?next, "status toggled");
        Ok(next)
    }

    fn persist_status(&self, date: DateKey, habit_id: &str, status: Option<HabitStatus>) -> Result<()> {
        let matching: Vec<Record> = self
            .fetch(GOAL_LOGS)?
            .into_iter()
            .filter(|record| {
                record.get("goal_id").and_then(Value::as_str) == Some(habit_id)
                    && date_field(record, "date") == Some(date)
            })
            .collect();

        match status {
            Some(status) => {
                let mut record = match matching.into_iter().next() {
                    Some(existing) => existing,
                    None => new_log_record(date, habit_id),
                };
                record.insert("status".into(), Value::String(status.as_str().to_string()));
                self.store.upsert(GOAL_LOGS, vec![record], "id")?;
            }
            None => {
                for record in &matching {
                    if let Some(id) = record_key(record, "id") {
                        self.store.delete(GOAL_LOGS, "id", &id)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn export(&self) -> Result<Backup> {
        export_backup(self.store.as_ref(), Utc::now())
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<Backup> {
        let backup = self.export()?;
        write_backup(path, &backup)?;
        Ok(backup)
    }

    /// Imports a backup file and reloads the snapshot from the store.
    ///
    /// Once the import has written to the store its report is always
    /// returned; a failed reload is logged and leaves the previous snapshot.
    pub fn import_from(&self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let backup = read_backup(path)?;
        let _gate = self.write_gate.lock();
        let report = import_backup(self.store.as_ref(), &backup, Utc::now())?;
        if let Err(err) = self.reload_locked() {
            warn!(error = %err, "backup imported but the dashboard could not be reloaded");
        }
        Ok(report)
    }
}

fn new_log_record(date: DateKey, habit_id: &str) -> Record {
    match json!({
        "id": Uuid::new_v4().to_string(),
        "goal_id": habit_id,
        "date": date.to_string(),
    }) {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}
