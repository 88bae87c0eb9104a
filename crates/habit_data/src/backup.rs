//! Whole-account backup: a single JSON document holding every table, plus a
//! reconciling import that reports what changed per table.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::{DataError, Result};
use crate::store::{record_key, Record, TableStore};

pub const BACKUP_VERSION: u32 = 1;
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GOALS: &str = "goals";
pub const GOAL_LOGS: &str = "goal_logs";
pub const LONG_TERM_GOALS: &str = "long_term_goals";
pub const READING_LOGS: &str = "reading_logs";
pub const USER_SETTINGS: &str = "user_settings";
pub const DAILY_MOODS: &str = "daily_moods";
pub const GOAL_CATEGORY_SETTINGS: &str = "goal_category_settings";
pub const USER_MEMOS: &str = "user_memos";
pub const APP_SETTINGS: &str = "app_settings";

/// Record tables in restore order, with their primary-key field.
pub const TABLES: [(&str, &str); 6] = [
    (GOALS, "id"),
    (GOAL_LOGS, "id"),
    (LONG_TERM_GOALS, "id"),
    (READING_LOGS, "id"),
    (USER_SETTINGS, "key"),
    (DAILY_MOODS, "id"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub app_version: String,
    pub export_date: String,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub version: u32,
    pub timestamp: String,
    pub metadata: BackupMetadata,
    #[serde(default)]
    pub goals: Vec<Record>,
    #[serde(default)]
    pub goal_logs: Vec<Record>,
    #[serde(default)]
    pub long_term_goals: Vec<Record>,
    #[serde(default)]
    pub goal_category_settings: Option<Record>,
    #[serde(default)]
    pub reading_logs: Vec<Record>,
    #[serde(default)]
    pub user_settings: Vec<Record>,
    #[serde(default)]
    pub user_memos: Option<Record>,
    #[serde(default)]
    pub daily_moods: Vec<Record>,
    #[serde(default)]
    pub app_settings: BTreeMap<String, String>,
}

impl Backup {
    pub fn table(&self, name: &str) -> &[Record] {
        match name {
            GOALS => &self.goals,
            GOAL_LOGS => &self.goal_logs,
            LONG_TERM_GOALS => &self.long_term_goals,
            READING_LOGS => &self.reading_logs,
            USER_SETTINGS => &self.user_settings,
            DAILY_MOODS => &self.daily_moods,
            _ => &[],
        }
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut Vec<Record>> {
        match name {
            GOALS => Some(&mut self.goals),
            GOAL_LOGS => Some(&mut self.goal_logs),
            LONG_TERM_GOALS => Some(&mut self.long_term_goals),
            READING_LOGS => Some(&mut self.reading_logs),
            USER_SETTINGS => Some(&mut self.user_settings),
            DAILY_MOODS => Some(&mut self.daily_moods),
            _ => None,
        }
    }

    pub fn record_count(&self) -> usize {
        TABLES.iter().map(|(name, _)| self.table(name).len()).sum::<usize>()
            + usize::from(self.goal_category_settings.is_some())
            + usize::from(self.user_memos.is_some())
    }
}

#[instrument(skip(store))]
pub fn export_backup<S>(store: &S, now: DateTime<Utc>) -> Result<Backup>
where
    S: TableStore + ?Sized,
{
    let mut backup = Backup {
        version: BACKUP_VERSION,
        timestamp: now.to_rfc3339(),
        metadata: BackupMetadata {
            app_version: APP_VERSION.to_string(),
            export_date: now.format("%Y-%m-%d").to_string(),
            total_records: 0,
        },
        goals: Vec::new(),
        goal_logs: Vec::new(),
        long_term_goals: Vec::new(),
        goal_category_settings: store.get_single(GOAL_CATEGORY_SETTINGS)?,
        reading_logs: Vec::new(),
        user_settings: Vec::new(),
        user_memos: store.get_single(USER_MEMOS)?,
        daily_moods: Vec::new(),
        app_settings: BTreeMap::new(),
    };
    for (name, _) in TABLES {
        let rows = store.fetch_all(name)?;
        if let Some(slot) = backup.table_mut(name) {
            *slot = rows;
        }
    }
    if let Some(settings) = store.get_single(APP_SETTINGS)? {
        backup.app_settings = settings
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(value) => Some((key, value)),
                _ => None,
            })
            .collect();
    }
    backup.metadata.total_records = backup.record_count();
    info!(records = backup.metadata.total_records, "backup exported");
    Ok(backup)
}

pub fn write_backup(path: impl AsRef<Path>, backup: &Backup) -> Result<()> {
    let path = path.as_ref();
    let bytes = serde_json::to_vec_pretty(backup).map_err(|err| DataError::json(path, err))?;
    fs::write(path, bytes).map_err(|err| DataError::io(path, err))
}

pub fn read_backup(path: impl AsRef<Path>) -> Result<Backup> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|err| DataError::io(path, err))?;
    serde_json::from_str(&raw).map_err(|err| DataError::json(path, err))
}

/// Problems that make `backup` unsafe to import. Empty when it is usable.
pub fn validate_backup(backup: &Backup) -> Vec<String> {
    let mut problems = Vec::new();
    if backup.version != BACKUP_VERSION {
        problems.push(format!(
            "unsupported version {} (expected {BACKUP_VERSION})",
            backup.version
        ));
    }
    if DateTime::parse_from_rfc3339(&backup.timestamp).is_err() {
        problems.push(format!("timestamp `{}` is not RFC 3339", backup.timestamp));
    }
    for (name, primary_key) in TABLES {
        let missing = backup
            .table(name)
            .iter()
            .filter(|record| record_key(record, primary_key).is_none())
            .count();
        if missing > 0 {
            problems.push(format!("{missing} record(s) in `{name}` lack `{primary_key}`"));
        }
    }
    problems
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub to_upsert: Vec<Record>,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Splits `incoming` into new, changed and identical records relative to
/// `existing`. Only new and changed records need writing.
pub fn reconcile(table: &str, existing: &[Record], incoming: &[Record], primary_key: &str) -> Result<Reconciliation> {
    let existing: BTreeMap<String, &Record> = existing
        .iter()
        .filter_map(|record| record_key(record, primary_key).map(|key| (key, record)))
        .collect();
    let mut out = Reconciliation::default();
    for record in incoming {
        let key = record_key(record, primary_key).ok_or_else(|| DataError::MissingPrimaryKey {
            table: table.to_string(),
            key: primary_key.to_string(),
        })?;
        match existing.get(&key) {
            None => {
                out.inserted += 1;
                out.to_upsert.push(record.clone());
            }
            Some(current) if *current != record => {
                out.updated += 1;
                out.to_upsert.push(record.clone());
            }
            Some(_) => out.unchanged += 1,
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: Vec<String>,
}

impl TableReport {
    fn failed(err: impl ToString) -> Self {
        Self {
            errors: vec![err.to_string()],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub total_processed: usize,
    pub by_table: BTreeMap<String, TableReport>,
    pub settings_restored: Vec<String>,
    pub timestamp: String,
}

impl ImportReport {
    pub fn has_errors(&self) -> bool {
        self.by_table.values().any(|table| !table.errors.is_empty())
    }
}

fn restore_table<S>(store: &S, name: &str, primary_key: &str, incoming: &[Record]) -> Result<TableReport>
where
    S: TableStore + ?Sized,
{
    let existing = store.fetch_all(name)?;
    let plan = reconcile(name, &existing, incoming, primary_key)?;
    if !plan.to_upsert.is_empty() {
        store.upsert(name, plan.to_upsert, primary_key)?;
    }
    Ok(TableReport {
        inserted: plan.inserted,
        updated: plan.updated,
        unchanged: plan.unchanged,
        errors: Vec::new(),
    })
}

fn restore_category_settings<S>(store: &S, incoming: &Record) -> Result<TableReport>
where
    S: TableStore + ?Sized,
{
    let report = match store.get_single(GOAL_CATEGORY_SETTINGS)? {
        Some(mut current) => {
            let mappings = incoming.get("mappings").cloned().unwrap_or(Value::Null);
            current.insert("mappings".into(), mappings);
            store.put_single(GOAL_CATEGORY_SETTINGS, current)?;
            TableReport {
                updated: 1,
                ..TableReport::default()
            }
        }
        None => {
            store.put_single(GOAL_CATEGORY_SETTINGS, incoming.clone())?;
            TableReport {
                inserted: 1,
                ..TableReport::default()
            }
        }
    };
    Ok(report)
}

fn restore_memos<S>(store: &S, incoming: &Record, now: DateTime<Utc>) -> Result<TableReport>
where
    S: TableStore + ?Sized,
{
    let mut memo = incoming.clone();
    memo.entry("content").or_insert_with(|| Value::String(String::new()));
    memo.insert("updated_at".into(), Value::String(now.to_rfc3339()));
    store.put_single(USER_MEMOS, memo)?;
    Ok(TableReport {
        updated: 1,
        ..TableReport::default()
    })
}

/// Restores `backup` into `store`. A table that fails is reported in its
/// `errors` and the remaining tables are still restored.
#[instrument(skip(store, backup), fields(records = backup.record_count()))]
pub fn import_backup<S>(store: &S, backup: &Backup, now: DateTime<Utc>) -> Result<ImportReport>
where
    S: TableStore + ?Sized,
{
    let problems = validate_backup(backup);
    if !problems.is_empty() {
        return Err(DataError::InvalidBackup(problems));
    }

    let mut report = ImportReport {
        timestamp: now.to_rfc3339(),
        ..ImportReport::default()
    };

    for (name, primary_key) in TABLES {
        let incoming = backup.table(name);
        if incoming.is_empty() {
            report.by_table.insert(name.to_string(), TableReport::default());
            continue;
        }
        let table_report = match restore_table(store, name, primary_key, incoming) {
            Ok(table_report) => {
                report.total_processed += incoming.len();
                table_report
            }
            Err(err) => {
                warn!(table = name, error = %err, "table restore failed");
                TableReport::failed(err)
            }
        };
        report.by_table.insert(name.to_string(), table_report);
    }

    if let Some(settings) = &backup.goal_category_settings {
        let table_report = match restore_category_settings(store, settings) {
            Ok(table_report) => {
                report.total_processed += 1;
                table_report
            }
            Err(err) => TableReport::failed(err),
        };
        report.by_table.insert(GOAL_CATEGORY_SETTINGS.to_string(), table_report);
    }

    if let Some(memos) = &backup.user_memos {
        let table_report = match restore_memos(store, memos, now) {
            Ok(table_report) => {
                report.total_processed += 1;
                table_report
            }
            Err(err) => TableReport::failed(err),
        };
        report.by_table.insert(USER_MEMOS.to_string(), table_report);
    }

    let settings: Record = backup
        .app_settings
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    if !settings.is_empty() {
        let keys: Vec<String> = settings.keys().cloned().collect();
        match store.put_single(APP_SETTINGS, settings) {
            Ok(()) => report.settings_restored = keys,
            Err(err) => warn!(error = %err, "app settings not restored"),
        }
    }

    info!(processed = report.total_processed, "backup imported");
    Ok(report)
}
