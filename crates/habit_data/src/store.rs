//! Table-oriented persistence. Every table is a list of JSON records keyed by
//! a primary-key field; singleton tables hold at most one record.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{DataError, Result};
use crate::pagination::{fetch_all_paginated, DEFAULT_PAGE_SIZE};

pub type Record = Map<String, Value>;

pub trait TableStore: Send + Sync {
    /// Up to `limit` records starting at `offset`, in storage order.
    fn fetch_page(&self, table: &str, offset: usize, limit: usize) -> Result<Vec<Record>>;

    /// Inserts or replaces records by `primary_key`. Returns how many were written.
    fn upsert(&self, table: &str, records: Vec<Record>, primary_key: &str) -> Result<usize>;

    fn delete(&self, table: &str, primary_key: &str, key: &str) -> Result<bool>;

    fn get_single(&self, table: &str) -> Result<Option<Record>>;

    fn put_single(&self, table: &str, record: Record) -> Result<()>;

    fn fetch_all(&self, table: &str) -> Result<Vec<Record>> {
        fetch_all_paginated(self, table, DEFAULT_PAGE_SIZE)
    }
}

impl<S: TableStore + ?Sized> TableStore for Arc<S> {
    fn fetch_page(&self, table: &str, offset: usize, limit: usize) -> Result<Vec<Record>> {
        (**self).fetch_page(table, offset, limit)
    }

    fn upsert(&self, table: &str, records: Vec<Record>, primary_key: &str) -> Result<usize> {
        (**self).upsert(table, records, primary_key)
    }

    fn delete(&self, table: &str, primary_key: &str, key: &str) -> Result<bool> {
        (**self).delete(table, primary_key, key)
    }

    fn get_single(&self, table: &str) -> Result<Option<Record>> {
        (**self).get_single(table)
    }

    fn put_single(&self, table: &str, record: Record) -> Result<()> {
        (**self).put_single(table, record)
    }

    fn fetch_all(&self, table: &str) -> Result<Vec<Record>> {
        (**self).fetch_all(table)
    }
}

/// String form of a record's primary key. Numbers are accepted and rendered
/// in their JSON form; anything else counts as missing.
pub fn record_key(record: &Record, primary_key: &str) -> Option<String> {
    match record.get(primary_key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn merge_records(
    table: &str,
    existing: &mut Vec<Record>,
    incoming: Vec<Record>,
    primary_key: &str,
) -> Result<usize> {
    let mut positions: BTreeMap<String, usize> = existing
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| record_key(record, primary_key).map(|key| (key, idx)))
        .collect();
    let mut written = 0;
    for record in incoming {
        let key = record_key(&record, primary_key).ok_or_else(|| DataError::MissingPrimaryKey {
            table: table.to_string(),
            key: primary_key.to_string(),
        })?;
        match positions.get(&key) {
            Some(idx) => existing[*idx] = record,
            None => {
                positions.insert(key, existing.len());
                existing.push(record);
            }
        }
        written += 1;
    }
    Ok(written)
}

fn check_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(DataError::Backend {
            table: table.to_string(),
            message: "table names may only contain letters, digits, `_` and `-`".into(),
        })
    }
}

/// Stores each table as `<dir>/<table>.json`. Writes are serialized through
/// one lock and land via a temporary file plus rename.
#[derive(Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|err| DataError::io(&dir, err))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }

    fn read_value(&self, table: &str) -> Result<Option<Value>> {
        check_table_name(table)?;
        let path = self.table_path(table);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(DataError::io(path, err)),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| DataError::json(path, err))
    }

    fn read_table(&self, table: &str) -> Result<Vec<Record>> {
        match self.read_value(table)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_json::from_value(value).map_err(|err| DataError::json(self.table_path(table), err))
            }
        }
    }

    fn write_value(&self, table: &str, value: &Value) -> Result<()> {
        check_table_name(table)?;
        let path = self.table_path(table);
        let tmp = self.dir.join(format!(".{table}.json.tmp"));
        let bytes = serde_json::to_vec_pretty(value).map_err(|err| DataError::json(&path, err))?;
        fs::write(&tmp, bytes).map_err(|err| DataError::io(&tmp, err))?;
        fs::rename(&tmp, &path).map_err(|err| DataError::io(&path, err))?;
        debug!(path = %path.display(), "table written");
        Ok(())
    }
}

impl TableStore for JsonDirStore {
    fn fetch_page(&self, table: &str, offset: usize, limit: usize) -> Result<Vec<Record>> {
        Ok(self
            .read_table(table)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    fn upsert(&self, table: &str, records: Vec<Record>, primary_key: &str) -> Result<usize> {
        let _guard = self.write_lock.lock();
        let mut existing = self.read_table(table)?;
        let written = merge_records(table, &mut existing, records, primary_key)?;
        let rows = existing.into_iter().map(Value::Object).collect();
        self.write_value(table, &Value::Array(rows))?;
        Ok(written)
    }

    #[instrument(skip(self))]
    fn delete(&self, table: &str, primary_key: &str, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let mut existing = self.read_table(table)?;
        let before = existing.len();
        existing.retain(|record| record_key(record, primary_key).as_deref() != Some(key));
        if existing.len() == before {
            return Ok(false);
        }
        let rows = existing.into_iter().map(Value::Object).collect();
        self.write_value(table, &Value::Array(rows))?;
        Ok(true)
    }

    fn get_single(&self, table: &str) -> Result<Option<Record>> {
        match self.read_value(table)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(record)) => Ok(Some(record)),
            Some(_) => Err(DataError::Backend {
                table: table.to_string(),
                message: "singleton table must hold an object or null".into(),
            }),
        }
    }

    #[instrument(skip(self, record))]
    fn put_single(&self, table: &str, record: Record) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.write_value(table, &Value::Object(record))
    }
}

/// In-process store for tests and dry runs. Tables marked with
/// [`MemoryStore::fail_table`] reject every operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Vec<Record>>>,
    singles: RwLock<BTreeMap<String, Record>>,
    failing: RwLock<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str, records: Vec<Record>) -> Self {
        self.tables.write().insert(table.to_string(), records);
        self
    }

    pub fn with_single(self, table: &str, record: Record) -> Self {
        self.singles.write().insert(table.to_string(), record);
        self
    }

    pub fn fail_table(&self, table: &str) {
        self.failing.write().insert(table.to_string());
    }

    fn check(&self, table: &str) -> Result<()> {
        if self.failing.read().contains(table) {
            return Err(DataError::Backend {
                table: table.to_string(),
                message: "table unavailable".into(),
            });
        }
        Ok(())
    }
}

impl TableStore for MemoryStore {
    fn fetch_page(&self, table: &str, offset: usize, limit: usize) -> Result<Vec<Record>> {
        self.check(table)?;
        Ok(self
            .tables
            .read()
            .get(table)
            .map(|rows| rows.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn upsert(&self, table: &str, records: Vec<Record>, primary_key: &str) -> Result<usize> {
        self.check(table)?;
        let mut tables = self.tables.write();
        let existing = tables.entry(table.to_string()).or_default();
        merge_records(table, existing, records, primary_key)
    }

    fn delete(&self, table: &str, primary_key: &str, key: &str) -> Result<bool> {
        self.check(table)?;
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|record| record_key(record, primary_key).as_deref() != Some(key));
        Ok(rows.len() != before)
    }

    fn get_single(&self, table: &str) -> Result<Option<Record>> {
        self.check(table)?;
        Ok(self.singles.read().get(table).cloned())
    }

    fn put_single(&self, table: &str, record: Record) -> Result<()> {
        self.check(table)?;
        self.singles.write().insert(table.to_string(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn upsert_replaces_by_key_and_keeps_order() {
        let store = MemoryStore::new();
        let first = vec![
            record(json!({"id": "a", "v": 1})),
            record(json!({"id": "b", "v": 2})),
        ];
        assert_eq!(store.upsert("goals", first, "id").unwrap(), 2);
        store
            .upsert("goals", vec![record(json!({"id": "a", "v": 9}))], "id")
            .unwrap();
        let rows = store.fetch_all("goals").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["v"], json!(9));
    }

    #[test]
    fn upsert_rejects_records_without_key() {
        let store = MemoryStore::new();
        let err = store
            .upsert("goals", vec![record(json!({"title": "x"}))], "id")
            .unwrap_err();
        assert!(matches!(err, DataError::MissingPrimaryKey { ref key, .. } if key == "id"));
    }

    #[test]
    fn numeric_keys_are_rendered() {
        assert_eq!(record_key(&record(json!({"id": 7})), "id").as_deref(), Some("7"));
        assert_eq!(record_key(&record(json!({"id": null})), "id"), None);
    }

    #[test]
    fn json_dir_store_round_trips_tables_and_singletons() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = JsonDirStore::open(temp.path()).unwrap();
        assert!(store.fetch_all("goals").unwrap().is_empty());
        assert!(store.get_single("user_memos").unwrap().is_none());

        store
            .upsert("goals", vec![record(json!({"id": "g1", "title": "Run"}))], "id")
            .unwrap();
        store
            .put_single("user_memos", record(json!({"id": "m", "content": "hi"})))
            .unwrap();

        let reopened = JsonDirStore::open(temp.path()).unwrap();
        assert_eq!(reopened.fetch_all("goals").unwrap()[0]["title"], json!("Run"));
        assert_eq!(
            reopened.get_single("user_memos").unwrap().unwrap()["content"],
            json!("hi")
        );
        assert!(reopened.delete("goals", "id", "g1").unwrap());
        assert!(!reopened.delete("goals", "id", "g1").unwrap());
    }

    #[test]
    fn json_dir_store_rejects_path_like_table_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = JsonDirStore::open(temp.path()).unwrap();
        assert!(matches!(
            store.fetch_all("../escape"),
            Err(DataError::Backend { .. })
        ));
    }

    #[test]
    fn malformed_table_file_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = JsonDirStore::open(temp.path()).unwrap();
        fs::write(store.table_path("goals"), "{not json").unwrap();
        let err = store.fetch_all("goals").unwrap_err();
        assert!(matches!(err, DataError::Json { ref path, .. } if path.ends_with("goals.json")));
    }
}
