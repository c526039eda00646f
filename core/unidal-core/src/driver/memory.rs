//! In-memory document-store adapter.
//!
//! The one adapter shipped with the core: a process-local store keyed
//! by target name, with equality-condition queries, merge-style updates
//! and an undo-log transaction. It exercises the full [`Connection`]
//! contract and backs the test suite; network adapters live in their
//! own crates and plug in through [`Database::with_driver`].
//!
//! [`Database::with_driver`]: crate::engine::Database::with_driver

use crate::collection::{RowCollection, VecSource};
use crate::driver::{Connection, Driver, FindOptions, key_predicate};
use crate::error::{DalError, DalResult};
use crate::row::Record;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared table storage: target name → ordered rows.
#[derive(Default)]
struct MemoryStore {
    tables: DashMap<String, Vec<Record>>,
}

/// Driver for the `memory` scheme.
#[derive(Default)]
pub struct MemoryDriver {
    store: Arc<MemoryStore>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Driver for MemoryDriver {
    fn connect(&self) -> DalResult<Box<dyn Connection>> {
        Ok(Box::new(MemoryConnection {
            store: Arc::clone(&self.store),
            open: true,
            undo: None,
        }))
    }

    fn table_names(&self) -> DalResult<Vec<String>> {
        let mut names: Vec<String> = self.store.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn scheme(&self) -> &'static str {
        "memory"
    }
}

/// One session over the shared store.
///
/// Transactions keep an undo log: the first mutation of a target inside
/// a transaction snapshots that target, rollback restores the snapshots.
/// Reads inside the transaction see its own writes.
pub struct MemoryConnection {
    store: Arc<MemoryStore>,
    open: bool,
    /// target → rows at transaction start (`None` = target was absent)
    undo: Option<HashMap<String, Option<Vec<Record>>>>,
}

/// True when every condition field matches the record by equality.
/// Empty conditions match everything.
fn matches(record: &Record, conditions: &Record) -> bool {
    conditions
        .iter()
        .all(|(field, value)| record.get(field) == Some(value))
}

/// Project heterogeneous documents onto a row shape: the key sequence
/// is the union of the field names, missing fields become `Null`.
fn collection_over(records: Vec<Record>) -> RowCollection {
    let mut keys: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.clone());
            }
        }
    }
    let rows: Vec<Vec<Value>> = records
        .iter()
        .map(|record| {
            keys.iter()
                .map(|key| record.get(key).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    RowCollection::new(keys, Box::new(VecSource::new(rows)))
}

impl MemoryConnection {
    fn ensure_open(&self) -> DalResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DalError::ConnectionClosed)
        }
    }

    /// Record the pre-image of a target on its first mutation inside a
    /// transaction.
    fn snapshot(&mut self, target: &str) {
        if let Some(undo) = self.undo.as_mut() {
            if !undo.contains_key(target) {
                let current = self.store.tables.get(target).map(|rows| rows.clone());
                undo.insert(target.to_string(), current);
            }
        }
    }

    /// Append one record, refusing duplicate `id` values.
    fn create(target: &str, rows: &mut Vec<Record>, record: &Record) -> DalResult<()> {
        if let Some(id) = record.get("id") {
            if rows.iter().any(|r| r.get("id") == Some(id)) {
                return Err(DalError::Conflict {
                    target: target.to_string(),
                    id: id.to_string(),
                });
            }
        }
        rows.push(record.clone());
        Ok(())
    }

    fn matched(&self, target: &str, conditions: &Record) -> Vec<Record> {
        match self.store.tables.get(target) {
            Some(rows) => rows
                .iter()
                .filter(|r| matches(r, conditions))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Connection for MemoryConnection {
    fn execute(&mut self, stmt: &str, _params: &Record, _commit: bool) -> DalResult<RowCollection> {
        self.ensure_open()?;
        Err(DalError::driver(
            "execute",
            "memory",
            format!("raw statements are not supported by the memory backend: '{stmt}'"),
        ))
    }

    fn find(
        &mut self,
        target: &str,
        conditions: &Record,
        opts: &FindOptions,
    ) -> DalResult<RowCollection> {
        self.ensure_open()?;
        let mut found = self.matched(target, conditions);
        if let Some(page) = opts.page {
            // from = page * page_size, size = page_size; an offset past
            // u64::MAX is past any result set, so saturate to an empty page.
            let from = usize::try_from(page.saturating_mul(opts.page_size)).unwrap_or(usize::MAX);
            let size = opts.page_size as usize;
            found = found.into_iter().skip(from).take(size).collect();
        }
        debug!(dst = target, rows = found.len(), "find");
        let mut coll = collection_over(found);
        if opts.fetch_all {
            coll.all()?;
        }
        Ok(coll)
    }

    fn insert(&mut self, target: &str, records: &[Record]) -> DalResult<u64> {
        self.ensure_open()?;
        if records.is_empty() {
            return Ok(0);
        }
        self.snapshot(target);
        let mut rows = self.store.tables.entry(target.to_string()).or_default();
        let mut created = 0;
        for record in records {
            match Self::create(target, &mut rows, record) {
                Ok(()) => created += 1,
                // Duplicate-key create is "not created", never a failure —
                // batch inserts report partial success through the count.
                Err(DalError::Conflict { id, .. }) => {
                    warn!(dst = target, id, "duplicate id skipped on insert");
                }
                Err(err) => return Err(err),
            }
        }
        debug!(dst = target, created, "insert");
        Ok(created)
    }

    fn update(&mut self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64> {
        self.ensure_open()?;
        if records.is_empty() {
            return Ok(0);
        }
        self.snapshot(target);
        let Some(mut rows) = self.store.tables.get_mut(target) else {
            return Ok(0);
        };
        let mut affected = 0;
        for record in records {
            let predicate = key_predicate(record, keyflds)?;
            for row in rows.iter_mut() {
                if matches(row, &predicate) {
                    // Merge semantics: set the record's fields, keep the rest.
                    for (field, value) in record {
                        row.insert(field.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
        }
        debug!(dst = target, affected, "update");
        Ok(affected)
    }

    fn delete(&mut self, target: &str, records: &[Record], keyflds: &[&str]) -> DalResult<u64> {
        self.ensure_open()?;
        if records.is_empty() {
            return Ok(0);
        }
        self.snapshot(target);
        let Some(mut rows) = self.store.tables.get_mut(target) else {
            // Absent target is a zero-match delete, not a failure.
            return Ok(0);
        };
        let mut removed = 0;
        for record in records {
            let predicate = key_predicate(record, keyflds)?;
            rows.retain(|row| {
                if matches(row, &predicate) {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        debug!(dst = target, removed, "delete");
        Ok(removed)
    }

    fn count(&mut self, target: &str, conditions: &Record) -> DalResult<u64> {
        self.ensure_open()?;
        Ok(self.matched(target, conditions).len() as u64)
    }

    fn exists(&mut self, target: &str, id: Option<&Value>) -> DalResult<bool> {
        self.ensure_open()?;
        match id {
            None => Ok(self.store.tables.contains_key(target)),
            Some(id) => Ok(self
                .store
                .tables
                .get(target)
                .map(|rows| rows.iter().any(|r| r.get("id") == Some(id)))
                .unwrap_or(false)),
        }
    }

    fn begin(&mut self) -> DalResult<()> {
        self.ensure_open()?;
        if self.undo.is_some() {
            return Err(DalError::Transaction(
                "transaction already active on this connection".to_string(),
            ));
        }
        self.undo = Some(HashMap::new());
        Ok(())
    }

    fn commit(&mut self) -> DalResult<()> {
        self.ensure_open()?;
        match self.undo.take() {
            Some(_) => Ok(()),
            None => Err(DalError::Transaction(
                "commit without an active transaction".to_string(),
            )),
        }
    }

    fn rollback(&mut self) -> DalResult<()> {
        self.ensure_open()?;
        let Some(undo) = self.undo.take() else {
            return Err(DalError::Transaction(
                "rollback without an active transaction".to_string(),
            ));
        };
        for (target, snapshot) in undo {
            match snapshot {
                Some(rows) => {
                    self.store.tables.insert(target, rows);
                }
                None => {
                    self.store.tables.remove(&target);
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> DalResult<()> {
        if !self.open {
            return Ok(());
        }
        // An unfinished transaction is discarded, not committed.
        if self.undo.is_some() {
            self.rollback()?;
        }
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
