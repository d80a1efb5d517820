// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory database fake for driver tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use graph_workload::{ComponentKind, Db, DbError, FieldMap};

/// In-memory implementation of [`Db`] for testing.
///
/// Clones share state, so a test can keep a handle while the driver owns
/// another. Records live in one ordered table per [`ComponentKind`]; keys
/// that parse as integers sort numerically, so scans walk ids in order.
///
/// # Example
///
/// ```
/// use graph_workload::{ComponentKind, Db, FieldMap};
/// use graph_workload_dry_tests::MemoryDb;
///
/// let db = MemoryDb::new();
/// let mut handle = db.clone();
/// handle.insert(ComponentKind::Node, "0", &FieldMap::new()).unwrap();
/// assert_eq!(db.insert_count(), 1);
/// assert!(db.contains(ComponentKind::Node, "0"));
/// ```
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Mutex<MemoryDbInner>>,
}

#[derive(Default)]
struct MemoryDbInner {
    nodes: BTreeMap<SortKey, FieldMap>,
    edges: BTreeMap<SortKey, FieldMap>,
    insert_count: usize,
    read_count: usize,
    update_count: usize,
    scan_count: usize,
    delete_count: usize,
    fail_on_insert: bool,
    fail_on_read: bool,
    fail_on_update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Id(u64),
    Text(String),
}

impl SortKey {
    fn new(key: &str) -> Self {
        key.parse().map_or_else(|_| Self::Text(key.to_owned()), Self::Id)
    }
}

impl MemoryDbInner {
    fn table(&mut self, kind: ComponentKind) -> &mut BTreeMap<SortKey, FieldMap> {
        match kind {
            ComponentKind::Node => &mut self.nodes,
            ComponentKind::Edge => &mut self.edges,
        }
    }
}

fn project(record: &FieldMap, fields: Option<&[&str]>) -> FieldMap {
    match fields {
        None => record.clone(),
        Some(names) => record
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    }
}

impl MemoryDb {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut MemoryDbInner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }

    /// Make every insert fail with a backend error.
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.with(|inner| inner.fail_on_insert = fail);
    }

    /// Make every read fail with a backend error.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.with(|inner| inner.fail_on_read = fail);
    }

    /// Make every update fail with a backend error.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.with(|inner| inner.fail_on_update = fail);
    }

    /// Insert calls so far, failed ones included.
    pub fn insert_count(&self) -> usize {
        self.with(|inner| inner.insert_count)
    }

    /// Read calls so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.with(|inner| inner.read_count)
    }

    /// Update calls so far, failed ones included.
    pub fn update_count(&self) -> usize {
        self.with(|inner| inner.update_count)
    }

    /// Scan calls so far.
    pub fn scan_count(&self) -> usize {
        self.with(|inner| inner.scan_count)
    }

    /// Delete calls so far.
    pub fn delete_count(&self) -> usize {
        self.with(|inner| inner.delete_count)
    }

    /// Number of stored records of `kind`.
    pub fn len(&self, kind: ComponentKind) -> usize {
        self.with(|inner| inner.table(kind).len())
    }

    /// `true` when no record of either kind is stored.
    pub fn is_empty(&self) -> bool {
        self.with(|inner| inner.nodes.is_empty() && inner.edges.is_empty())
    }

    /// `true` when a record of `kind` is stored under `key`.
    pub fn contains(&self, kind: ComponentKind, key: &str) -> bool {
        self.with(|inner| inner.table(kind).contains_key(&SortKey::new(key)))
    }

    /// Copy of the record of `kind` under `key`.
    pub fn get(&self, kind: ComponentKind, key: &str) -> Option<FieldMap> {
        self.with(|inner| inner.table(kind).get(&SortKey::new(key)).cloned())
    }
}

impl Db for MemoryDb {
    fn insert(&mut self, kind: ComponentKind, key: &str, fields: &FieldMap) -> Result<(), DbError> {
        self.with(|inner| {
            inner.insert_count += 1;
            if inner.fail_on_insert {
                return Err(DbError::Backend("insert disabled".into()));
            }
            inner.table(kind).insert(SortKey::new(key), fields.clone());
            Ok(())
        })
    }

    fn read(
        &mut self,
        kind: ComponentKind,
        key: &str,
        fields: Option<&[&str]>,
    ) -> Result<FieldMap, DbError> {
        self.with(|inner| {
            inner.read_count += 1;
            if inner.fail_on_read {
                return Err(DbError::Backend("read disabled".into()));
            }
            inner
                .table(kind)
                .get(&SortKey::new(key))
                .map(|record| project(record, fields))
                .ok_or(DbError::NotFound)
        })
    }

    fn update(&mut self, kind: ComponentKind, key: &str, fields: &FieldMap) -> Result<(), DbError> {
        self.with(|inner| {
            inner.update_count += 1;
            if inner.fail_on_update {
                return Err(DbError::Backend("update disabled".into()));
            }
            let record = inner
                .table(kind)
                .get_mut(&SortKey::new(key))
                .ok_or(DbError::NotFound)?;
            record.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        })
    }

    fn scan(
        &mut self,
        kind: ComponentKind,
        start_key: &str,
        count: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<FieldMap>, DbError> {
        self.with(|inner| {
            inner.scan_count += 1;
            let records: Vec<FieldMap> = inner
                .table(kind)
                .range(SortKey::new(start_key)..)
                .take(count)
                .map(|(_, record)| project(record, fields))
                .collect();
            if records.is_empty() {
                Err(DbError::NotFound)
            } else {
                Ok(records)
            }
        })
    }

    fn delete(&mut self, kind: ComponentKind, key: &str) -> Result<(), DbError> {
        self.with(|inner| {
            inner.delete_count += 1;
            inner
                .table(kind)
                .remove(&SortKey::new(key))
                .map(drop)
                .ok_or(DbError::NotFound)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use graph_workload::FieldValue;

    fn record(label: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("label".into(), FieldValue::from(label));
        fields.insert("id".into(), FieldValue::from("0"));
        fields
    }

    #[test]
    fn read_projects_requested_fields() {
        let mut db = MemoryDb::new();
        db.insert(ComponentKind::Node, "0", &record("Factory")).unwrap();
        let only_label = db.read(ComponentKind::Node, "0", Some(&["label"])).unwrap();
        assert_eq!(only_label.len(), 1);
        assert_eq!(db.read(ComponentKind::Node, "0", None).unwrap().len(), 2);
        assert_eq!(
            db.read(ComponentKind::Edge, "0", None),
            Err(DbError::NotFound)
        );
    }

    #[test]
    fn scan_walks_numeric_keys_in_order() {
        let mut db = MemoryDb::new();
        for id in [10_u64, 2, 9, 1] {
            db.insert(ComponentKind::Edge, &id.to_string(), &record(&id.to_string()))
                .unwrap();
        }
        let rows = db.scan(ComponentKind::Edge, "2", 2, Some(&["label"])).unwrap();
        let labels: Vec<_> = rows.iter().map(|r| r["label"].to_string()).collect();
        assert_eq!(labels, vec!["2", "9"]);
        assert_eq!(
            db.scan(ComponentKind::Edge, "11", 5, None),
            Err(DbError::NotFound)
        );
    }

    #[test]
    fn failure_toggles_and_counters() {
        let db = MemoryDb::new();
        let mut handle = db.clone();
        db.set_fail_on_insert(true);
        assert!(handle.insert(ComponentKind::Node, "1", &record("x")).is_err());
        db.set_fail_on_insert(false);
        handle.insert(ComponentKind::Node, "1", &record("x")).unwrap();
        assert_eq!(db.insert_count(), 2);
        assert_eq!(db.len(ComponentKind::Node), 1);

        db.set_fail_on_update(true);
        assert!(handle.update(ComponentKind::Node, "1", &record("y")).is_err());
        db.set_fail_on_update(false);
        handle.update(ComponentKind::Node, "1", &record("y")).unwrap();
        assert_eq!(db.get(ComponentKind::Node, "1").unwrap()["label"].to_string(), "y");

        handle.delete(ComponentKind::Node, "1").unwrap();
        assert!(db.is_empty());
        assert_eq!(db.delete_count(), 1);
    }
}
