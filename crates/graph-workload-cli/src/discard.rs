// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use graph_workload::{ComponentKind, Db, DbError, FieldMap};

/// Sink that accepts everything and stores nothing.
///
/// Lets the phases run end to end so the dataset directory gets recorded
/// without a database behind it. Reads and scans return empty results.
#[derive(Debug, Default)]
pub struct DiscardDb {
    pub writes: u64,
    pub reads: u64,
}

impl Db for DiscardDb {
    fn insert(&mut self, _: ComponentKind, _: &str, _: &FieldMap) -> Result<(), DbError> {
        self.writes += 1;
        Ok(())
    }

    fn read(
        &mut self,
        _: ComponentKind,
        _: &str,
        _: Option<&[&str]>,
    ) -> Result<FieldMap, DbError> {
        self.reads += 1;
        Ok(FieldMap::new())
    }

    fn update(&mut self, _: ComponentKind, _: &str, _: &FieldMap) -> Result<(), DbError> {
        self.writes += 1;
        Ok(())
    }

    fn scan(
        &mut self,
        _: ComponentKind,
        _: &str,
        _: usize,
        _: Option<&[&str]>,
    ) -> Result<Vec<FieldMap>, DbError> {
        self.reads += 1;
        Ok(Vec::new())
    }

    fn delete(&mut self, _: ComponentKind, _: &str) -> Result<(), DbError> {
        self.writes += 1;
        Ok(())
    }
}
