// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Database boundary consumed by the workload driver.
//!
//! Adapters for concrete backends implement [`Db`]; the workload only ever
//! talks to this trait. `kind` selects the table ([`ComponentKind::table`])
//! and `key` is the component id in decimal.

use thiserror::Error;

use crate::ids::ComponentKind;
use crate::model::FieldMap;

/// Failure reported by a [`Db`] adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// No record under the requested key.
    #[error("not found")]
    NotFound,
    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Abstract CRUD interface of a benchmarked database.
pub trait Db {
    /// Store `fields` under `key`.
    fn insert(&mut self, kind: ComponentKind, key: &str, fields: &FieldMap) -> Result<(), DbError>;

    /// Read the record under `key`. `fields` restricts the returned fields;
    /// `None` returns all of them.
    fn read(
        &mut self,
        kind: ComponentKind,
        key: &str,
        fields: Option<&[&str]>,
    ) -> Result<FieldMap, DbError>;

    /// Overwrite the given fields of the record under `key`.
    fn update(&mut self, kind: ComponentKind, key: &str, fields: &FieldMap) -> Result<(), DbError>;

    /// Read up to `count` records starting at `start_key`.
    fn scan(
        &mut self,
        kind: ComponentKind,
        start_key: &str,
        count: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<FieldMap>, DbError>;

    /// Remove the record under `key`.
    fn delete(&mut self, kind: ComponentKind, key: &str) -> Result<(), DbError>;
}

/// Database key of a component id.
pub fn component_key(id: u64) -> String {
    id.to_string()
}
