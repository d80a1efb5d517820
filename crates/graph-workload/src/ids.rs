// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Component kinds and the injected identifier counter.
//!
//! Node and edge ids come from two independent monotonic sequences. The
//! counter is a value handed to whoever needs it (usually behind an `Arc`),
//! never a process global, so two workloads in one process cannot leak ids
//! into each other.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Field name of a component's id.
pub const ID_FIELD: &str = "id";
/// Field name of a component's label.
pub const LABEL_FIELD: &str = "label";
/// Field name of a node's opaque payload.
pub const VALUE_FIELD: &str = "value";
/// Field name of an edge's start node id.
pub const START_FIELD: &str = "start";
/// Field name of an edge's end node id.
pub const END_FIELD: &str = "end";

const NODE_FIELDS: [&str; 3] = [ID_FIELD, LABEL_FIELD, VALUE_FIELD];
const EDGE_FIELDS: [&str; 4] = [ID_FIELD, LABEL_FIELD, START_FIELD, END_FIELD];

/// The two kinds of graph component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    /// A graph vertex.
    Node,
    /// A directed graph edge.
    Edge,
}

impl ComponentKind {
    /// Both kinds, in canonical order.
    pub const ALL: [ComponentKind; 2] = [ComponentKind::Node, ComponentKind::Edge];

    /// Table name used for file prefixes and at the database boundary.
    pub fn table(self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::Edge => "Edge",
        }
    }

    /// Fixed field key set of this kind.
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            Self::Node => &NODE_FIELDS,
            Self::Edge => &EDGE_FIELDS,
        }
    }

    /// Kind bit as written to the component trace (`0` node, `1` edge).
    pub fn trace_bit(self) -> u64 {
        match self {
            Self::Node => 0,
            Self::Edge => 1,
        }
    }

    /// Inverse of [`trace_bit`](Self::trace_bit). Any non-zero bit is an edge.
    pub fn from_trace_bit(bit: u64) -> Self {
        if bit == 0 {
            Self::Node
        } else {
            Self::Edge
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Monotonic id source, one sequence per [`ComponentKind`].
///
/// Each sequence starts at 0. Increments are single atomic read-modify-write
/// operations, so concurrent callers are serialized and never observe the
/// same id twice.
#[derive(Debug, Default)]
pub struct IdCounter {
    nodes: AtomicU64,
    edges: AtomicU64,
}

impl IdCounter {
    /// Create a counter whose sequences both start at 0.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: ComponentKind) -> &AtomicU64 {
        match kind {
            ComponentKind::Node => &self.nodes,
            ComponentKind::Edge => &self.edges,
        }
    }

    /// Return the next id for `kind` and advance the sequence.
    pub fn next_id(&self, kind: ComponentKind) -> u64 {
        self.slot(kind).fetch_add(1, Ordering::SeqCst)
    }

    /// Continue the sequence for `kind` after `last_used`.
    ///
    /// The next call to [`next_id`](Self::next_id) returns `last_used + 1`.
    pub fn preset_id(&self, kind: ComponentKind, last_used: u64) {
        self.slot(kind).store(last_used.saturating_add(1), Ordering::SeqCst);
    }

    /// Raise the sequence so that `id` counts as issued. Never lowers it.
    pub fn observe(&self, kind: ComponentKind, id: u64) {
        self.slot(kind)
            .fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }

    /// Number of ids issued so far for `kind` (the next id to be handed out).
    pub fn issued(&self, kind: ComponentKind) -> u64 {
        self.slot(kind).load(Ordering::SeqCst)
    }

    /// Restart both sequences at 0.
    pub fn reset(&self) {
        self.nodes.store(0, Ordering::SeqCst);
        self.edges.store(0, Ordering::SeqCst);
    }
}
