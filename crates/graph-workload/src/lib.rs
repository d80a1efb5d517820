// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! graph-workload: deterministic graph workload generation and replay.
//!
//! A benchmark run is split into a *load* phase, which populates the target
//! database with a synthetic factory/order/product graph, and a *run* phase,
//! which issues read/update/insert/scan operations against it. The first time
//! a phase runs over a dataset directory every decision is recorded to plain
//! trace files; every later run replays those files, so different database
//! backends see bit-identical workloads.
//!
//! # Determinism Invariant
//!
//! A Recorder and a Recreator over the same directory produce identical
//! `(kind, id, label, fields)` streams. All state lives in the trace files:
//! no process-global counters, no wall clock, no iteration over hash maps on
//! an emission path.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

pub mod builder;
pub mod chooser;
pub mod codec;
pub mod config;
pub mod data;
pub mod db;
pub mod digest;
pub mod driver;
mod error;
pub mod ids;
pub mod model;
pub mod operations;
pub mod trace;

pub use builder::{BuilderConfig, GraphBuilder};
pub use chooser::{open_chooser, ComponentChooser, RandomComponentRecorder, RandomComponentRecreator};
pub use codec::{decode_record, encode_record, CodecError};
pub use config::WorkloadConfig;
pub use data::{open_graph_data, GraphDataRecorder, GraphDataRecreator, GraphDataSource};
pub use db::{Db, DbError};
pub use digest::StreamDigest;
pub use driver::{DriverStats, TransactionOutcome, WorkloadDriver};
pub use error::WorkloadError;
pub use ids::{ComponentKind, IdCounter};
pub use model::{Component, Edge, FieldMap, FieldValue, Graph, Node};
pub use operations::{
    open_operation_order, Operation, OperationMix, OperationOrderRecorder,
    OperationOrderRecreator, OperationSource,
};
pub use trace::{select_mode, ModeSelection, Phase, TraceMode};
