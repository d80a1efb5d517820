// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for graph-workload crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`db`] - In-memory [`Db`](graph_workload::Db) fake with call counters
//! - [`source`] - Static [`GraphDataSource`](graph_workload::GraphDataSource)
//! - [`dataset`] - Scratch dataset directories and seeded configs

pub mod dataset;
pub mod db;
pub mod source;

pub use dataset::ScratchDataset;
pub use db::MemoryDb;
pub use source::StaticGraphSource;
