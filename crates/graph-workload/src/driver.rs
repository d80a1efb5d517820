// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Workload driver: feeds the generators' output into a [`Db`].
//!
//! The load phase only inserts increments. The run phase pulls one operation
//! per transaction from the operation order and, for reads, updates and
//! scans, picks its target through the component chooser.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chooser::{open_chooser, ComponentChooser};
use crate::config::WorkloadConfig;
use crate::data::{open_graph_data, GraphDataSource};
use crate::db::{component_key, Db};
use crate::error::WorkloadError;
use crate::ids::IdCounter;
use crate::model::{Component, Graph};
use crate::operations::{open_operation_order, Operation, OperationSource};
use crate::trace::Phase;

/// Result of one [`WorkloadDriver::do_transaction`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The operation ran and the database accepted it.
    Completed(Operation),
    /// The operation ran but failed (database error or unresolved target).
    Failed(Operation),
    /// A replayed trace ended; the run phase is over.
    Exhausted,
}

impl TransactionOutcome {
    /// `true` for [`TransactionOutcome::Exhausted`].
    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Counters kept by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Increments handed to the database.
    pub increments: u64,
    /// Components inserted successfully.
    pub inserted: u64,
    /// Insert calls the database rejected.
    pub insert_failures: u64,
    completed: BTreeMap<Operation, u64>,
    failed: BTreeMap<Operation, u64>,
}

impl DriverStats {
    /// Completed transactions of `op`.
    pub fn completed(&self, op: Operation) -> u64 {
        self.completed.get(&op).copied().unwrap_or(0)
    }

    /// Failed transactions of `op`.
    pub fn failed(&self, op: Operation) -> u64 {
        self.failed.get(&op).copied().unwrap_or(0)
    }

    /// All transactions that ran, completed or failed.
    pub fn transactions(&self) -> u64 {
        self.completed.values().chain(self.failed.values()).sum()
    }

    fn record(&mut self, outcome: TransactionOutcome) {
        match outcome {
            TransactionOutcome::Completed(op) => *self.completed.entry(op).or_default() += 1,
            TransactionOutcome::Failed(op) => *self.failed.entry(op).or_default() += 1,
            TransactionOutcome::Exhausted => {}
        }
    }
}

/// Per-stream seed so payloads, choices and the operation mix don't share
/// one random sequence.
fn stream_seed(seed: Option<u64>, stream: u64) -> Option<u64> {
    seed.map(|s| s ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Orchestrates one phase over a dataset directory.
pub struct WorkloadDriver {
    config: WorkloadConfig,
    phase: Phase,
    data: Box<dyn GraphDataSource>,
    chooser: Option<Box<dyn ComponentChooser>>,
    order: Option<Box<dyn OperationSource>>,
    stats: DriverStats,
}

impl std::fmt::Debug for WorkloadDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadDriver")
            .field("phase", &self.phase)
            .field("data", &self.data.mode())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl WorkloadDriver {
    /// Open the generators of `phase` over `config.data_set_directory`.
    ///
    /// The run phase also opens the component chooser and the operation
    /// order. `counter` is shared with every generator.
    pub fn open(
        config: &WorkloadConfig,
        phase: Phase,
        counter: Arc<IdCounter>,
    ) -> Result<Self, WorkloadError> {
        config.validate()?;
        let directory = &config.data_set_directory;
        let data = open_graph_data(
            directory,
            phase,
            config.builder(),
            stream_seed(config.seed, 0),
            Arc::clone(&counter),
        )?;
        let (chooser, order) = match phase {
            Phase::Load => (None, None),
            Phase::Run => (
                Some(open_chooser(directory, stream_seed(config.seed, 1), counter)?),
                Some(open_operation_order(
                    directory,
                    &config.operations,
                    stream_seed(config.seed, 2),
                )?),
            ),
        };
        info!(phase = phase.suffix(), dir = %directory.display(), "workload driver ready");
        Ok(Self {
            config: config.clone(),
            phase,
            data,
            chooser,
            order,
            stats: DriverStats::default(),
        })
    }

    /// Phase this driver runs.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Counters so far.
    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    /// Underlying graph data source.
    pub fn data(&self) -> &dyn GraphDataSource {
        self.data.as_ref()
    }

    /// Insert the next increment.
    ///
    /// `Ok(false)` once a replayed dataset is exhausted or when the database
    /// rejected an insert.
    pub fn do_insert(&mut self, db: &mut dyn Db) -> Result<bool, WorkloadError> {
        let graph = self.data.next_value()?;
        if graph.is_empty() {
            info!(phase = self.phase.suffix(), "graph data exhausted");
            return Ok(false);
        }
        Ok(self.insert_graph(db, &graph))
    }

    fn insert_graph(&mut self, db: &mut dyn Db, graph: &Graph) -> bool {
        self.stats.increments += 1;
        for component in graph.components() {
            let key = component_key(component.id());
            if let Err(err) = db.insert(component.kind(), &key, &component.fields()) {
                warn!(kind = %component.kind(), key, %err, "insert failed");
                self.stats.insert_failures += 1;
                return false;
            }
            self.stats.inserted += 1;
        }
        true
    }

    /// Run one transaction of the run phase.
    pub fn do_transaction(&mut self, db: &mut dyn Db) -> Result<TransactionOutcome, WorkloadError> {
        let Some(order) = self.order.as_mut() else {
            return Err(WorkloadError::InvalidConfig(
                "transactions require a run phase driver".into(),
            ));
        };
        let Some(op) = order.next_operation()? else {
            info!("operation order exhausted");
            return Ok(TransactionOutcome::Exhausted);
        };

        let outcome = if op == Operation::Insert {
            let graph = self.data.next_value()?;
            if graph.is_empty() {
                info!("graph data exhausted during insert");
                TransactionOutcome::Exhausted
            } else if self.insert_graph(db, &graph) {
                TransactionOutcome::Completed(op)
            } else {
                TransactionOutcome::Failed(op)
            }
        } else {
            let Some(chooser) = self.chooser.as_mut() else {
                return Err(WorkloadError::InvalidConfig(
                    "transactions require a run phase driver".into(),
                ));
            };
            let target = chooser.choose(self.data.as_ref())?;
            let exhausted = chooser.is_exhausted();
            match target {
                Some(target) => self.apply(db, op, &target),
                None if exhausted => TransactionOutcome::Exhausted,
                None => TransactionOutcome::Failed(op),
            }
        };
        debug!(?outcome, "transaction");
        self.stats.record(outcome);
        Ok(outcome)
    }

    fn apply(&self, db: &mut dyn Db, op: Operation, target: &Component) -> TransactionOutcome {
        let kind = target.kind();
        let key = component_key(target.id());
        let fields = Some(kind.field_names());
        let result = match op {
            Operation::Read => db.read(kind, &key, fields).map(drop),
            Operation::Update => db
                .read(kind, &key, fields)
                .and_then(|values| db.update(kind, &key, &values)),
            Operation::Scan => db
                .scan(kind, &key, self.config.max_scan_length, fields)
                .map(drop),
            Operation::ReadModifyWrite => db
                .read(kind, &key, fields)
                .and_then(|_| db.update(kind, &key, &target.fields())),
            Operation::Insert => Ok(()),
        };
        match result {
            Ok(()) => TransactionOutcome::Completed(op),
            Err(err) => {
                warn!(%op, %kind, key, %err, "transaction failed");
                TransactionOutcome::Failed(op)
            }
        }
    }
}
