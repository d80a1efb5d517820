// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation order for the run phase, recorded to `operations.txt`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::WorkloadError;
use crate::trace::{self, read_lines, TraceMode, TraceWriter, OPERATION_TRACE};

/// Transactional operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// Read one component.
    Read,
    /// Read one component and write back the values read.
    Update,
    /// Insert the next graph increment.
    Insert,
    /// Scan a run of components starting at one.
    Scan,
    /// Read one component and write back its own field map.
    ReadModifyWrite,
}

impl Operation {
    /// Every operation, in label order of the default mix.
    pub const ALL: [Operation; 5] = [
        Operation::Read,
        Operation::Update,
        Operation::Insert,
        Operation::Scan,
        Operation::ReadModifyWrite,
    ];

    /// Trace label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Insert => "INSERT",
            Self::Scan => "SCAN",
            Self::ReadModifyWrite => "READMODIFYWRITE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A trace line that is not an operation label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation {0:?}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.label() == s)
            .ok_or_else(|| UnknownOperation(s.to_owned()))
    }
}

/// Relative weights of the operation types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationMix {
    /// Weight of [`Operation::Read`].
    pub read: f64,
    /// Weight of [`Operation::Update`].
    pub update: f64,
    /// Weight of [`Operation::Insert`].
    pub insert: f64,
    /// Weight of [`Operation::Scan`].
    pub scan: f64,
    /// Weight of [`Operation::ReadModifyWrite`].
    pub read_modify_write: f64,
}

impl Default for OperationMix {
    fn default() -> Self {
        Self {
            read: 0.95,
            update: 0.05,
            insert: 0.0,
            scan: 0.0,
            read_modify_write: 0.0,
        }
    }
}

impl OperationMix {
    /// Weights in [`Operation::ALL`] order.
    pub fn weights(&self) -> [f64; 5] {
        [
            self.read,
            self.update,
            self.insert,
            self.scan,
            self.read_modify_write,
        ]
    }

    /// Reject negative or non-finite weights and an all-zero mix.
    pub fn validate(&self) -> Result<(), WorkloadError> {
        let weights = self.weights();
        if let Some(op) = Operation::ALL
            .iter()
            .zip(weights)
            .find_map(|(op, w)| (!w.is_finite() || w < 0.0).then_some(op))
        {
            return Err(WorkloadError::InvalidConfig(format!(
                "operation weight for {op} must be finite and non-negative"
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(WorkloadError::InvalidConfig(
                "operation weights sum to zero".into(),
            ));
        }
        Ok(())
    }

    fn distribution(&self) -> Result<WeightedIndex<f64>, WorkloadError> {
        self.validate()?;
        WeightedIndex::new(self.weights())
            .map_err(|err| WorkloadError::InvalidConfig(format!("operation mix: {err}")))
    }
}

/// Supplies the next operation type of the run phase.
pub trait OperationSource {
    /// Next operation, or `None` once a replayed order is exhausted.
    fn next_operation(&mut self) -> Result<Option<Operation>, WorkloadError>;

    /// Operation returned by the previous call.
    fn last_value(&self) -> Option<Operation>;

    /// Record or replay.
    fn mode(&self) -> TraceMode;
}

/// Open the operation order in `directory`.
pub fn open_operation_order(
    directory: &Path,
    mix: &OperationMix,
    seed: Option<u64>,
) -> Result<Box<dyn OperationSource>, WorkloadError> {
    let files = [directory.join(OPERATION_TRACE)];
    let source: Box<dyn OperationSource> =
        match trace::resolve_mode(directory, &files, "operation order")? {
            TraceMode::Record => Box::new(OperationOrderRecorder::create(directory, mix, seed)?),
            TraceMode::Replay => Box::new(OperationOrderRecreator::open(directory)?),
        };
    info!(mode = ?source.mode(), "operation order opened");
    Ok(source)
}

/// Draws operations from an [`OperationMix`] and appends their labels.
#[derive(Debug)]
pub struct OperationOrderRecorder {
    rng: StdRng,
    distribution: WeightedIndex<f64>,
    out: TraceWriter,
    last: Option<Operation>,
}

impl OperationOrderRecorder {
    /// Create `operations.txt` in `directory`.
    pub fn create(
        directory: &Path,
        mix: &OperationMix,
        seed: Option<u64>,
    ) -> Result<Self, WorkloadError> {
        let distribution = mix.distribution()?;
        trace::ensure_directory(directory)?;
        Ok(Self {
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
            distribution,
            out: TraceWriter::create(directory.join(OPERATION_TRACE))?,
            last: None,
        })
    }
}

impl OperationSource for OperationOrderRecorder {
    fn next_operation(&mut self) -> Result<Option<Operation>, WorkloadError> {
        let index = self.distribution.sample(&mut self.rng);
        let op = Operation::ALL[index];
        self.out.append(op.label())?;
        self.last = Some(op);
        Ok(self.last)
    }

    fn last_value(&self) -> Option<Operation> {
        self.last
    }

    fn mode(&self) -> TraceMode {
        TraceMode::Record
    }
}

/// Replays `operations.txt` line by line.
#[derive(Debug)]
pub struct OperationOrderRecreator {
    order: Vec<Operation>,
    position: usize,
    last: Option<Operation>,
}

impl OperationOrderRecreator {
    /// Read `operations.txt` from `directory`, skipping unknown labels.
    pub fn open(directory: &Path) -> Result<Self, WorkloadError> {
        let path = directory.join(OPERATION_TRACE);
        let mut order = Vec::new();
        for (position, line) in read_lines(&path)?.iter().enumerate() {
            match line.trim().parse::<Operation>() {
                Ok(op) => order.push(op),
                Err(err) => warn!(position, %err, "skipping operation trace line"),
            }
        }
        info!(operations = order.len(), "operation order ready");
        Ok(Self {
            order,
            position: 0,
            last: None,
        })
    }

    /// Operations not replayed yet.
    pub fn remaining(&self) -> usize {
        self.order.len() - self.position
    }
}

impl OperationSource for OperationOrderRecreator {
    fn next_operation(&mut self) -> Result<Option<Operation>, WorkloadError> {
        self.last = self.order.get(self.position).copied();
        if self.last.is_some() {
            self.position += 1;
        }
        Ok(self.last)
    }

    fn last_value(&self) -> Option<Operation> {
        self.last
    }

    fn mode(&self) -> TraceMode {
        TraceMode::Replay
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn labels_parse_back() {
        for op in Operation::ALL {
            assert_eq!(op.label().parse::<Operation>().unwrap(), op);
        }
        assert_eq!(
            "read".parse::<Operation>(),
            Err(UnknownOperation("read".into()))
        );
    }

    #[test]
    fn mix_validation() {
        assert!(OperationMix::default().validate().is_ok());
        let zero = OperationMix {
            read: 0.0,
            update: 0.0,
            ..OperationMix::default()
        };
        assert!(zero.validate().is_err());
        let negative = OperationMix {
            scan: -1.0,
            ..OperationMix::default()
        };
        assert!(negative.validate().is_err());
        let nan = OperationMix {
            insert: f64::NAN,
            ..OperationMix::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn single_weight_mix_always_draws_that_operation() {
        let dir = tempfile::tempdir().unwrap();
        let mix = OperationMix {
            read: 0.0,
            update: 0.0,
            scan: 1.0,
            ..OperationMix::default()
        };
        let mut order = OperationOrderRecorder::create(dir.path(), &mix, None).unwrap();
        for _ in 0..10 {
            assert_eq!(order.next_operation().unwrap(), Some(Operation::Scan));
        }
        assert_eq!(order.last_value(), Some(Operation::Scan));
    }

    #[test]
    fn recreator_skips_unknown_lines_and_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OPERATION_TRACE), "READ\nFLY\nSCAN\nUPD").unwrap();
        let mut order = OperationOrderRecreator::open(dir.path()).unwrap();
        assert_eq!(order.remaining(), 2);
        assert_eq!(order.next_operation().unwrap(), Some(Operation::Read));
        assert_eq!(order.next_operation().unwrap(), Some(Operation::Scan));
        assert_eq!(order.next_operation().unwrap(), None);
        assert_eq!(order.next_operation().unwrap(), None);
        assert_eq!(order.last_value(), None);
    }

    #[test]
    fn mix_json_uses_camel_case() {
        let json = serde_json::to_value(OperationMix::default()).unwrap();
        assert_eq!(json["readModifyWrite"], 0.0);
        let mix: OperationMix = serde_json::from_str(r#"{"scan":0.5}"#).unwrap();
        assert!((mix.read - 0.95).abs() < f64::EPSILON);
        assert!((mix.scan - 0.5).abs() < f64::EPSILON);
    }
}
