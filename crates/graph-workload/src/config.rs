// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Workload configuration, persisted as camelCase JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::builder::BuilderConfig;
use crate::error::WorkloadError;
use crate::operations::OperationMix;

/// Every tunable of a workload. Missing JSON keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkloadConfig {
    /// `TestParameterNr:n` nodes per product.
    pub test_parameter_count: u32,
    /// Products per order; at least 1.
    pub products_per_order: u32,
    /// Random payload bytes per node.
    pub node_byte_size: usize,
    /// Directory holding every trace file of the dataset.
    pub data_set_directory: PathBuf,
    /// Record count requested by scan operations.
    pub max_scan_length: usize,
    /// Operation weights of the run phase.
    pub operations: OperationMix,
    /// Seed for payloads, choices and the operation mix. `None` uses OS
    /// entropy; a replayed dataset ignores it.
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        let builder = BuilderConfig::default();
        Self {
            test_parameter_count: builder.test_parameter_count,
            products_per_order: builder.products_per_order,
            node_byte_size: builder.node_byte_size,
            data_set_directory: PathBuf::from("./benchmarkingData/"),
            max_scan_length: 1000,
            operations: OperationMix::default(),
            seed: None,
        }
    }
}

impl WorkloadConfig {
    /// Load and validate a config file.
    pub fn from_json_file(path: &Path) -> Result<Self, WorkloadError> {
        let bytes = fs::read(path).map_err(|err| WorkloadError::configuration(path, err))?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save_json_file(&self, path: &Path) -> Result<(), WorkloadError> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data).map_err(|err| WorkloadError::io(path, err))
    }

    /// Reject values the generators cannot work with.
    pub fn validate(&self) -> Result<(), WorkloadError> {
        if self.products_per_order == 0 {
            return Err(WorkloadError::InvalidConfig(
                "productsPerOrder must be at least 1".into(),
            ));
        }
        self.operations.validate()
    }

    /// Graph builder parameters.
    pub fn builder(&self) -> BuilderConfig {
        BuilderConfig {
            test_parameter_count: self.test_parameter_count,
            products_per_order: self.products_per_order,
            node_byte_size: self.node_byte_size,
        }
    }
}
