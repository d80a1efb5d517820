// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scratch dataset directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use graph_workload::{IdCounter, WorkloadConfig};
use tempfile::TempDir;

/// A temporary dataset directory removed on drop, plus a small seeded
/// configuration pointing at it.
#[derive(Debug)]
pub struct ScratchDataset {
    dir: TempDir,
    config: WorkloadConfig,
}

impl ScratchDataset {
    /// Default seed of scratch configs.
    pub const SEED: u64 = 0x5EED;

    /// New empty directory with a small graph (`test_parameter_count` 2,
    /// `products_per_order` 2, 32-byte payloads).
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = WorkloadConfig {
            test_parameter_count: 2,
            products_per_order: 2,
            node_byte_size: 32,
            data_set_directory: dir.path().to_path_buf(),
            seed: Some(Self::SEED),
            ..WorkloadConfig::default()
        };
        Ok(Self { dir, config })
    }

    /// Replace the graph shape of the config.
    pub fn with_shape(mut self, test_parameter_count: u32, products_per_order: u32) -> Self {
        self.config.test_parameter_count = test_parameter_count;
        self.config.products_per_order = products_per_order;
        self
    }

    /// Dataset directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the dataset directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Config pointing at the directory.
    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Mutable config.
    pub fn config_mut(&mut self) -> &mut WorkloadConfig {
        &mut self.config
    }

    /// Fresh counter, as a new process would start with.
    pub fn counter() -> Arc<IdCounter> {
        Arc::new(IdCounter::new())
    }

    /// Names of the files currently in the directory, sorted.
    pub fn file_names(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.dir.path())? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
