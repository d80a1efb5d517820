// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use graph_workload::Phase;

#[derive(Parser, Debug)]
#[command(name = "graph-workload", author, version)]
#[command(about = "Record, replay and verify deterministic graph workloads")]
pub struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Dataset directory holding every trace file
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,
    /// Seed for newly recorded traces (ignored when replaying)
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    /// TestParameterNr nodes per product
    #[arg(long, global = true)]
    pub test_parameter_count: Option<u32>,
    /// Products per order (at least 1)
    #[arg(long, global = true)]
    pub products_per_order: Option<u32>,
    /// Random payload bytes per node
    #[arg(long, global = true)]
    pub node_byte_size: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Insert load-phase increments (records on first use, replays after)
    Load {
        /// Maximum number of increments
        #[arg(long, default_value_t = 1000)]
        records: u64,
    },
    /// Run transactions against the loaded dataset
    Run {
        /// Maximum number of transactions; stops early when a replay ends
        #[arg(long, default_value_t = 1000)]
        operations: u64,
    },
    /// Replay a recorded phase twice and compare the streams
    Verify {
        /// Phase whose component files are checked
        #[arg(long, value_enum, default_value_t = PhaseArg::Load)]
        phase: PhaseArg,
    },
    /// Write the effective configuration as JSON
    WriteConfig {
        /// Output path
        path: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Load,
    Run,
}

impl From<PhaseArg> for Phase {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::Load => Self::Load,
            PhaseArg::Run => Self::Run,
        }
    }
}
