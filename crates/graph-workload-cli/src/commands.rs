// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use graph_workload::trace::component_files;
use graph_workload::{
    GraphDataRecreator, GraphDataSource, IdCounter, Operation, Phase, StreamDigest,
    WorkloadConfig, WorkloadDriver,
};
use tracing::info;

use crate::cli::{Cli, Command};
use crate::discard::DiscardDb;

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = effective_config(&cli)?;
    let mut out = io::stdout().lock();
    match cli.command {
        Command::Load { records } => load(&config, records, &mut out),
        Command::Run { operations } => transactions(&config, operations, &mut out),
        Command::Verify { phase } => verify(&config, phase.into(), &mut out),
        Command::WriteConfig { path } => {
            config
                .save_json_file(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            writeln!(out, "wrote {}", path.display())?;
            Ok(())
        }
    }
}

fn effective_config(cli: &Cli) -> Result<WorkloadConfig> {
    let mut config = match &cli.config {
        Some(path) => WorkloadConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => WorkloadConfig::default(),
    };
    if let Some(dir) = &cli.dir {
        config.data_set_directory.clone_from(dir);
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(count) = cli.test_parameter_count {
        config.test_parameter_count = count;
    }
    if let Some(products) = cli.products_per_order {
        config.products_per_order = products;
    }
    if let Some(size) = cli.node_byte_size {
        config.node_byte_size = size;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load(config: &WorkloadConfig, records: u64, out: &mut impl Write) -> Result<()> {
    let mut driver = WorkloadDriver::open(config, Phase::Load, Arc::new(IdCounter::new()))
        .context("failed to open load phase")?;
    let mut db = DiscardDb::default();
    let mut digest = StreamDigest::new();
    for _ in 0..records {
        if !driver.do_insert(&mut db)? {
            break;
        }
        digest.update(&driver.data().last_value())?;
    }
    info!(writes = db.writes, "load phase finished");
    writeln!(out, "mode: {:?}", driver.data().mode())?;
    writeln!(out, "increments: {}", digest.increments())?;
    writeln!(out, "components: {}", digest.components())?;
    writeln!(out, "digest: {}", digest.hex())?;
    Ok(())
}

fn transactions(config: &WorkloadConfig, operations: u64, out: &mut impl Write) -> Result<()> {
    let mut driver = WorkloadDriver::open(config, Phase::Run, Arc::new(IdCounter::new()))
        .context("failed to open run phase")?;
    let mut db = DiscardDb::default();
    let mut exhausted = false;
    for _ in 0..operations {
        if driver.do_transaction(&mut db)?.is_exhausted() {
            exhausted = true;
            break;
        }
    }
    info!(reads = db.reads, writes = db.writes, "run phase finished");
    let stats = driver.stats();
    writeln!(out, "mode: {:?}", driver.data().mode())?;
    writeln!(out, "transactions: {}", stats.transactions())?;
    for op in Operation::ALL {
        writeln!(
            out,
            "{op}: completed={} failed={}",
            stats.completed(op),
            stats.failed(op)
        )?;
    }
    if exhausted {
        writeln!(out, "exhausted: true")?;
    }
    Ok(())
}

fn replay_digest(directory: &Path, phase: Phase) -> Result<StreamDigest> {
    let mut source = GraphDataRecreator::open(directory, phase, Arc::new(IdCounter::new()))?;
    let mut digest = StreamDigest::new();
    loop {
        let graph = source.next_value()?;
        if graph.is_empty() {
            return Ok(digest);
        }
        digest.update(&graph)?;
    }
}

fn verify(config: &WorkloadConfig, phase: Phase, out: &mut impl Write) -> Result<()> {
    let directory = config.data_set_directory.as_path();
    if !component_files(directory, phase).iter().all(|f| f.exists()) {
        bail!(
            "no recorded {} dataset in {}",
            phase.suffix(),
            directory.display()
        );
    }
    let first = replay_digest(directory, phase)?;
    let second = replay_digest(directory, phase)?;
    if first.finalize() != second.finalize() || first.increments() != second.increments() {
        bail!(
            "replays diverge: {} ({} increments) vs {} ({} increments)",
            first.hex(),
            first.increments(),
            second.hex(),
            second.increments()
        );
    }
    writeln!(out, "phase: {}", phase.suffix())?;
    writeln!(out, "increments: {}", first.increments())?;
    writeln!(out, "components: {}", first.components())?;
    writeln!(out, "digest: {}", first.hex())?;
    writeln!(out, "verified")?;
    Ok(())
}
