// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Trace file layout, record/replay mode selection and line I/O.
//!
//! Every generator owns a fixed set of files in the dataset directory. If all
//! of them exist the generator replays them; if none exist it records them;
//! a partial set is deleted and recorded afresh. Files are append-only and
//! each record is flushed before the call that produced it returns, so a
//! crash leaves a valid prefix plus at most one partial final line, which
//! readers ignore.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::WorkloadError;
use crate::ids::ComponentKind;

/// Random chooser trace: node ids drawn.
pub const NODE_ID_TRACE: &str = "nodeIds.txt";
/// Random chooser trace: edge ids drawn.
pub const EDGE_ID_TRACE: &str = "edgeIds.txt";
/// Random chooser trace: node-or-edge bits drawn.
pub const COMPONENT_KIND_TRACE: &str = "componentIds.txt";
/// Operation order trace.
pub const OPERATION_TRACE: &str = "operations.txt";

/// Benchmark phase a dataset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Initial population of the target database.
    Load,
    /// Transactional phase against the populated database.
    Run,
}

impl Phase {
    /// Suffix used in component file names.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Run => "run",
        }
    }
}

/// File name of the component file for `kind` in `phase`, e.g. `Nodeload.json`.
pub fn component_file_name(kind: ComponentKind, phase: Phase) -> String {
    format!("{}{}.json", kind.table(), phase.suffix())
}

/// Paths of the node and edge files of `phase` under `directory`.
pub fn component_files(directory: &Path, phase: Phase) -> [PathBuf; 2] {
    ComponentKind::ALL.map(|kind| directory.join(component_file_name(kind, phase)))
}

/// Outcome of inspecting which of a generator's files exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSelection {
    /// No file exists: invent and persist new values.
    Record,
    /// Every file exists: replay them.
    Replay,
    /// Some but not all exist: delete the partial set, then record.
    RecoverThenRecord,
}

/// Mode a generator was opened in after any recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// Recorder: values are drawn and appended to the trace files.
    Record,
    /// Recreator: values come from existing trace files.
    Replay,
}

/// Pick the mode from the presence flags of a generator's files.
///
/// An empty file set records.
pub fn select_mode(present: &[bool]) -> ModeSelection {
    let existing = present.iter().filter(|&&p| p).count();
    if existing == 0 {
        ModeSelection::Record
    } else if existing == present.len() {
        ModeSelection::Replay
    } else {
        ModeSelection::RecoverThenRecord
    }
}

/// Make sure `directory` exists, creating it (and its parents) when absent.
pub fn ensure_directory(directory: &Path) -> Result<(), WorkloadError> {
    if directory.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(directory).map_err(|err| WorkloadError::configuration(directory, err))
}

/// Resolve the mode for `files`, deleting a partial set.
///
/// `owner` names the generator in log output.
pub fn resolve_mode(
    directory: &Path,
    files: &[PathBuf],
    owner: &str,
) -> Result<TraceMode, WorkloadError> {
    ensure_directory(directory)?;
    let present: Vec<bool> = files.iter().map(|file| file.exists()).collect();
    match select_mode(&present) {
        ModeSelection::Record => Ok(TraceMode::Record),
        ModeSelection::Replay => Ok(TraceMode::Replay),
        ModeSelection::RecoverThenRecord => {
            for (file, exists) in files.iter().zip(&present) {
                if *exists {
                    warn!(owner, file = %file.display(), "partial trace set, deleting");
                    fs::remove_file(file).map_err(|err| WorkloadError::configuration(file, err))?;
                } else {
                    warn!(owner, file = %file.display(), "trace file missing");
                }
            }
            info!(owner, "falling back to record mode");
            Ok(TraceMode::Record)
        }
    }
}

/// Delete whichever of `files` exist when the set is incomplete.
///
/// Returns `true` when the full set is present afterwards.
pub fn complete_or_discard(files: &[PathBuf], owner: &str) -> Result<bool, WorkloadError> {
    let present: Vec<bool> = files.iter().map(|file| file.exists()).collect();
    match select_mode(&present) {
        ModeSelection::Replay => Ok(true),
        ModeSelection::Record => Ok(false),
        ModeSelection::RecoverThenRecord => {
            for file in files.iter().filter(|file| file.exists()) {
                warn!(owner, file = %file.display(), "incomplete baseline, deleting");
                fs::remove_file(file).map_err(|err| WorkloadError::configuration(file, err))?;
            }
            Ok(false)
        }
    }
}

/// Append-only line writer; every line is flushed as it is written.
///
/// The handle is released when the writer is dropped.
#[derive(Debug)]
pub struct TraceWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl TraceWriter {
    /// Create `path`, which must not exist yet.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, WorkloadError> {
        let path = path.into();
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| WorkloadError::configuration(&path, err))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` plus a newline and flush.
    pub fn append(&mut self, line: &str) -> Result<(), WorkloadError> {
        let result = self
            .out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        result.map_err(|err| {
            tracing::error!(file = %self.path.display(), %err, "trace append failed");
            WorkloadError::io(&self.path, err)
        })
    }
}

/// Read the complete lines of `path`.
///
/// A final segment without a terminating newline is a torn write and is
/// dropped.
pub fn read_lines(path: &Path) -> Result<Vec<String>, WorkloadError> {
    let content = fs::read_to_string(path).map_err(|err| WorkloadError::io(path, err))?;
    let mut lines: Vec<String> = content.split('\n').map(str::to_owned).collect();
    // `split` always yields a last segment: empty after a trailing newline,
    // the torn record otherwise.
    if let Some(tail) = lines.pop() {
        if !tail.is_empty() {
            warn!(file = %path.display(), bytes = tail.len(), "dropping partial final line");
        }
    }
    Ok(lines)
}

/// Read a trace of unsigned integers, skipping malformed lines.
pub fn read_u64_trace(path: &Path) -> Result<Vec<u64>, WorkloadError> {
    let lines = read_lines(path)?;
    let mut values = Vec::with_capacity(lines.len());
    for (position, line) in lines.iter().enumerate() {
        match line.trim().parse::<u64>() {
            Ok(value) => values.push(value),
            Err(err) => {
                warn!(file = %path.display(), position, %err, "skipping malformed trace line");
            }
        }
    }
    Ok(values)
}
