// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

/// Errors raised while preparing or driving a workload.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// A dataset directory or trace file could not be created or opened.
    /// Fatal: the workload cannot start.
    #[error("cannot prepare {}: {source}", path.display())]
    Configuration {
        /// Directory or file that could not be prepared.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration values are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Reading or appending a trace file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Recorded components do not match the structure they were built from,
    /// e.g. a load baseline with missing ids.
    #[error("data integrity: {0}")]
    Integrity(String),
    /// A record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// A configuration file was not valid JSON for [`crate::WorkloadConfig`].
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkloadError {
    pub(crate) fn configuration(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Configuration {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
