// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Line codec for persisted components.
//!
//! One record per line: `Key-<index>-<json>`, where `<index>` is the record's
//! 0-based position in its file and `<json>` is the component's field map.
//! Every value carries its type discriminator, so byte payloads come back
//! bit-exact.

use thiserror::Error;

use crate::model::FieldMap;

/// Prefix of every persisted record.
pub const KEY_PREFIX: &str = "Key-";

/// Errors raised by the record codec and by field map conversion.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The line does not start with `Key-`.
    #[error("record does not start with {KEY_PREFIX:?}")]
    MissingPrefix,
    /// The index between the prefix and the payload is missing or not a number.
    #[error("record index {0:?} is not an unsigned integer")]
    BadIndex(String),
    /// The embedded index disagrees with the line position.
    #[error("record index {found} found at position {expected}")]
    IndexMismatch {
        /// Line position of the record.
        expected: u64,
        /// Index embedded in the record.
        found: u64,
    },
    /// The payload is not a valid field map.
    #[error("record payload: {0}")]
    Json(#[from] serde_json::Error),
    /// A required field is absent.
    #[error("missing field {0:?}")]
    MissingField(&'static str),
    /// A field is present but unusable.
    #[error("invalid field {field:?}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Encode `fields` as the record at position `index` (no trailing newline).
pub fn encode_record(index: u64, fields: &FieldMap) -> Result<String, CodecError> {
    let payload = serde_json::to_string(fields)?;
    Ok(format!("{KEY_PREFIX}{index}-{payload}"))
}

/// Decode one record line into its index and field map.
pub fn decode_record(line: &str) -> Result<(u64, FieldMap), CodecError> {
    let rest = line
        .strip_prefix(KEY_PREFIX)
        .ok_or(CodecError::MissingPrefix)?;
    let (index, payload) = rest
        .split_once('-')
        .ok_or_else(|| CodecError::BadIndex(rest.chars().take(20).collect()))?;
    let index = index
        .parse::<u64>()
        .map_err(|_| CodecError::BadIndex(index.to_owned()))?;
    let fields = serde_json::from_str(payload)?;
    Ok((index, fields))
}

/// Decode the record expected at `position`, rejecting a mismatched index.
pub fn decode_record_at(position: u64, line: &str) -> Result<FieldMap, CodecError> {
    let (index, fields) = decode_record(line)?;
    if index != position {
        return Err(CodecError::IndexMismatch {
            expected: position,
            found: index,
        });
    }
    Ok(fields)
}
