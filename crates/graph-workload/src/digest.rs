// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! BLAKE3 digest of a component stream.
//!
//! Two streams hash equal exactly when they emit the same components (kind,
//! id, label and encoded fields) in the same order. Used to compare a
//! recorded run against its replay without keeping either in memory.

use crate::codec::{encode_record, CodecError};
use crate::model::{Component, Graph};

/// Incremental digest over emitted components.
#[derive(Debug, Clone, Default)]
pub struct StreamDigest {
    hasher: blake3::Hasher,
    components: u64,
    increments: u64,
}

impl StreamDigest {
    /// Empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one increment into the digest.
    pub fn update(&mut self, graph: &Graph) -> Result<(), CodecError> {
        for component in graph.components() {
            self.push(&component)?;
        }
        self.increments += 1;
        Ok(())
    }

    fn push(&mut self, component: &Component) -> Result<(), CodecError> {
        // Length-prefixed frames: kind, id, label, encoded fields.
        let record = encode_record(component.id(), &component.fields())?;
        self.frame(component.kind().table().as_bytes());
        self.hasher.update(&component.id().to_le_bytes());
        self.frame(component.label().as_bytes());
        self.frame(record.as_bytes());
        self.components += 1;
        Ok(())
    }

    fn frame(&mut self, bytes: &[u8]) {
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    /// Components folded so far.
    pub fn components(&self) -> u64 {
        self.components
    }

    /// Increments folded so far.
    pub fn increments(&self) -> u64 {
        self.increments
    }

    /// Current digest.
    pub fn finalize(&self) -> [u8; 32] {
        *self.hasher.finalize().as_bytes()
    }

    /// Current digest as lowercase hex.
    pub fn hex(&self) -> String {
        hex::encode(self.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node};
    use bytes::Bytes;

    fn graph(label: &str) -> Graph {
        Graph {
            nodes: vec![Node::new(1, label, Bytes::from_static(b"xy"))],
            edges: vec![Edge::new(0, "owns", 0, 1)],
        }
    }

    #[test]
    fn equal_streams_hash_equal() {
        let mut a = StreamDigest::new();
        let mut b = StreamDigest::new();
        a.update(&graph("Machine")).unwrap();
        b.update(&graph("Machine")).unwrap();
        assert_eq!(a.hex(), b.hex());
        assert_eq!(a.components(), 2);
        assert_eq!(a.increments(), 1);
    }

    #[test]
    fn label_change_changes_digest() {
        let mut a = StreamDigest::new();
        let mut b = StreamDigest::new();
        a.update(&graph("Machine")).unwrap();
        b.update(&graph("Orders")).unwrap();
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn empty_increment_counts_without_components() {
        let mut digest = StreamDigest::new();
        let before = digest.hex();
        digest.update(&Graph::new()).unwrap();
        assert_eq!(digest.hex(), before);
        assert_eq!(digest.increments(), 1);
    }
}
