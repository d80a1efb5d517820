// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph component model: nodes, edges, increments and their field maps.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::ids::{ComponentKind, END_FIELD, ID_FIELD, LABEL_FIELD, START_FIELD, VALUE_FIELD};

/// A single field value.
///
/// The variant is the type discriminator persisted next to the raw value, so
/// a random byte payload decodes back to the exact bytes that were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaggedValue", into = "TaggedValue")]
pub enum FieldValue {
    /// UTF-8 text (ids, labels, endpoint ids).
    Text(String),
    /// Opaque bytes, persisted as lowercase hex.
    Bytes(Bytes),
}

/// Wire form of [`FieldValue`]: `{"type": .., "properties": ..}`.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "lowercase")]
enum TaggedValue {
    Text(String),
    Bytes(HexBytes),
}

#[derive(Serialize, Deserialize)]
struct HexBytes(#[serde(with = "hex_bytes")] Bytes);

impl From<TaggedValue> for FieldValue {
    fn from(value: TaggedValue) -> Self {
        match value {
            TaggedValue::Text(text) => Self::Text(text),
            TaggedValue::Bytes(HexBytes(bytes)) => Self::Bytes(bytes),
        }
    }
}

impl From<FieldValue> for TaggedValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => Self::Text(text),
            FieldValue::Bytes(bytes) => Self::Bytes(HexBytes(bytes)),
        }
    }
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

mod hex_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

/// Field name to value. Ordered, so encoding a map is deterministic.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A graph vertex. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: u64,
    label: String,
    value: Bytes,
}

impl Node {
    /// Create a node.
    pub fn new(id: u64, label: impl Into<String>, value: Bytes) -> Self {
        Self {
            id,
            label: label.into(),
            value,
        }
    }

    /// Node id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Node label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Opaque payload.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Field map (`id`, `label`, `value`).
    pub fn fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(ID_FIELD.to_owned(), self.id.to_string().into());
        fields.insert(LABEL_FIELD.to_owned(), self.label.as_str().into());
        fields.insert(VALUE_FIELD.to_owned(), FieldValue::Bytes(self.value.clone()));
        fields
    }

    /// Rebuild a node from its field map.
    pub fn from_fields(fields: &FieldMap) -> Result<Self, CodecError> {
        let value = match required(fields, VALUE_FIELD)? {
            FieldValue::Bytes(bytes) => bytes.clone(),
            FieldValue::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
        };
        Ok(Self {
            id: id_field(fields, ID_FIELD)?,
            label: text_field(fields, LABEL_FIELD)?.to_owned(),
            value,
        })
    }
}

/// A directed edge between two previously created nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    id: u64,
    label: String,
    start: u64,
    end: u64,
}

impl Edge {
    /// Create an edge from `start` to `end`.
    pub fn new(id: u64, label: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            id,
            label: label.into(),
            start,
            end,
        }
    }

    /// Edge id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Edge label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Id of the start node.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Id of the end node.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// The more recently created endpoint.
    pub fn newest_endpoint(&self) -> u64 {
        self.start.max(self.end)
    }

    /// Field map (`id`, `label`, `start`, `end`).
    pub fn fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(ID_FIELD.to_owned(), self.id.to_string().into());
        fields.insert(LABEL_FIELD.to_owned(), self.label.as_str().into());
        fields.insert(START_FIELD.to_owned(), self.start.to_string().into());
        fields.insert(END_FIELD.to_owned(), self.end.to_string().into());
        fields
    }

    /// Rebuild an edge from its field map.
    pub fn from_fields(fields: &FieldMap) -> Result<Self, CodecError> {
        Ok(Self {
            id: id_field(fields, ID_FIELD)?,
            label: text_field(fields, LABEL_FIELD)?.to_owned(),
            start: id_field(fields, START_FIELD)?,
            end: id_field(fields, END_FIELD)?,
        })
    }
}

fn required<'a>(fields: &'a FieldMap, name: &'static str) -> Result<&'a FieldValue, CodecError> {
    fields.get(name).ok_or(CodecError::MissingField(name))
}

fn text_field<'a>(fields: &'a FieldMap, name: &'static str) -> Result<&'a str, CodecError> {
    required(fields, name)?
        .as_text()
        .ok_or_else(|| CodecError::InvalidField {
            field: name,
            reason: "expected text".into(),
        })
}

fn id_field(fields: &FieldMap, name: &'static str) -> Result<u64, CodecError> {
    let text = text_field(fields, name)?;
    text.parse().map_err(|err| CodecError::InvalidField {
        field: name,
        reason: format!("{text:?}: {err}"),
    })
}

/// A node or an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// A vertex.
    Node(Node),
    /// An edge.
    Edge(Edge),
}

impl Component {
    /// Kind of this component.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Node(_) => ComponentKind::Node,
            Self::Edge(_) => ComponentKind::Edge,
        }
    }

    /// Component id (unique within its kind).
    pub fn id(&self) -> u64 {
        match self {
            Self::Node(node) => node.id(),
            Self::Edge(edge) => edge.id(),
        }
    }

    /// Component label.
    pub fn label(&self) -> &str {
        match self {
            Self::Node(node) => node.label(),
            Self::Edge(edge) => edge.label(),
        }
    }

    /// Field map of the component.
    pub fn fields(&self) -> FieldMap {
        match self {
            Self::Node(node) => node.fields(),
            Self::Edge(edge) => edge.fields(),
        }
    }
}

impl From<Node> for Component {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Edge> for Component {
    fn from(edge: Edge) -> Self {
        Self::Edge(edge)
    }
}

/// One generation increment: the nodes and edges created by a single step.
///
/// Transient; increments are never persisted as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Graph {
    /// New nodes, in creation order.
    pub nodes: Vec<Node>,
    /// New edges, in creation order.
    pub edges: Vec<Edge>,
}

impl Graph {
    /// An empty increment (also the exhaustion value in replay mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when the increment carries no components.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// All components, nodes first, in emission order.
    pub fn components(&self) -> impl Iterator<Item = Component> + '_ {
        self.nodes
            .iter()
            .cloned()
            .map(Component::Node)
            .chain(self.edges.iter().cloned().map(Component::Edge))
    }
}
