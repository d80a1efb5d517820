// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph data sources: record the builder's output or replay it.
//!
//! Both implementations register every component they hand out in an
//! id-keyed lookup map, so choosers can resolve ids into components in
//! either mode.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::builder::{BuilderConfig, GraphBuilder};
use crate::codec::{decode_record_at, encode_record, CodecError};
use crate::error::WorkloadError;
use crate::ids::{ComponentKind, IdCounter};
use crate::model::{Component, Edge, FieldMap, Graph, Node};
use crate::trace::{self, component_files, Phase, TraceMode, TraceWriter};

/// Stream of graph increments plus id lookup of everything emitted so far.
pub trait GraphDataSource {
    /// Next increment. An empty graph signals that a replayed dataset is
    /// exhausted; a recorder never runs dry.
    fn next_value(&mut self) -> Result<Graph, WorkloadError>;

    /// Increment returned by the previous [`next_value`](Self::next_value)
    /// call (empty before the first one).
    fn last_value(&self) -> Graph;

    /// Node with `id`, if it has been emitted (or belongs to the load baseline).
    fn node(&self, id: u64) -> Option<Node>;

    /// Edge with `id`, if it has been emitted (or belongs to the load baseline).
    fn edge(&self, id: u64) -> Option<Edge>;

    /// Record or replay.
    fn mode(&self) -> TraceMode;

    /// Phase the source was opened for.
    fn phase(&self) -> Phase;

    /// Component of `kind` with `id`.
    fn component(&self, kind: ComponentKind, id: u64) -> Option<Component> {
        match kind {
            ComponentKind::Node => self.node(id).map(Component::Node),
            ComponentKind::Edge => self.edge(id).map(Component::Edge),
        }
    }
}

/// Open the data source for `phase` over `directory`.
///
/// Replays when both component files exist, records when neither does, and
/// deletes a lone file before recording.
pub fn open_graph_data(
    directory: &Path,
    phase: Phase,
    config: BuilderConfig,
    seed: Option<u64>,
    counter: Arc<IdCounter>,
) -> Result<Box<dyn GraphDataSource>, WorkloadError> {
    let files = component_files(directory, phase);
    let source: Box<dyn GraphDataSource> = match trace::resolve_mode(directory, &files, "graph data")? {
        TraceMode::Record => Box::new(GraphDataRecorder::create(
            directory, phase, config, seed, counter,
        )?),
        TraceMode::Replay => Box::new(GraphDataRecreator::open(directory, phase, counter)?),
    };
    info!(phase = phase.suffix(), mode = ?source.mode(), dir = %directory.display(), "graph data opened");
    Ok(source)
}

#[derive(Debug, Default)]
struct Lookup {
    nodes: BTreeMap<u64, Node>,
    edges: BTreeMap<u64, Edge>,
}

impl Lookup {
    fn register(&mut self, graph: &Graph) {
        for node in &graph.nodes {
            self.nodes.insert(node.id(), node.clone());
        }
        for edge in &graph.edges {
            self.edges.insert(edge.id(), edge.clone());
        }
    }

    fn last_id(&self, kind: ComponentKind) -> Option<u64> {
        match kind {
            ComponentKind::Node => self.nodes.keys().next_back().copied(),
            ComponentKind::Edge => self.edges.keys().next_back().copied(),
        }
    }
}

/// Records builder output to `Node<phase>.json` / `Edge<phase>.json`.
#[derive(Debug)]
pub struct GraphDataRecorder {
    phase: Phase,
    builder: GraphBuilder,
    node_out: TraceWriter,
    edge_out: TraceWriter,
    node_position: u64,
    edge_position: u64,
    lookup: Lookup,
    last: Graph,
}

impl GraphDataRecorder {
    /// Create fresh component files for `phase`.
    ///
    /// In the run phase a complete load baseline is decoded into the lookup
    /// map, the builder is advanced past it and the counter continues after
    /// its highest ids. An incomplete baseline is deleted; one with missing
    /// ids or out-of-order increments is an integrity error.
    pub fn create(
        directory: &Path,
        phase: Phase,
        config: BuilderConfig,
        seed: Option<u64>,
        counter: Arc<IdCounter>,
    ) -> Result<Self, WorkloadError> {
        trace::ensure_directory(directory)?;
        let mut builder = GraphBuilder::new(config, Arc::clone(&counter), seed);
        let mut lookup = Lookup::default();

        if phase == Phase::Run {
            let baseline = component_files(directory, Phase::Load);
            if trace::complete_or_discard(&baseline, "graph data recorder")? {
                let (nodes, edges) = decode_baseline(directory)?;
                for increment in group_increments(nodes, edges) {
                    builder.absorb(&increment)?;
                    lookup.register(&increment);
                }
                for kind in ComponentKind::ALL {
                    if let Some(last) = lookup.last_id(kind) {
                        counter.preset_id(kind, last);
                    }
                }
                info!(
                    nodes = lookup.nodes.len(),
                    edges = lookup.edges.len(),
                    "run phase continues after load baseline"
                );
            }
        }

        let [node_path, edge_path] = component_files(directory, phase);
        Ok(Self {
            phase,
            builder,
            node_out: TraceWriter::create(node_path)?,
            edge_out: TraceWriter::create(edge_path)?,
            node_position: 0,
            edge_position: 0,
            lookup,
            last: Graph::new(),
        })
    }

    fn persist(&mut self, graph: &Graph) -> Result<(), WorkloadError> {
        for node in &graph.nodes {
            let line = encode_record(self.node_position, &node.fields())?;
            self.node_out.append(&line)?;
            self.node_position += 1;
        }
        for edge in &graph.edges {
            let line = encode_record(self.edge_position, &edge.fields())?;
            self.edge_out.append(&line)?;
            self.edge_position += 1;
        }
        Ok(())
    }
}

impl GraphDataSource for GraphDataRecorder {
    fn next_value(&mut self) -> Result<Graph, WorkloadError> {
        let graph = self.builder.next_increment();
        self.persist(&graph)?;
        self.lookup.register(&graph);
        debug!(nodes = graph.nodes.len(), edges = graph.edges.len(), "recorded increment");
        self.last = graph.clone();
        Ok(graph)
    }

    fn last_value(&self) -> Graph {
        self.last.clone()
    }

    fn node(&self, id: u64) -> Option<Node> {
        self.lookup.nodes.get(&id).cloned()
    }

    fn edge(&self, id: u64) -> Option<Edge> {
        self.lookup.edges.get(&id).cloned()
    }

    fn mode(&self) -> TraceMode {
        TraceMode::Record
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}

/// Replays the component files of a phase increment by increment.
#[derive(Debug)]
pub struct GraphDataRecreator {
    phase: Phase,
    counter: Arc<IdCounter>,
    pending: VecDeque<Graph>,
    lookup: Lookup,
    baseline: [Option<u64>; 2],
    last: Graph,
}

impl GraphDataRecreator {
    /// Decode the component files of `phase`.
    ///
    /// For the run phase a complete load baseline is merged into the lookup
    /// map and its highest ids are marked as issued on `counter`. A baseline
    /// with missing ids is an integrity error.
    pub fn open(
        directory: &Path,
        phase: Phase,
        counter: Arc<IdCounter>,
    ) -> Result<Self, WorkloadError> {
        let (nodes, edges) = decode_components(directory, phase)?;
        let pending = group_increments(nodes, edges);

        let mut lookup = Lookup::default();
        let mut baseline = [None, None];
        if phase == Phase::Run {
            let load_files = component_files(directory, Phase::Load);
            if load_files.iter().all(|file| file.exists()) {
                let (nodes, edges) = decode_baseline(directory)?;
                lookup.nodes.extend(nodes.into_iter().map(|n| (n.id(), n)));
                lookup.edges.extend(edges.into_iter().map(|e| (e.id(), e)));
                for kind in ComponentKind::ALL {
                    let last = lookup.last_id(kind);
                    if let Some(id) = last {
                        counter.observe(kind, id);
                    }
                    baseline[kind_slot(kind)] = last;
                }
            } else {
                warn!("run phase replay without a complete load baseline");
            }
        }

        info!(
            phase = phase.suffix(),
            increments = pending.len(),
            "graph data replay ready"
        );
        Ok(Self {
            phase,
            counter,
            pending,
            lookup,
            baseline,
            last: Graph::new(),
        })
    }

    /// Highest id of `kind` in the merged load baseline.
    pub fn baseline_last_id(&self, kind: ComponentKind) -> Option<u64> {
        self.baseline[kind_slot(kind)]
    }

    /// Increments not replayed yet.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl GraphDataSource for GraphDataRecreator {
    fn next_value(&mut self) -> Result<Graph, WorkloadError> {
        let graph = self.pending.pop_front().unwrap_or_default();
        for node in &graph.nodes {
            self.counter.observe(ComponentKind::Node, node.id());
        }
        for edge in &graph.edges {
            self.counter.observe(ComponentKind::Edge, edge.id());
        }
        self.lookup.register(&graph);
        self.last = graph.clone();
        Ok(graph)
    }

    fn last_value(&self) -> Graph {
        self.last.clone()
    }

    fn node(&self, id: u64) -> Option<Node> {
        self.lookup.nodes.get(&id).cloned()
    }

    fn edge(&self, id: u64) -> Option<Edge> {
        self.lookup.edges.get(&id).cloned()
    }

    fn mode(&self) -> TraceMode {
        TraceMode::Replay
    }

    fn phase(&self) -> Phase {
        self.phase
    }
}

fn kind_slot(kind: ComponentKind) -> usize {
    match kind {
        ComponentKind::Node => 0,
        ComponentKind::Edge => 1,
    }
}

/// Decode both component files of `phase`, skipping malformed records.
fn decode_components(
    directory: &Path,
    phase: Phase,
) -> Result<(Vec<Node>, Vec<Edge>), WorkloadError> {
    let [node_path, edge_path] = component_files(directory, phase);
    let nodes = decode_file(&node_path, Node::from_fields)?;
    let edges = decode_file(&edge_path, Edge::from_fields)?;
    Ok((nodes, edges))
}

/// Decode the load baseline, which must hold every id up to its highest.
fn decode_baseline(directory: &Path) -> Result<(Vec<Node>, Vec<Edge>), WorkloadError> {
    let (nodes, edges) = decode_components(directory, Phase::Load)?;
    check_contiguous(ComponentKind::Node, nodes.iter().map(Node::id))?;
    check_contiguous(ComponentKind::Edge, edges.iter().map(Edge::id))?;
    Ok((nodes, edges))
}

fn check_contiguous(
    kind: ComponentKind,
    ids: impl Iterator<Item = u64>,
) -> Result<(), WorkloadError> {
    for (expected, id) in (0..).zip(ids) {
        if id != expected {
            return Err(WorkloadError::Integrity(format!(
                "load baseline is missing {kind} {expected}"
            )));
        }
    }
    Ok(())
}

fn decode_file<T>(
    path: &Path,
    convert: impl Fn(&FieldMap) -> Result<T, CodecError>,
) -> Result<Vec<T>, WorkloadError> {
    let lines = trace::read_lines(path)?;
    let mut out = Vec::with_capacity(lines.len());
    for (position, line) in lines.iter().enumerate() {
        match decode_record_at(position as u64, line).and_then(|fields| convert(&fields)) {
            Ok(component) => out.push(component),
            Err(err) => warn!(file = %path.display(), position, %err, "skipping malformed record"),
        }
    }
    Ok(out)
}

/// Rebuild increments from decoded components.
///
/// Each node opens an increment; each edge joins the increment of its newest
/// endpoint. An edge whose newest endpoint is not among `nodes` is attached
/// to the increment of the edge before it.
fn group_increments(nodes: Vec<Node>, edges: Vec<Edge>) -> VecDeque<Graph> {
    let mut increments: Vec<Graph> = Vec::with_capacity(nodes.len());
    let mut owner: BTreeMap<u64, usize> = BTreeMap::new();
    for node in nodes {
        owner.insert(node.id(), increments.len());
        increments.push(Graph {
            nodes: vec![node],
            edges: Vec::new(),
        });
    }

    let mut previous: Option<usize> = None;
    for edge in edges {
        let slot = match owner.get(&edge.newest_endpoint()) {
            Some(&slot) => slot,
            None => {
                warn!(edge = edge.id(), endpoint = edge.newest_endpoint(), "edge endpoint not in phase");
                match previous {
                    Some(slot) => slot,
                    None if !increments.is_empty() => 0,
                    None => {
                        increments.push(Graph::new());
                        0
                    }
                }
            }
        };
        increments[slot].edges.push(edge);
        previous = Some(slot);
    }
    increments.into()
}
