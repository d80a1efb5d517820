// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Static graph data source.

use std::collections::{BTreeMap, VecDeque};

use bytes::Bytes;
use graph_workload::{
    Edge, Graph, GraphDataSource, Node, Phase, TraceMode, WorkloadError,
};

/// A fixed set of nodes and edges, all resolvable from the start.
///
/// `next_value` hands out one increment per node (edges attached to their
/// newest endpoint) and then empty graphs. Useful for chooser tests that
/// only need id lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticGraphSource {
    nodes: BTreeMap<u64, Node>,
    edges: BTreeMap<u64, Edge>,
    pending: VecDeque<Graph>,
    last: Graph,
}

impl StaticGraphSource {
    /// `nodes` nodes (ids `0..nodes`) chained by `edges` edges
    /// (edge `i` runs from node `i` to node `i + 1`, wrapping).
    pub fn chain(nodes: u64, edges: u64) -> Self {
        let node_list: Vec<Node> = (0..nodes)
            .map(|id| Node::new(id, format!("Node{id}"), Bytes::from(vec![b'a'; 4])))
            .collect();
        let span = nodes.max(1);
        let edge_list: Vec<Edge> = (0..edges)
            .map(|id| Edge::new(id, format!("Edge{id}"), id % span, (id + 1) % span))
            .collect();
        Self::from_components(node_list, edge_list)
    }

    /// Source over exactly these components.
    pub fn from_components(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut pending: VecDeque<Graph> = nodes
            .iter()
            .map(|node| Graph {
                nodes: vec![node.clone()],
                edges: Vec::new(),
            })
            .collect();
        for edge in &edges {
            let newest = edge.newest_endpoint();
            if let Some(graph) = pending
                .iter_mut()
                .find(|graph| graph.nodes.iter().any(|n| n.id() == newest))
            {
                graph.edges.push(edge.clone());
            }
        }
        Self {
            nodes: nodes.into_iter().map(|n| (n.id(), n)).collect(),
            edges: edges.into_iter().map(|e| (e.id(), e)).collect(),
            pending,
            last: Graph::new(),
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> u64 {
        self.nodes.len() as u64
    }

    /// Number of edges.
    pub fn edge_count(&self) -> u64 {
        self.edges.len() as u64
    }
}

impl GraphDataSource for StaticGraphSource {
    fn next_value(&mut self) -> Result<Graph, WorkloadError> {
        self.last = self.pending.pop_front().unwrap_or_default();
        Ok(self.last.clone())
    }

    fn last_value(&self) -> Graph {
        self.last.clone()
    }

    fn node(&self, id: u64) -> Option<Node> {
        self.nodes.get(&id).cloned()
    }

    fn edge(&self, id: u64) -> Option<Edge> {
        self.edges.get(&id).cloned()
    }

    fn mode(&self) -> TraceMode {
        TraceMode::Replay
    }

    fn phase(&self) -> Phase {
        Phase::Run
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use graph_workload::ComponentKind;

    #[test]
    fn chain_resolves_every_id() {
        let source = StaticGraphSource::chain(5, 3);
        assert_eq!(source.node_count(), 5);
        assert_eq!(source.edge_count(), 3);
        assert!(source.component(ComponentKind::Node, 4).is_some());
        assert!(source.component(ComponentKind::Edge, 2).is_some());
        assert!(source.component(ComponentKind::Edge, 3).is_none());
    }

    #[test]
    fn increments_then_empty() {
        let mut source = StaticGraphSource::chain(2, 1);
        assert_eq!(source.next_value().unwrap().nodes[0].id(), 0);
        let second = source.next_value().unwrap();
        assert_eq!(second.edges.len(), 1);
        assert!(source.next_value().unwrap().is_empty());
    }
}
