// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Factory graph builder.
//!
//! Emits one increment per call:
//!
//! ```text
//! Factory → Machine (owns) → Orders (receives) → Design (builds)
//! then per order:
//!   Order (ordered)
//!   per product: Product (produced, ordered) → Date (producedAt)
//!                → Tests (tested) → TestParameterNr:n (hasTested) × count
//! ```
//!
//! Every increment holds exactly one new node plus the edges that attach it
//! to nodes created earlier. Labels and structure depend only on the
//! configuration; ids come from the injected [`IdCounter`].

use std::sync::Arc;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::WorkloadError;
use crate::ids::{ComponentKind, IdCounter};
use crate::model::{Edge, Graph, Node};

/// Structural parameters of the factory graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// `TestParameterNr:n` nodes per product.
    pub test_parameter_count: u32,
    /// Products per order. Zero is treated as one.
    pub products_per_order: u32,
    /// Length of each node's random payload.
    pub node_byte_size: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            test_parameter_count: 128,
            products_per_order: 10,
            node_byte_size: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Factory,
    Machine,
    Orders,
    Design,
    Order,
    Product,
    Date,
    Tests,
    TestParameter(u32),
}

/// Ids of the nodes later increments attach to.
#[derive(Debug, Default, Clone, Copy)]
struct Anchors {
    factory: u64,
    machine: u64,
    orders: u64,
    order: u64,
    product: u64,
    tests: u64,
}

/// Deterministic state machine producing the factory graph.
#[derive(Debug)]
pub struct GraphBuilder {
    config: BuilderConfig,
    counter: Arc<IdCounter>,
    rng: StdRng,
    stage: Stage,
    anchors: Anchors,
    remaining_products: u32,
}

impl GraphBuilder {
    /// Create a builder drawing ids from `counter`.
    ///
    /// `seed` fixes the payload bytes; `None` seeds from OS entropy.
    pub fn new(config: BuilderConfig, counter: Arc<IdCounter>, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            config,
            counter,
            rng,
            stage: Stage::Factory,
            anchors: Anchors::default(),
            remaining_products: 0,
        }
    }

    /// Builder configuration.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Label of the node the next increment will create.
    pub fn next_label(&self) -> String {
        match self.stage {
            Stage::Factory => "Factory".into(),
            Stage::Machine => "Machine".into(),
            Stage::Orders => "Orders".into(),
            Stage::Design => "Design".into(),
            Stage::Order => "Order".into(),
            Stage::Product => "Product".into(),
            Stage::Date => "Date".into(),
            Stage::Tests => "Tests".into(),
            Stage::TestParameter(n) => format!("TestParameterNr:{n}"),
        }
    }

    /// `(label, start)` of every edge the next increment attaches, in order.
    fn planned_edges(&self) -> Vec<(&'static str, u64)> {
        let a = self.anchors;
        match self.stage {
            Stage::Factory => Vec::new(),
            Stage::Machine => vec![("owns", a.factory)],
            Stage::Orders => vec![("receives", a.factory)],
            Stage::Design => vec![("builds", a.factory)],
            Stage::Order => vec![("ordered", a.orders)],
            Stage::Product => vec![("produced", a.machine), ("ordered", a.order)],
            Stage::Date => vec![("producedAt", a.product)],
            Stage::Tests => vec![("tested", a.product)],
            Stage::TestParameter(_) => vec![("hasTested", a.tests)],
        }
    }

    /// Build the next increment.
    pub fn next_increment(&mut self) -> Graph {
        let label = self.next_label();
        let edges = self.planned_edges();
        let node_id = self.counter.next_id(ComponentKind::Node);
        let node = Node::new(node_id, label, self.payload());
        let edges = edges
            .into_iter()
            .map(|(label, start)| {
                Edge::new(self.counter.next_id(ComponentKind::Edge), label, start, node_id)
            })
            .collect();
        self.commit(node_id);
        Graph {
            nodes: vec![node],
            edges,
        }
    }

    /// Advance through an increment produced earlier (e.g. by a load phase)
    /// without drawing ids or payload bytes.
    ///
    /// The increment's node becomes the anchor for later edges. An increment
    /// without a node, or whose node label is not the one the builder would
    /// emit next, leaves the builder unchanged and is an integrity error.
    pub fn absorb(&mut self, increment: &Graph) -> Result<(), WorkloadError> {
        let Some(node) = increment.nodes.first() else {
            return Err(WorkloadError::Integrity(
                "absorbed increment has no node".into(),
            ));
        };
        let expected = self.next_label();
        if node.label() != expected {
            return Err(WorkloadError::Integrity(format!(
                "node {} is {:?}, expected {expected:?}",
                node.id(),
                node.label()
            )));
        }
        self.commit(node.id());
        Ok(())
    }

    fn payload(&mut self) -> Bytes {
        let rng = &mut self.rng;
        (0..self.config.node_byte_size)
            .map(|_| rng.gen_range(b' '..=b'~'))
            .collect::<Vec<u8>>()
            .into()
    }

    fn commit(&mut self, node_id: u64) {
        let products = self.config.products_per_order.max(1);
        let tests = self.config.test_parameter_count;
        self.stage = match self.stage {
            Stage::Factory => {
                self.anchors.factory = node_id;
                Stage::Machine
            }
            Stage::Machine => {
                self.anchors.machine = node_id;
                Stage::Orders
            }
            Stage::Orders => {
                self.anchors.orders = node_id;
                Stage::Design
            }
            Stage::Design => Stage::Order,
            Stage::Order => {
                self.anchors.order = node_id;
                self.remaining_products = products;
                Stage::Product
            }
            Stage::Product => {
                self.anchors.product = node_id;
                Stage::Date
            }
            Stage::Date => Stage::Tests,
            Stage::Tests => {
                self.anchors.tests = node_id;
                if tests == 0 {
                    self.finish_product()
                } else {
                    Stage::TestParameter(0)
                }
            }
            Stage::TestParameter(n) if n + 1 < tests => Stage::TestParameter(n + 1),
            Stage::TestParameter(_) => self.finish_product(),
        };
    }

    fn finish_product(&mut self) -> Stage {
        self.remaining_products = self.remaining_products.saturating_sub(1);
        if self.remaining_products == 0 {
            Stage::Order
        } else {
            Stage::Product
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn builder(test_parameter_count: u32, products_per_order: u32) -> GraphBuilder {
        let config = BuilderConfig {
            test_parameter_count,
            products_per_order,
            node_byte_size: 16,
        };
        GraphBuilder::new(config, Arc::new(IdCounter::new()), Some(7))
    }

    fn labels(builder: &mut GraphBuilder, calls: usize) -> (Vec<String>, Vec<String>) {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for _ in 0..calls {
            let graph = builder.next_increment();
            nodes.extend(graph.nodes.iter().map(|n| n.label().to_owned()));
            edges.extend(graph.edges.iter().map(|e| e.label().to_owned()));
        }
        (nodes, edges)
    }

    #[test]
    fn single_product_single_test_parameter_sequence() {
        let (nodes, edges) = labels(&mut builder(1, 1), 9);
        assert_eq!(
            nodes,
            vec![
                "Factory",
                "Machine",
                "Orders",
                "Design",
                "Order",
                "Product",
                "Date",
                "Tests",
                "TestParameterNr:0"
            ]
        );
        assert_eq!(
            edges,
            vec![
                "owns",
                "receives",
                "builds",
                "ordered",
                "produced",
                "ordered",
                "producedAt",
                "tested",
                "hasTested"
            ]
        );
    }

    #[test]
    fn zero_test_parameters_skip_straight_to_next_order() {
        let (nodes, _) = labels(&mut builder(0, 1), 12);
        assert_eq!(
            &nodes[4..],
            &["Order", "Product", "Date", "Tests", "Order", "Product", "Date", "Tests"]
        );
    }

    #[test]
    fn products_repeat_within_an_order() {
        let (nodes, _) = labels(&mut builder(2, 2), 4 + 1 + 5 + 5 + 1);
        assert_eq!(nodes[4], "Order");
        assert_eq!(nodes[5], "Product");
        assert_eq!(nodes[9], "TestParameterNr:1");
        assert_eq!(nodes[10], "Product");
        assert_eq!(nodes[15], "Order");
    }

    #[test]
    fn edges_attach_new_node_to_existing_anchors() {
        let mut b = builder(1, 1);
        let increments: Vec<Graph> = (0..9).map(|_| b.next_increment()).collect();
        // Product increment: produced from Machine (1), ordered from Order (4).
        let product = &increments[5];
        assert_eq!(product.nodes[0].id(), 5);
        assert_eq!(product.edges[0].start(), 1);
        assert_eq!(product.edges[1].start(), 4);
        for graph in &increments {
            assert_eq!(graph.nodes.len(), 1);
            let node = &graph.nodes[0];
            for edge in &graph.edges {
                assert_eq!(edge.end(), node.id());
                assert!(edge.start() < node.id());
            }
        }
    }

    #[test]
    fn same_seed_same_payloads() {
        let mut a = builder(3, 2);
        let mut b = builder(3, 2);
        for _ in 0..20 {
            let (x, y) = (a.next_increment(), b.next_increment());
            assert_eq!(x, y);
            assert!(x.nodes[0].value().iter().all(|c| (b' '..=b'~').contains(c)));
            assert_eq!(x.nodes[0].value().len(), 16);
        }
    }

    #[test]
    fn preset_offset_changes_ids_only() {
        let counter = Arc::new(IdCounter::new());
        counter.preset_id(ComponentKind::Node, 9);
        counter.preset_id(ComponentKind::Edge, 8);
        let config = BuilderConfig {
            test_parameter_count: 1,
            products_per_order: 1,
            node_byte_size: 4,
        };
        let mut shifted = GraphBuilder::new(config, counter, Some(1));
        let mut plain = builder(1, 1);
        let first = shifted.next_increment();
        assert_eq!(first.nodes[0].id(), 10);
        assert_eq!(first.nodes[0].label(), plain.next_increment().nodes[0].label());
        let second = shifted.next_increment();
        assert_eq!(second.edges[0].id(), 9);
        assert_eq!(second.edges[0].start(), 10);
    }

    #[test]
    fn absorb_continues_where_the_prefix_ended() {
        let mut original = builder(2, 1);
        let prefix: Vec<Graph> = (0..7).map(|_| original.next_increment()).collect();
        let expected = original.next_increment();

        let counter = Arc::new(IdCounter::new());
        let mut resumed = GraphBuilder::new(*original.config(), Arc::clone(&counter), Some(7));
        for graph in &prefix {
            resumed.absorb(graph).unwrap();
        }
        counter.preset_id(ComponentKind::Node, 6);
        counter.preset_id(ComponentKind::Edge, 6);
        let next = resumed.next_increment();
        assert_eq!(next.nodes[0].id(), expected.nodes[0].id());
        assert_eq!(next.nodes[0].label(), expected.nodes[0].label());
        assert_eq!(next.edges, expected.edges);
    }

    #[test]
    fn absorb_rejects_out_of_order_increments() {
        let mut original = builder(1, 1);
        let prefix: Vec<Graph> = (0..3).map(|_| original.next_increment()).collect();

        let mut resumed = GraphBuilder::new(*original.config(), Arc::new(IdCounter::new()), None);
        resumed.absorb(&prefix[0]).unwrap();
        assert!(matches!(
            resumed.absorb(&prefix[2]),
            Err(WorkloadError::Integrity(_))
        ));
        assert_eq!(resumed.next_label(), "Machine");
        assert!(matches!(
            resumed.absorb(&Graph::new()),
            Err(WorkloadError::Integrity(_))
        ));
        resumed.absorb(&prefix[1]).unwrap();
        assert_eq!(resumed.next_label(), "Orders");
    }
}
