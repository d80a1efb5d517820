// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;

use graph_workload::{
    open_graph_data, ComponentKind, Graph, GraphDataRecreator, GraphDataSource, IdCounter, Phase,
    StreamDigest, TraceMode, WorkloadError,
};
use graph_workload_dry_tests::ScratchDataset;

fn open(dataset: &ScratchDataset, phase: Phase, counter: Arc<IdCounter>) -> Box<dyn GraphDataSource> {
    let config = dataset.config();
    open_graph_data(
        dataset.path(),
        phase,
        config.builder(),
        config.seed,
        counter,
    )
    .unwrap()
}

fn record(dataset: &ScratchDataset, phase: Phase, counter: Arc<IdCounter>, n: usize) -> Vec<Graph> {
    let mut source = open(dataset, phase, counter);
    assert_eq!(source.mode(), TraceMode::Record);
    (0..n).map(|_| source.next_value().unwrap()).collect()
}

fn drain(source: &mut dyn GraphDataSource) -> Vec<Graph> {
    let mut out = Vec::new();
    loop {
        let graph = source.next_value().unwrap();
        if graph.is_empty() {
            return out;
        }
        out.push(graph);
    }
}

fn digest(graphs: &[Graph]) -> String {
    let mut digest = StreamDigest::new();
    for graph in graphs {
        digest.update(graph).unwrap();
    }
    digest.hex()
}

#[test]
fn replay_reproduces_the_recorded_stream() {
    let dataset = ScratchDataset::new().unwrap();
    let recorded = record(&dataset, Phase::Load, ScratchDataset::counter(), 40);

    let counter = ScratchDataset::counter();
    let mut replay = open(&dataset, Phase::Load, Arc::clone(&counter));
    assert_eq!(replay.mode(), TraceMode::Replay);
    let replayed = drain(replay.as_mut());

    assert_eq!(replayed, recorded);
    assert_eq!(digest(&replayed), digest(&recorded));
    let nodes: usize = recorded.iter().map(|g| g.nodes.len()).sum();
    assert_eq!(counter.issued(ComponentKind::Node), nodes as u64);
    // Exhaustion is sticky.
    assert!(replay.next_value().unwrap().is_empty());
    assert!(replay.last_value().is_empty());
}

#[test]
fn replay_registers_components_for_lookup() {
    let dataset = ScratchDataset::new().unwrap();
    let recorded = record(&dataset, Phase::Load, ScratchDataset::counter(), 6);
    let mut replay = open(&dataset, Phase::Load, ScratchDataset::counter());
    assert!(replay.node(0).is_none());
    replay.next_value().unwrap();
    replay.next_value().unwrap();
    assert_eq!(replay.node(1).as_ref(), recorded[1].nodes.first());
    assert_eq!(replay.edge(0).as_ref(), recorded[1].edges.first());
    assert!(replay.node(2).is_none());
}

#[test]
fn independent_recreators_exhaust_separately() {
    let dataset = ScratchDataset::new().unwrap();
    let recorded = record(&dataset, Phase::Load, ScratchDataset::counter(), 25);

    let mut a = open(&dataset, Phase::Load, ScratchDataset::counter());
    let mut b = open(&dataset, Phase::Load, ScratchDataset::counter());
    let first_a = a.next_value().unwrap();
    let all_b = drain(b.as_mut());
    let mut all_a = vec![first_a];
    all_a.extend(drain(a.as_mut()));
    assert_eq!(all_a, all_b);
    assert_eq!(all_a, recorded);
}

#[test]
fn nine_increment_factory_scenario() {
    let dataset = ScratchDataset::new().unwrap().with_shape(1, 1);
    record(&dataset, Phase::Load, ScratchDataset::counter(), 9);
    let mut replay = open(&dataset, Phase::Load, ScratchDataset::counter());
    let graphs = drain(replay.as_mut());

    let nodes: Vec<_> = graphs
        .iter()
        .flat_map(|g| g.nodes.iter().map(|n| n.label().to_owned()))
        .collect();
    let edges: Vec<Vec<_>> = graphs
        .iter()
        .map(|g| g.edges.iter().map(|e| e.label().to_owned()).collect())
        .collect();
    assert_eq!(
        nodes,
        [
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
    assert!(edges[0].is_empty());
    assert_eq!(edges[1], ["owns"]);
    assert_eq!(edges[5], ["produced", "ordered"]);
    assert_eq!(edges[8], ["hasTested"]);
}

#[test]
fn run_phase_continues_load_ids() {
    let dataset = ScratchDataset::new().unwrap().with_shape(1, 1);
    let load = record(&dataset, Phase::Load, ScratchDataset::counter(), 10);
    assert_eq!(load.last().unwrap().nodes[0].id(), 9);
    let last_edge = load.iter().flat_map(|g| g.edges.iter()).last().unwrap().id();

    // New process: fresh counter.
    let counter = ScratchDataset::counter();
    let mut run = open(&dataset, Phase::Run, Arc::clone(&counter));
    assert_eq!(run.mode(), TraceMode::Record);
    assert!(run.node(9).is_some());
    let first = run.next_value().unwrap();
    assert_eq!(first.nodes[0].id(), 10);
    assert_eq!(first.nodes[0].label(), "Product");
    assert_eq!(first.edges[0].id(), last_edge + 1);
    assert_eq!(first.edges[0].start(), 1);
    assert_eq!(first.edges[1].start(), 9);
    let second = run.next_value().unwrap();
    drop(run);

    let run_nodes = fs::read_to_string(dataset.file("Noderun.json")).unwrap();
    assert!(run_nodes.starts_with("Key-0-"));

    let counter = ScratchDataset::counter();
    let mut replay =
        GraphDataRecreator::open(dataset.path(), Phase::Run, Arc::clone(&counter)).unwrap();
    assert_eq!(replay.baseline_last_id(ComponentKind::Node), Some(9));
    assert_eq!(replay.baseline_last_id(ComponentKind::Edge), Some(last_edge));
    assert_eq!(counter.issued(ComponentKind::Node), 10);
    assert_eq!(counter.issued(ComponentKind::Edge), last_edge + 1);
    assert!(replay.node(3).is_some());
    assert_eq!(replay.remaining(), 2);
    assert_eq!(drain(&mut replay), vec![first, second]);
    assert_eq!(counter.issued(ComponentKind::Node), 12);

    let load_replay =
        GraphDataRecreator::open(dataset.path(), Phase::Load, ScratchDataset::counter()).unwrap();
    assert_eq!(load_replay.baseline_last_id(ComponentKind::Node), None);
}

fn corrupt_line(path: &std::path::Path, index: usize) {
    let content = fs::read_to_string(path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_owned).collect();
    lines[index] = "garbage".into();
    fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[test]
fn run_phase_refuses_a_load_baseline_with_gaps() {
    let dataset = ScratchDataset::new().unwrap().with_shape(1, 1);
    record(&dataset, Phase::Load, ScratchDataset::counter(), 12);
    corrupt_line(&dataset.file("Nodeload.json"), 5);

    let config = dataset.config();
    let Err(err) = open_graph_data(
        dataset.path(),
        Phase::Run,
        config.builder(),
        config.seed,
        ScratchDataset::counter(),
    ) else {
        panic!("a baseline with a missing node must not be continued");
    };
    assert!(matches!(err, WorkloadError::Integrity(_)), "{err}");
    assert!(!dataset.file("Noderun.json").exists());
    assert!(!dataset.file("Edgerun.json").exists());
}

#[test]
fn run_replay_refuses_a_baseline_damaged_after_recording() {
    let dataset = ScratchDataset::new().unwrap().with_shape(1, 1);
    record(&dataset, Phase::Load, ScratchDataset::counter(), 12);
    record(&dataset, Phase::Run, ScratchDataset::counter(), 3);
    corrupt_line(&dataset.file("Edgeload.json"), 2);

    let err = GraphDataRecreator::open(dataset.path(), Phase::Run, ScratchDataset::counter())
        .unwrap_err();
    assert!(matches!(err, WorkloadError::Integrity(_)), "{err}");
}

#[test]
fn partial_load_dataset_is_rebuilt() {
    let dataset = ScratchDataset::new().unwrap();
    fs::write(dataset.file("Nodeload.json"), "Key-0-{\"stale\":true}\n").unwrap();

    let recorded = record(&dataset, Phase::Load, ScratchDataset::counter(), 3);
    assert_eq!(
        dataset.file_names().unwrap(),
        ["Edgeload.json", "Nodeload.json"]
    );
    let nodes = fs::read_to_string(dataset.file("Nodeload.json")).unwrap();
    assert!(!nodes.contains("stale"));
    assert_eq!(nodes.lines().count(), 3);

    let mut replay = open(&dataset, Phase::Load, ScratchDataset::counter());
    assert_eq!(drain(replay.as_mut()), recorded);
}

#[test]
fn partial_load_baseline_is_dropped_for_run_phase() {
    let dataset = ScratchDataset::new().unwrap();
    fs::write(dataset.file("Edgeload.json"), "").unwrap();
    let counter = ScratchDataset::counter();
    let mut run = open(&dataset, Phase::Run, counter);
    assert!(!dataset.file("Edgeload.json").exists());
    assert_eq!(run.next_value().unwrap().nodes[0].label(), "Factory");
}

#[test]
fn torn_tail_and_malformed_lines_are_skipped() {
    let dataset = ScratchDataset::new().unwrap();
    let recorded = record(&dataset, Phase::Load, ScratchDataset::counter(), 12);

    let mut edges = OpenOptions::new()
        .append(true)
        .open(dataset.file("Edgeload.json"))
        .unwrap();
    edges.write_all(b"Key-11-{\"id\":{\"ty").unwrap();
    drop(edges);

    let mut replay = open(&dataset, Phase::Load, ScratchDataset::counter());
    assert_eq!(drain(replay.as_mut()), recorded);

    // A garbled node record loses only that node; its edges join the
    // increment of the edge before them.
    corrupt_line(&dataset.file("Nodeload.json"), 11);

    let mut replay = open(&dataset, Phase::Load, ScratchDataset::counter());
    let replayed = drain(replay.as_mut());
    assert_eq!(replayed.len(), 11);
    assert_eq!(replayed[..10], recorded[..10]);
    assert_eq!(
        replayed[10].edges.len(),
        recorded[10].edges.len() + recorded[11].edges.len()
    );
}
