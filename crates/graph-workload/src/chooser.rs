// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reproducible random choice of an existing component.
//!
//! Each choice is a kind bit (`0` node, `1` edge) followed by an id below the
//! number of ids of that kind issued so far. The recorder appends both to
//! their trace files; the recreator consumes them back in order.

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::data::GraphDataSource;
use crate::error::WorkloadError;
use crate::ids::{ComponentKind, IdCounter};
use crate::model::Component;
use crate::trace::{
    self, read_u64_trace, TraceMode, TraceWriter, COMPONENT_KIND_TRACE, EDGE_ID_TRACE,
    NODE_ID_TRACE,
};

/// Picks components for read, update and scan operations.
pub trait ComponentChooser {
    /// Choose a component and resolve it through `data`.
    ///
    /// `None` when the chosen id does not resolve or, for a recreator, when
    /// the trace is exhausted (see [`is_exhausted`](Self::is_exhausted)).
    fn choose(&mut self, data: &dyn GraphDataSource) -> Result<Option<Component>, WorkloadError>;

    /// Component resolved by the previous `choose` call.
    fn last_value(&self) -> Option<Component>;

    /// `true` once a recreator has run out of recorded choices.
    fn is_exhausted(&self) -> bool;

    /// Record or replay.
    fn mode(&self) -> TraceMode;
}

/// Open the chooser over the trace files in `directory`.
pub fn open_chooser(
    directory: &Path,
    seed: Option<u64>,
    counter: Arc<IdCounter>,
) -> Result<Box<dyn ComponentChooser>, WorkloadError> {
    let files = [
        directory.join(NODE_ID_TRACE),
        directory.join(EDGE_ID_TRACE),
        directory.join(COMPONENT_KIND_TRACE),
    ];
    let chooser: Box<dyn ComponentChooser> =
        match trace::resolve_mode(directory, &files, "component chooser")? {
            TraceMode::Record => Box::new(RandomComponentRecorder::create(directory, seed, counter)?),
            TraceMode::Replay => Box::new(RandomComponentRecreator::open(directory)?),
        };
    info!(mode = ?chooser.mode(), "component chooser opened");
    Ok(chooser)
}

fn resolve(data: &dyn GraphDataSource, kind: ComponentKind, id: u64) -> Option<Component> {
    let component = data.component(kind, id);
    if component.is_none() {
        warn!(%kind, id, "chosen component does not resolve");
    }
    component
}

/// Draws fresh choices and appends them to the trace files.
#[derive(Debug)]
pub struct RandomComponentRecorder {
    rng: StdRng,
    counter: Arc<IdCounter>,
    kinds: TraceWriter,
    node_ids: TraceWriter,
    edge_ids: TraceWriter,
    last: Option<Component>,
}

impl RandomComponentRecorder {
    /// Create the three trace files in `directory`. Ids are bounded by what
    /// `counter` has issued at the time of each choice.
    pub fn create(
        directory: &Path,
        seed: Option<u64>,
        counter: Arc<IdCounter>,
    ) -> Result<Self, WorkloadError> {
        trace::ensure_directory(directory)?;
        Ok(Self {
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
            counter,
            kinds: TraceWriter::create(directory.join(COMPONENT_KIND_TRACE))?,
            node_ids: TraceWriter::create(directory.join(NODE_ID_TRACE))?,
            edge_ids: TraceWriter::create(directory.join(EDGE_ID_TRACE))?,
            last: None,
        })
    }
}

impl ComponentChooser for RandomComponentRecorder {
    fn choose(&mut self, data: &dyn GraphDataSource) -> Result<Option<Component>, WorkloadError> {
        let bit = self.rng.gen_range(0..2_u64);
        self.kinds.append(&bit.to_string())?;
        let kind = ComponentKind::from_trace_bit(bit);

        let bound = self.counter.issued(kind).max(1);
        let id = self.rng.gen_range(0..bound);
        let out = match kind {
            ComponentKind::Node => &mut self.node_ids,
            ComponentKind::Edge => &mut self.edge_ids,
        };
        out.append(&id.to_string())?;
        debug!(%kind, id, bound, "recorded choice");

        self.last = resolve(data, kind, id);
        Ok(self.last.clone())
    }

    fn last_value(&self) -> Option<Component> {
        self.last.clone()
    }

    fn is_exhausted(&self) -> bool {
        false
    }

    fn mode(&self) -> TraceMode {
        TraceMode::Record
    }
}

#[derive(Debug, Default)]
struct Cursor {
    values: Vec<u64>,
    position: usize,
}

impl Cursor {
    fn next(&mut self) -> Option<u64> {
        let value = self.values.get(self.position).copied()?;
        self.position += 1;
        Some(value)
    }
}

/// Replays recorded choices.
#[derive(Debug)]
pub struct RandomComponentRecreator {
    kinds: Cursor,
    node_ids: Cursor,
    edge_ids: Cursor,
    exhausted: bool,
    last: Option<Component>,
}

impl RandomComponentRecreator {
    /// Read the three trace files in `directory`.
    pub fn open(directory: &Path) -> Result<Self, WorkloadError> {
        let load = |name: &str| -> Result<Cursor, WorkloadError> {
            Ok(Cursor {
                values: read_u64_trace(&directory.join(name))?,
                position: 0,
            })
        };
        let kinds = load(COMPONENT_KIND_TRACE)?;
        info!(choices = kinds.values.len(), "component choices ready");
        Ok(Self {
            kinds,
            node_ids: load(NODE_ID_TRACE)?,
            edge_ids: load(EDGE_ID_TRACE)?,
            exhausted: false,
            last: None,
        })
    }
}

impl ComponentChooser for RandomComponentRecreator {
    fn choose(&mut self, data: &dyn GraphDataSource) -> Result<Option<Component>, WorkloadError> {
        let next = self.kinds.next().and_then(|bit| {
            let kind = ComponentKind::from_trace_bit(bit);
            let ids = match kind {
                ComponentKind::Node => &mut self.node_ids,
                ComponentKind::Edge => &mut self.edge_ids,
            };
            ids.next().map(|id| (kind, id))
        });
        self.last = match next {
            Some((kind, id)) => resolve(data, kind, id),
            None => {
                if !self.exhausted {
                    info!("component choices exhausted");
                }
                self.exhausted = true;
                None
            }
        };
        Ok(self.last.clone())
    }

    fn last_value(&self) -> Option<Component> {
        self.last.clone()
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn mode(&self) -> TraceMode {
        TraceMode::Replay
    }
}
