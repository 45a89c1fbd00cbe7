//! Holder of the current graph snapshot.
//!
//! Readers load an `Arc` and keep it for as long as they need; publishing
//! swaps the pointer and never touches a graph a reader may hold.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::info;

use crate::core::errors::{Result, TrellisError};
use crate::graph::pdg::ProgramDependenceGraph;

/// Atomically replaceable graph snapshot.
#[derive(Debug, Default)]
pub struct GraphStore {
    current: ArcSwapOption<ProgramDependenceGraph>,
    generation: AtomicU64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; `NotIndexed` before the first publish.
    pub fn current(&self) -> Result<Arc<ProgramDependenceGraph>> {
        self.current.load_full().ok_or(TrellisError::NotIndexed)
    }

    /// Replace the active snapshot and return its generation.
    pub fn publish(&self, mut graph: ProgramDependenceGraph) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        graph.set_generation(generation);
        let nodes = graph.node_count();
        let edges = graph.edge_count();
        self.current.store(Some(Arc::new(graph)));
        info!(generation, nodes, edges, "Published graph snapshot");
        generation
    }

    /// Generation of the last publish (0 when nothing was published).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_indexed(&self) -> bool {
        self.current.load().is_some()
    }
}
