//! Program dependence graph data model.
//!
//! A [`ProgramDependenceGraph`] can only be constructed through
//! [`ProgramDependenceGraph::from_parts`], which rejects duplicate ids and
//! dangling edges. Once built it is never mutated; rebuilds produce a new
//! graph that replaces the old one wholesale.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::cfg::ComplexityScore;
use crate::core::errors::{Result, TrellisError};
use crate::lang::common::{Signature, SignatureKind};
use crate::lang::language::Language;

/// Stable node identity: `path` for modules, `path::scope::name` for symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn module(path: &str) -> Self {
        Self(path.to_string())
    }

    pub fn symbol(path: &str, scope: &[String], name: &str) -> Self {
        let mut id = String::with_capacity(path.len() + name.len() + 2);
        id.push_str(path);
        for part in scope {
            id.push_str("::");
            id.push_str(part);
        }
        id.push_str("::");
        id.push_str(name);
        Self(id)
    }

    /// Same id with an ordinal suffix for repeated declarations.
    pub fn with_ordinal(&self, ordinal: usize) -> Self {
        Self(format!("{}#{}", self.0, ordinal))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Module,
    Function,
    Method,
    Class,
    Type,
    Variable,
}

impl From<SignatureKind> for NodeKind {
    fn from(kind: SignatureKind) -> Self {
        match kind {
            SignatureKind::Function => NodeKind::Function,
            SignatureKind::Method => NodeKind::Method,
            SignatureKind::Class => NodeKind::Class,
            SignatureKind::Type => NodeKind::Type,
            SignatureKind::Variable => NodeKind::Variable,
        }
    }
}

impl NodeKind {
    pub fn is_callable(self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method)
    }
}

/// Relation carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Calls,
    Reads,
    Writes,
    Imports,
    Defines,
}

impl Relation {
    /// Priority during context expansion; higher is expanded first.
    pub fn weight(self) -> u8 {
        match self {
            Relation::Calls => 3,
            Relation::Reads | Relation::Writes => 2,
            Relation::Imports | Relation::Defines => 1,
        }
    }
}

/// A symbol or module in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdgNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub language: Language,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Present for every node except modules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Arc<Signature>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityScore>,
    /// Modification time reported by the indexing collaborator
    pub freshness: DateTime<Utc>,
}

/// A directed relation between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PdgEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub relation: Relation,
}

impl PdgEdge {
    pub fn new(source: NodeId, target: NodeId, relation: Relation) -> Self {
        Self {
            source,
            target,
            relation,
        }
    }
}

/// Snapshot bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Publish counter assigned by the graph store (0 before publishing)
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub file_count: usize,
}

/// Whole-project graph of symbols and relations.
#[derive(Debug, Clone)]
pub struct ProgramDependenceGraph {
    graph: DiGraph<PdgNode, Relation>,
    index: BTreeMap<NodeId, NodeIndex>,
    metadata: GraphMetadata,
}

impl ProgramDependenceGraph {
    /// Validate and assemble a graph.
    ///
    /// Nodes are inserted in id order and edges deduplicated and sorted, so
    /// equal inputs always yield equal graphs. Duplicate node ids and edges
    /// whose endpoints are missing fail with `GraphIntegrity`.
    pub fn from_parts(
        mut nodes: Vec<PdgNode>,
        edges: impl IntoIterator<Item = PdgEdge>,
        file_count: usize,
    ) -> Result<Self> {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut graph = DiGraph::with_capacity(nodes.len(), 0);
        let mut index = BTreeMap::new();
        for node in nodes {
            let id = node.id.clone();
            if index.contains_key(&id) {
                error!("Duplicate node id {} in merged graph", id);
                return Err(TrellisError::integrity("duplicate node id", id.as_str()));
            }
            let idx = graph.add_node(node);
            index.insert(id, idx);
        }

        let edges: BTreeSet<PdgEdge> = edges.into_iter().collect();
        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target)) else {
                let element = format!("{} -[{:?}]-> {}", edge.source, edge.relation, edge.target);
                error!("Dangling edge {} in merged graph", element);
                return Err(TrellisError::integrity("dangling edge", element));
            };
            graph.add_edge(from, to, edge.relation);
        }

        Ok(Self {
            graph,
            index,
            metadata: GraphMetadata {
                generation: 0,
                built_at: Utc::now(),
                file_count,
            },
        })
    }

    pub fn node(&self, id: &NodeId) -> Option<&PdgNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &PdgNode> + '_ {
        self.index.values().map(move |&idx| &self.graph[idx])
    }

    /// Edges in sorted order.
    pub fn edges(&self) -> Vec<PdgEdge> {
        let mut edges: Vec<PdgEdge> = self
            .graph
            .edge_references()
            .map(|edge| {
                PdgEdge::new(
                    self.graph[edge.source()].id.clone(),
                    self.graph[edge.target()].id.clone(),
                    *edge.weight(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.metadata.generation = generation;
    }

    /// Forward index: nodes `id` points at, with the relation.
    pub fn outgoing(&self, id: &NodeId) -> Vec<(&PdgNode, Relation)> {
        self.adjacent(id, Direction::Outgoing)
    }

    /// Reverse index: nodes pointing at `id`, with the relation.
    pub fn incoming(&self, id: &NodeId) -> Vec<(&PdgNode, Relation)> {
        self.adjacent(id, Direction::Incoming)
    }

    /// Nodes with a `calls` edge into `id`.
    pub fn callers(&self, id: &NodeId) -> Vec<&PdgNode> {
        self.incoming(id)
            .into_iter()
            .filter(|(_, relation)| *relation == Relation::Calls)
            .map(|(node, _)| node)
            .collect()
    }

    /// Nodes `id` has a `calls` edge to.
    pub fn callees(&self, id: &NodeId) -> Vec<&PdgNode> {
        self.outgoing(id)
            .into_iter()
            .filter(|(_, relation)| *relation == Relation::Calls)
            .map(|(node, _)| node)
            .collect()
    }

    fn adjacent(&self, id: &NodeId, direction: Direction) -> Vec<(&PdgNode, Relation)> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut adjacent: Vec<(&PdgNode, Relation)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (&self.graph[other], *edge.weight())
            })
            .collect();
        adjacent.sort_by(|a, b| a.0.id.cmp(&b.0.id).then(a.1.cmp(&b.1)));
        adjacent
    }

    /// Re-check that every edge endpoint and index entry agrees with the graph.
    pub fn validate(&self) -> Result<()> {
        if self.index.len() != self.graph.node_count() {
            return Err(TrellisError::integrity(
                "index size disagrees with node count",
                format!("{} != {}", self.index.len(), self.graph.node_count()),
            ));
        }
        for (id, &idx) in &self.index {
            match self.graph.node_weight(idx) {
                Some(node) if &node.id == id => {}
                _ => return Err(TrellisError::integrity("stale index entry", id.as_str())),
            }
        }
        for edge in self.graph.edge_references() {
            if self.graph.node_weight(edge.source()).is_none()
                || self.graph.node_weight(edge.target()).is_none()
            {
                return Err(TrellisError::integrity(
                    "dangling edge",
                    format!("{:?} -> {:?}", edge.source(), edge.target()),
                ));
            }
        }
        Ok(())
    }

    /// Node-for-node, edge-for-edge comparison ignoring build metadata.
    pub fn same_structure(&self, other: &Self) -> bool {
        self.nodes().eq(other.nodes()) && self.edges() == other.edges()
    }
}

#[derive(Serialize)]
struct GraphView<'a> {
    metadata: &'a GraphMetadata,
    nodes: Vec<&'a PdgNode>,
    edges: Vec<PdgEdge>,
}

impl Serialize for ProgramDependenceGraph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        GraphView {
            metadata: &self.metadata,
            nodes: self.nodes().collect(),
            edges: self.edges(),
        }
        .serialize(serializer)
    }
}
