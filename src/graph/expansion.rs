//! Budgeted context expansion around a seed node.
//!
//! Traversal proceeds hop by hop. Within a hop candidates are ordered by
//! relation weight, then freshness (newest first), then id, and the first
//! candidate that does not fit ends the traversal. The bundle for a smaller
//! budget is therefore always a prefix of the bundle for a larger one.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::config::ExpansionConfig;
use crate::core::errors::{Result, TrellisError};
use crate::graph::pdg::{NodeId, NodeKind, PdgNode, ProgramDependenceGraph, Relation};

/// Compact description of one node in a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Relation that reached this node; absent for the seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    pub hop: usize,
}

impl ContextEntry {
    fn new(node: &PdgNode, relation: Option<Relation>, hop: usize) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind,
            name: node.name.clone(),
            file: node.file.clone(),
            start_line: node.start_line,
            end_line: node.end_line,
            relation,
            hop,
        }
    }
}

/// Result of an expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextBundle {
    pub seed: ContextEntry,
    pub callers: Vec<ContextEntry>,
    pub callees: Vec<ContextEntry>,
    pub related: Vec<ContextEntry>,
    /// Whether a candidate was left out for lack of budget
    pub truncated: bool,
    /// Tokens taken by this bundle's compact JSON
    pub used_tokens: usize,
}

impl ContextBundle {
    /// Every entry except the seed, in traversal order per list.
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> + '_ {
        self.callers
            .iter()
            .chain(self.callees.iter())
            .chain(self.related.iter())
    }

    pub fn len(&self) -> usize {
        self.callers.len() + self.callees.len() + self.related.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// List a node lands in. Direction is sticky once taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Lane {
    Callers,
    Callees,
    Related,
}

#[derive(Debug, Clone)]
struct Candidate<'g> {
    node: &'g PdgNode,
    lane: Lane,
    relation: Relation,
}

impl Candidate<'_> {
    fn sort_key(&self) -> (Reverse<u8>, Reverse<DateTime<Utc>>, &NodeId) {
        (
            Reverse(self.relation.weight()),
            Reverse(self.node.freshness),
            &self.node.id,
        )
    }

    /// Whether `self` should replace `other` for the same node.
    fn outranks(&self, other: &Self) -> bool {
        (Reverse(self.relation.weight()), self.lane) < (Reverse(other.relation.weight()), other.lane)
    }
}

/// Running compact-JSON size of a bundle.
///
/// Tracks the exact length with `used_tokens` serialized as `0` plus slack
/// for the digits the final count can take, so the check is an upper bound
/// of the final size.
struct Meter {
    bytes: usize,
    slack: usize,
    bytes_per_token: usize,
    budget: usize,
}

impl Meter {
    fn fits(&self, extra: usize) -> bool {
        tokens(self.bytes + extra + self.slack, self.bytes_per_token) <= self.budget
    }
}

fn tokens(bytes: usize, bytes_per_token: usize) -> usize {
    bytes.div_ceil(bytes_per_token)
}

fn digits(mut value: usize) -> usize {
    let mut count = 1;
    while value >= 10 {
        value /= 10;
        count += 1;
    }
    count
}

fn json_len<T: Serialize>(value: &T) -> Result<usize> {
    Ok(serde_json::to_vec(value)?.len())
}

/// Set `used_tokens` to the smallest count covering the bundle serialized
/// with it.
fn settle_tokens(bundle: &mut ContextBundle, bytes_per_token: usize) -> Result<()> {
    let mut used = 0;
    loop {
        bundle.used_tokens = used;
        let needed = tokens(json_len(bundle)?, bytes_per_token);
        if needed <= used {
            return Ok(());
        }
        used = needed;
    }
}

/// Read-only traversal over one graph snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ContextExpander<'a> {
    graph: &'a ProgramDependenceGraph,
    config: &'a ExpansionConfig,
}

impl<'a> ContextExpander<'a> {
    pub fn new(graph: &'a ProgramDependenceGraph, config: &'a ExpansionConfig) -> Self {
        Self { graph, config }
    }

    /// Expand around `seed` without the bundle exceeding `token_budget`.
    pub fn expand(&self, seed: &NodeId, token_budget: usize) -> Result<ContextBundle> {
        let seed_node = self
            .graph
            .node(seed)
            .ok_or_else(|| TrellisError::node_not_found(seed.as_str()))?;
        let bytes_per_token = self.config.bytes_per_token.max(1);

        let mut bundle = ContextBundle {
            seed: ContextEntry::new(seed_node, None, 0),
            callers: Vec::new(),
            callees: Vec::new(),
            related: Vec::new(),
            truncated: false,
            used_tokens: 0,
        };

        let base = json_len(&bundle)?;
        let meter_slack = digits(token_budget) - 1;
        if tokens(base + meter_slack, bytes_per_token) > token_budget {
            let mut required = tokens(base, bytes_per_token);
            while tokens(base + digits(required) - 1, bytes_per_token) > required {
                required += 1;
            }
            return Err(TrellisError::BudgetTooSmall {
                budget: token_budget,
                required,
            });
        }

        let mut meter = Meter {
            bytes: base,
            slack: meter_slack,
            bytes_per_token,
            budget: token_budget,
        };
        let mut visited: BTreeSet<&NodeId> = BTreeSet::from([&seed_node.id]);
        let mut frontier: Vec<(&PdgNode, Option<Lane>)> = vec![(seed_node, None)];

        'hops: for hop in 1..=self.config.max_hops {
            let mut candidates: BTreeMap<&NodeId, Candidate<'_>> = BTreeMap::new();
            for (node, lane) in &frontier {
                for candidate in self.neighbours(node, *lane) {
                    let reached = candidate.node;
                    if visited.contains(&reached.id) {
                        continue;
                    }
                    match candidates.get(&reached.id) {
                        Some(existing) if !candidate.outranks(existing) => {}
                        _ => {
                            candidates.insert(&reached.id, candidate);
                        }
                    }
                }
            }

            let mut ordered: Vec<Candidate<'_>> = candidates.into_values().collect();
            ordered.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

            let mut next = Vec::new();
            for candidate in ordered {
                let reached = candidate.node;
                let entry = ContextEntry::new(reached, Some(candidate.relation), hop);
                let list = match candidate.lane {
                    Lane::Callers => &mut bundle.callers,
                    Lane::Callees => &mut bundle.callees,
                    Lane::Related => &mut bundle.related,
                };
                let cost = json_len(&entry)? + usize::from(!list.is_empty());
                if !meter.fits(cost) {
                    bundle.truncated = true;
                    break 'hops;
                }
                meter.bytes += cost;
                list.push(entry);
                visited.insert(&reached.id);
                next.push((reached, Some(candidate.lane)));
            }

            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        settle_tokens(&mut bundle, bytes_per_token)?;
        debug!(
            "Expanded {} into {} entries ({} tokens, truncated: {})",
            seed,
            bundle.len(),
            bundle.used_tokens,
            bundle.truncated
        );
        Ok(bundle)
    }

    /// Candidates one hop from `node`. The seed expands in every direction;
    /// other nodes keep the direction they were reached in.
    fn neighbours(&self, node: &PdgNode, lane: Option<Lane>) -> Vec<Candidate<'a>> {
        let mut found = Vec::new();
        for (other, relation) in self.graph.incoming(&node.id) {
            let lane = match (lane, relation) {
                (None | Some(Lane::Callers), Relation::Calls) => Lane::Callers,
                (None | Some(Lane::Related), _) => Lane::Related,
                _ => continue,
            };
            found.push(Candidate {
                node: other,
                lane,
                relation,
            });
        }
        for (other, relation) in self.graph.outgoing(&node.id) {
            let lane = match (lane, relation) {
                (None | Some(Lane::Callees), Relation::Calls) => Lane::Callees,
                (None | Some(Lane::Related), _) => Lane::Related,
                _ => continue,
            };
            found.push(Candidate {
                node: other,
                lane,
                relation,
            });
        }
        found
    }
}
