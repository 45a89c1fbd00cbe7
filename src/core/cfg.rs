//! Control flow graphs and cyclomatic complexity.
//!
//! Graphs are built by a structured walk over a signature body. Every
//! decision construct contributes a sub-graph with exactly one more edge than
//! blocks, so `edges - blocks + 2 == decision_points + 1` holds for every
//! graph the builder produces and complexity can never disagree with the
//! graph it was derived from.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::core::errors::{Result, TrellisError};
use crate::lang::vocabulary::{Construct, Vocabulary};

/// Index of a block within its graph.
pub type BlockId = usize;

/// Role of a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Entry,
    Exit,
    Then,
    Else,
    Join,
    LoopHeader,
    LoopBody,
    LoopExit,
    Arm,
    Handler,
    Guard,
    Operand,
}

/// Control transfer between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Sequential,
    BranchTrue,
    BranchFalse,
    LoopBack,
}

/// A basic block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    /// 1-based line where the block starts
    pub line: usize,
}

/// A directed control-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgEdge {
    pub from: BlockId,
    pub to: BlockId,
    pub kind: EdgeKind,
}

/// Cyclomatic complexity: one plus the number of decision points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplexityScore(usize);

impl ComplexityScore {
    /// Score for a body with `decision_points` decisions.
    pub fn from_decisions(decision_points: usize) -> Self {
        Self(decision_points + 1)
    }

    pub fn value(self) -> usize {
        self.0
    }
}

/// Counts retained after the graph itself is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgSummary {
    pub blocks: usize,
    pub edges: usize,
    pub decision_points: usize,
}

/// Per-signature graph of basic blocks and control transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    edges: Vec<CfgEdge>,
    decision_points: usize,
}

impl ControlFlowGraph {
    /// Graph holding only an entry block.
    pub fn new(line: usize) -> Self {
        Self {
            blocks: vec![BasicBlock {
                id: 0,
                kind: BlockKind::Entry,
                line,
            }],
            edges: Vec::new(),
            decision_points: 0,
        }
    }

    pub fn entry(&self) -> BlockId {
        0
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn edges(&self) -> &[CfgEdge] {
        &self.edges
    }

    pub fn decision_points(&self) -> usize {
        self.decision_points
    }

    /// `E - N + 2` computed from the graph shape.
    pub fn cyclomatic_number(&self) -> usize {
        (self.edges.len() + 2).saturating_sub(self.blocks.len())
    }

    /// Complexity derived from this graph.
    pub fn complexity(&self) -> ComplexityScore {
        debug_assert_eq!(
            self.cyclomatic_number(),
            self.decision_points + 1,
            "control flow graph shape disagrees with its decision count"
        );
        ComplexityScore::from_decisions(self.decision_points)
    }

    pub fn summary(&self) -> CfgSummary {
        CfgSummary {
            blocks: self.blocks.len(),
            edges: self.edges.len(),
            decision_points: self.decision_points,
        }
    }

    fn add_block(&mut self, kind: BlockKind, line: usize) -> BlockId {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock { id, kind, line });
        id
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) {
        self.edges.push(CfgEdge { from, to, kind });
    }
}

/// Structured walk that turns a syntax subtree into a [`ControlFlowGraph`].
pub struct CfgBuilder<'a, F>
where
    F: Fn(Node<'_>) -> bool,
{
    vocabulary: &'a Vocabulary,
    source: &'a str,
    max_depth: usize,
    is_nested_declaration: F,
    root_id: usize,
    graph: ControlFlowGraph,
}

impl<'a, F> CfgBuilder<'a, F>
where
    F: Fn(Node<'_>) -> bool,
{
    /// `is_nested_declaration` reports declarations that are analyzed on
    /// their own and must not be walked as part of the enclosing body.
    pub fn new(
        vocabulary: &'a Vocabulary,
        source: &'a str,
        max_depth: usize,
        is_nested_declaration: F,
    ) -> Self {
        Self {
            vocabulary,
            source,
            max_depth,
            is_nested_declaration,
            root_id: usize::MAX,
            graph: ControlFlowGraph::new(1),
        }
    }

    /// Build the graph for the subtree rooted at `root`.
    pub fn build(mut self, root: Node<'_>) -> Result<ControlFlowGraph> {
        self.root_id = root.id();
        self.graph = ControlFlowGraph::new(line_of(root));

        let entry = self.graph.entry();
        let last = self.visit(root, entry, 0)?;
        let exit = self
            .graph
            .add_block(BlockKind::Exit, root.end_position().row + 1);
        self.graph.add_edge(last, exit, EdgeKind::Sequential);

        Ok(self.graph)
    }

    fn visit(&mut self, node: Node<'_>, current: BlockId, depth: usize) -> Result<BlockId> {
        if depth > self.max_depth {
            return Err(TrellisError::TreeDepthExceeded {
                depth,
                limit: self.max_depth,
            });
        }
        if node.id() != self.root_id && (self.is_nested_declaration)(node) {
            return Ok(current);
        }

        match self.vocabulary.construct(node, self.source) {
            Construct::Branch => self.branch(node, current, depth),
            Construct::Loop => self.conditional_loop(node, current, depth),
            Construct::Dispatch => self.dispatch(node, current, depth),
            Construct::Handler => self.diamond(node, current, depth, BlockKind::Handler),
            Construct::Guard => self.diamond(node, current, depth, BlockKind::Guard),
            Construct::ShortCircuit => self.short_circuit(node, current, depth),
            Construct::PassThrough => self.sequence(named_children(node), current, depth),
        }
    }

    fn sequence(&mut self, nodes: Vec<Node<'_>>, current: BlockId, depth: usize) -> Result<BlockId> {
        let mut block = current;
        for child in nodes {
            block = self.visit(child, block, depth + 1)?;
        }
        Ok(block)
    }

    fn branch(&mut self, node: Node<'_>, current: BlockId, depth: usize) -> Result<BlockId> {
        let condition = node.child_by_field_name("condition");
        let mut cursor = node.walk();
        let alternatives: Vec<Node<'_>> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        let consequence: Vec<Node<'_>> = named_children(node)
            .into_iter()
            .filter(|child| {
                condition.map(|c| c.id()) != Some(child.id())
                    && !alternatives.iter().any(|alt| alt.id() == child.id())
            })
            .collect();

        let head = match condition {
            Some(condition) => self.visit(condition, current, depth + 1)?,
            None => current,
        };

        let then_block = self.graph.add_block(BlockKind::Then, line_of(node));
        self.graph.add_edge(head, then_block, EdgeKind::BranchTrue);
        let then_end = self.sequence(consequence, then_block, depth)?;

        let join = if alternatives.is_empty() {
            let join = self.graph.add_block(BlockKind::Join, end_line_of(node));
            self.graph.add_edge(head, join, EdgeKind::BranchFalse);
            self.graph.add_edge(then_end, join, EdgeKind::Sequential);
            join
        } else {
            let else_line = line_of(alternatives[0]);
            let else_block = self.graph.add_block(BlockKind::Else, else_line);
            self.graph.add_edge(head, else_block, EdgeKind::BranchFalse);
            let else_end = self.sequence(alternatives, else_block, depth)?;

            let join = self.graph.add_block(BlockKind::Join, end_line_of(node));
            self.graph.add_edge(then_end, join, EdgeKind::Sequential);
            self.graph.add_edge(else_end, join, EdgeKind::Sequential);
            join
        };

        self.graph.decision_points += 1;
        Ok(join)
    }

    fn conditional_loop(&mut self, node: Node<'_>, current: BlockId, depth: usize) -> Result<BlockId> {
        let body = node.child_by_field_name("body");
        let head_parts: Vec<Node<'_>> = named_children(node)
            .into_iter()
            .filter(|child| body.map(|b| b.id()) != Some(child.id()))
            .collect();

        let header = self.graph.add_block(BlockKind::LoopHeader, line_of(node));
        self.graph.add_edge(current, header, EdgeKind::Sequential);
        let head_end = self.sequence(head_parts, header, depth)?;

        let body_block = self.graph.add_block(
            BlockKind::LoopBody,
            body.map(line_of).unwrap_or_else(|| line_of(node)),
        );
        self.graph.add_edge(head_end, body_block, EdgeKind::BranchTrue);
        let body_end = match body {
            Some(body) => self.visit(body, body_block, depth + 1)?,
            None => body_block,
        };
        self.graph.add_edge(body_end, header, EdgeKind::LoopBack);

        let exit = self.graph.add_block(BlockKind::LoopExit, end_line_of(node));
        self.graph.add_edge(head_end, exit, EdgeKind::BranchFalse);

        self.graph.decision_points += 1;
        Ok(exit)
    }

    fn dispatch(&mut self, node: Node<'_>, current: BlockId, depth: usize) -> Result<BlockId> {
        let mut head = current;
        for field in ["value", "condition", "subject"] {
            if let Some(scrutinee) = node.child_by_field_name(field) {
                head = self.visit(scrutinee, head, depth + 1)?;
            }
        }

        let mut arms = Vec::new();
        self.collect_arms(node, 0, &mut arms);

        let join = self.graph.add_block(BlockKind::Join, end_line_of(node));
        if arms.is_empty() {
            self.graph.add_edge(head, join, EdgeKind::Sequential);
            return Ok(join);
        }

        // Without a default arm the scrutinee can fall straight through.
        let default_arm = arms
            .iter()
            .position(|arm| self.vocabulary.is_default_arm(*arm, self.source))
            .or_else(|| {
                self.vocabulary
                    .exhaustive_dispatch
                    .contains(&node.kind())
                    .then(|| arms.len() - 1)
            });

        for (index, arm) in arms.iter().enumerate() {
            let arm_block = self.graph.add_block(BlockKind::Arm, line_of(*arm));
            let kind = if Some(index) == default_arm {
                EdgeKind::BranchFalse
            } else {
                EdgeKind::BranchTrue
            };
            self.graph.add_edge(head, arm_block, kind);
            let arm_end = self.sequence(named_children(*arm), arm_block, depth + 1)?;
            self.graph.add_edge(arm_end, join, EdgeKind::Sequential);
        }

        match default_arm {
            Some(_) => self.graph.decision_points += arms.len() - 1,
            None => {
                self.graph.add_edge(head, join, EdgeKind::BranchFalse);
                self.graph.decision_points += arms.len();
            }
        }
        Ok(join)
    }

    /// Arms sit directly under the dispatch node or inside its body block.
    fn collect_arms<'t>(&self, node: Node<'t>, level: usize, arms: &mut Vec<Node<'t>>) {
        for child in named_children(node) {
            if self.vocabulary.arms.contains(&child.kind()) {
                arms.push(child);
            } else if level < 2
                && self.vocabulary.construct(child, self.source) == Construct::PassThrough
            {
                self.collect_arms(child, level + 1, arms);
            }
        }
    }

    fn diamond(
        &mut self,
        node: Node<'_>,
        current: BlockId,
        depth: usize,
        kind: BlockKind,
    ) -> Result<BlockId> {
        let taken = self.graph.add_block(kind, line_of(node));
        self.graph.add_edge(current, taken, EdgeKind::BranchTrue);
        let taken_end = self.sequence(named_children(node), taken, depth)?;

        let join = self.graph.add_block(BlockKind::Join, end_line_of(node));
        self.graph.add_edge(current, join, EdgeKind::BranchFalse);
        self.graph.add_edge(taken_end, join, EdgeKind::Sequential);

        self.graph.decision_points += 1;
        Ok(join)
    }

    fn short_circuit(&mut self, node: Node<'_>, current: BlockId, depth: usize) -> Result<BlockId> {
        let children = named_children(node);
        let left = node
            .child_by_field_name("left")
            .or_else(|| children.first().copied());
        let right = node
            .child_by_field_name("right")
            .or_else(|| children.last().copied());

        let head = match left {
            Some(left) => self.visit(left, current, depth + 1)?,
            None => current,
        };

        let operand = self.graph.add_block(BlockKind::Operand, line_of(node));
        self.graph.add_edge(head, operand, EdgeKind::BranchTrue);
        let operand_end = match right {
            Some(right) => self.visit(right, operand, depth + 1)?,
            None => operand,
        };

        let join = self.graph.add_block(BlockKind::Join, end_line_of(node));
        self.graph.add_edge(head, join, EdgeKind::BranchFalse);
        self.graph.add_edge(operand_end, join, EdgeKind::Sequential);

        self.graph.decision_points += 1;
        Ok(join)
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn end_line_of(node: Node<'_>) -> usize {
    node.end_position().row + 1
}
