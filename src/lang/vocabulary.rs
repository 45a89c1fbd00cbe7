//! Static per-language node-kind tables.
//!
//! A [`Vocabulary`] names the tree-sitter node kinds that matter to the
//! shared extraction and control-flow code. Languages describe themselves
//! with one of these tables; behavior that cannot be expressed as a kind
//! list lives in the language's analyzer.

use tree_sitter::Node;

use crate::lang::language::Language;
use crate::lang::registry::node_text;

/// Node-kind tables for one language.
#[derive(Debug)]
pub struct Vocabulary {
    /// Callable declarations (function or method depending on container)
    pub functions: &'static [&'static str],
    /// Callable declarations that are always methods (Go receivers)
    pub methods: &'static [&'static str],
    /// Class-like declarations whose callables become methods
    pub classes: &'static [&'static str],
    /// Other named type declarations
    pub types: &'static [&'static str],
    /// Module- or class-level bindings
    pub variables: &'static [&'static str],
    /// Non-signature containers whose callables become methods (Rust `impl`)
    pub method_scopes: &'static [&'static str],
    /// Named namespaces that extend the scope path
    pub namespaces: &'static [&'static str],
    /// Nodes that wrap a declaration (decorators, exports, templates)
    pub wrappers: &'static [&'static str],
    /// Two-way branches
    pub branches: &'static [&'static str],
    /// Conditional loops
    pub loops: &'static [&'static str],
    /// Loops whose header may omit the condition (`for (;;)`, Go `for {}`)
    pub open_loops: &'static [&'static str],
    /// Multi-way dispatch
    pub dispatch: &'static [&'static str],
    /// Dispatch where some arm always runs (must be exhaustive or blocks)
    pub exhaustive_dispatch: &'static [&'static str],
    /// Arms of a multi-way dispatch
    pub arms: &'static [&'static str],
    /// Arms taken when no other arm matches
    pub default_arms: &'static [&'static str],
    /// Arm children holding the case label or pattern
    pub arm_labels: &'static [&'static str],
    /// Exception handlers
    pub handlers: &'static [&'static str],
    /// Guards and statement modifiers
    pub guards: &'static [&'static str],
    /// Patterns that guard only when they carry a `condition` field
    pub guarded_patterns: &'static [&'static str],
    /// Binary expression kinds that may short-circuit
    pub logical: &'static [&'static str],
    /// Operators that short-circuit
    pub logical_operators: &'static [&'static str],
    /// Comment kinds
    pub comments: &'static [&'static str],
    /// Attribute kinds skipped when looking for doc comments
    pub attributes: &'static [&'static str],
    /// Import declarations
    pub imports: &'static [&'static str],
    /// Identifier leaf kinds
    pub identifiers: &'static [&'static str],
    /// Assignments whose `left` field is written
    pub assignments: &'static [&'static str],
    /// Fields holding a callable's return type, tried in order
    pub return_fields: &'static [&'static str],
    /// Field holding the parameter list
    pub parameters_field: &'static str,
    /// Query capturing callee expressions as `@callee`
    pub call_query: &'static str,
}

/// How the control-flow builder treats a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Branch,
    Loop,
    Dispatch,
    Handler,
    Guard,
    ShortCircuit,
    PassThrough,
}

impl Vocabulary {
    /// Classify `node` for control-flow construction.
    pub fn construct(&self, node: Node<'_>, source: &str) -> Construct {
        let kind = node.kind();
        if self.branches.contains(&kind) {
            Construct::Branch
        } else if self.loops.contains(&kind) {
            if self.open_loops.contains(&kind) && !has_loop_condition(node) {
                Construct::PassThrough
            } else {
                Construct::Loop
            }
        } else if self.dispatch.contains(&kind) {
            Construct::Dispatch
        } else if self.handlers.contains(&kind) {
            Construct::Handler
        } else if self.guards.contains(&kind)
            || (self.guarded_patterns.contains(&kind)
                && node.child_by_field_name("condition").is_some())
        {
            Construct::Guard
        } else if self.logical.contains(&kind) && self.is_short_circuit(node, source) {
            Construct::ShortCircuit
        } else {
            Construct::PassThrough
        }
    }

    /// Whether `arm` runs when no other arm of its dispatch matches:
    /// a default arm kind, a `default` label, or a bare `_` pattern.
    /// Guarded arms never qualify.
    pub fn is_default_arm(&self, arm: Node<'_>, source: &str) -> bool {
        if self.default_arms.contains(&arm.kind()) {
            return true;
        }
        if arm.child_by_field_name("guard").is_some() {
            return false;
        }
        if has_default_keyword(arm) {
            return true;
        }

        let mut cursor = arm.walk();
        let labels: Vec<Node<'_>> = arm
            .named_children(&mut cursor)
            .filter(|child| self.arm_labels.contains(&child.kind()))
            .collect();
        labels.into_iter().any(|label| {
            has_default_keyword(label)
                || (!has_guard(label) && node_text(label, source).trim() == "_")
        })
    }

    fn is_short_circuit(&self, node: Node<'_>, source: &str) -> bool {
        node.child_by_field_name("operator")
            .map(|op| self.logical_operators.contains(&node_text(op, source).trim()))
            .unwrap_or(false)
    }

    pub fn is_comment(&self, kind: &str) -> bool {
        self.comments.contains(&kind)
    }

    pub fn is_identifier(&self, kind: &str) -> bool {
        self.identifiers.contains(&kind)
    }
}

fn has_default_keyword(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == "default");
    found
}

fn has_guard(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "guard");
    found
}

/// Whether an open loop's header tests anything. Go keeps its header in an
/// unnamed child; C-style loops use the `condition` field.
fn has_loop_condition(node: Node<'_>) -> bool {
    if let Some(condition) = node.child_by_field_name("condition") {
        return condition.is_named() && condition.kind() != "empty_statement";
    }

    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return false;
    }
    loop {
        let child = cursor.node();
        if child.is_named() && !child.is_extra() && cursor.field_name().is_none() {
            return match child.kind() {
                "for_clause" => child.child_by_field_name("condition").is_some(),
                _ => true,
            };
        }
        if !cursor.goto_next_sibling() {
            return false;
        }
    }
}

/// Vocabulary table for `language`.
pub fn for_language(language: Language) -> &'static Vocabulary {
    use crate::lang::{
        c, cpp, csharp, go, java, javascript, php, python, ruby, rust_lang, scala, typescript,
    };

    match language {
        Language::Python => &python::VOCABULARY,
        Language::JavaScript => &javascript::VOCABULARY,
        Language::TypeScript | Language::Tsx => &typescript::VOCABULARY,
        Language::Rust => &rust_lang::VOCABULARY,
        Language::Go => &go::VOCABULARY,
        Language::C => &c::VOCABULARY,
        Language::Cpp => &cpp::VOCABULARY,
        Language::Java => &java::VOCABULARY,
        Language::CSharp => &csharp::VOCABULARY,
        Language::Ruby => &ruby::VOCABULARY,
        Language::Php => &php::VOCABULARY,
        Language::Scala => &scala::VOCABULARY,
    }
}
