//! Rust analyzer.

use tree_sitter::Node;

use crate::lang::common::{AnalysisLimits, LanguageAnalyzer, Visibility};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["function_item", "function_signature_item"],
    methods: &[],
    classes: &[],
    types: &["struct_item", "enum_item", "trait_item", "type_item", "union_item"],
    variables: &["const_item", "static_item"],
    method_scopes: &["impl_item"],
    namespaces: &["mod_item"],
    wrappers: &[],
    branches: &["if_expression"],
    loops: &["while_expression", "for_expression"],
    open_loops: &[],
    dispatch: &["match_expression"],
    exhaustive_dispatch: &["match_expression"],
    arms: &["match_arm"],
    default_arms: &[],
    arm_labels: &[],
    handlers: &[],
    guards: &[],
    guarded_patterns: &["match_pattern"],
    logical: &["binary_expression"],
    logical_operators: &["&&", "||"],
    comments: &["line_comment", "block_comment"],
    attributes: &["attribute_item", "inner_attribute_item"],
    imports: &["use_declaration"],
    identifiers: &["identifier"],
    assignments: &["assignment_expression", "compound_assignment_expr"],
    return_fields: &["return_type"],
    parameters_field: "parameters",
    call_query: "(call_expression function: (_) @callee)",
};

/// Analyzer for Rust sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustAnalyzer {
    limits: AnalysisLimits,
}

impl RustAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for RustAnalyzer {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    fn map_visibility(&self, node: Node<'_>, _name: &str, source: &str) -> Visibility {
        let mut cursor = node.walk();
        let modifier = node
            .children(&mut cursor)
            .find(|child| child.kind() == "visibility_modifier");

        match modifier.map(|m| node_text(m, source).trim()) {
            Some("pub") => Visibility::Public,
            Some(_) => Visibility::Protected,
            None if in_trait(node) => Visibility::Public,
            None => Visibility::Private,
        }
    }
}

/// Trait items are as visible as the trait itself.
fn in_trait(node: Node<'_>) -> bool {
    node.parent()
        .filter(|list| list.kind() == "declaration_list")
        .and_then(|list| list.parent())
        .is_some_and(|owner| owner.kind() == "trait_item")
}
