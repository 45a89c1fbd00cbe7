//! Go analyzer.

use tree_sitter::Node;

use crate::lang::common::{AnalysisLimits, LanguageAnalyzer, Visibility};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["function_declaration"],
    methods: &["method_declaration"],
    classes: &[],
    types: &["type_spec", "type_alias"],
    variables: &["const_spec", "var_spec"],
    method_scopes: &[],
    namespaces: &[],
    wrappers: &["type_declaration", "const_declaration", "var_declaration"],
    branches: &["if_statement"],
    loops: &["for_statement"],
    open_loops: &["for_statement"],
    dispatch: &[
        "expression_switch_statement",
        "type_switch_statement",
        "select_statement",
    ],
    exhaustive_dispatch: &["select_statement"],
    arms: &["expression_case", "default_case", "type_case", "communication_case"],
    default_arms: &["default_case"],
    arm_labels: &[],
    handlers: &[],
    guards: &[],
    guarded_patterns: &[],
    logical: &["binary_expression"],
    logical_operators: &["&&", "||"],
    comments: &["comment"],
    attributes: &[],
    imports: &[],
    identifiers: &["identifier"],
    assignments: &["assignment_statement"],
    return_fields: &["result"],
    parameters_field: "parameters",
    call_query: "(call_expression function: (_) @callee)",
};

/// Analyzer for Go sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoAnalyzer {
    limits: AnalysisLimits,
}

impl GoAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for GoAnalyzer {
    fn language(&self) -> Language {
        Language::Go
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    /// Methods are qualified by their receiver's base type.
    fn declaration_scope(&self, node: Node<'_>, source: &str) -> Option<String> {
        if node.kind() != "method_declaration" {
            return None;
        }
        let receiver = node.child_by_field_name("receiver")?;
        let declaration = receiver.named_child(0)?;
        let ty = declaration.child_by_field_name("type")?;
        receiver_type_name(node_text(ty, source))
    }

    fn map_visibility(&self, _node: Node<'_>, name: &str, _source: &str) -> Visibility {
        exported_visibility(name)
    }
}

/// `*Server[T]` -> `Server`
fn receiver_type_name(text: &str) -> Option<String> {
    let name = text
        .trim()
        .trim_start_matches('*')
        .split('[')
        .next()
        .unwrap_or_default()
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Exported identifiers start with an upper-case letter.
pub fn exported_visibility(name: &str) -> Visibility {
    if name.chars().next().is_some_and(char::is_uppercase) {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

#[cfg(test)]
#[path = "go_tests.rs"]
mod tests;
