//! Python analyzer.

use tree_sitter::Node;

use crate::lang::common::{
    preceding_comments, AnalysisLimits, DeclarationClass, LanguageAnalyzer, Visibility,
};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["function_definition"],
    methods: &[],
    classes: &["class_definition"],
    types: &[],
    variables: &["assignment"],
    method_scopes: &[],
    namespaces: &[],
    wrappers: &["decorated_definition", "expression_statement"],
    branches: &["if_statement", "elif_clause", "conditional_expression"],
    loops: &["for_statement", "while_statement"],
    open_loops: &[],
    dispatch: &["match_statement"],
    exhaustive_dispatch: &[],
    arms: &["case_clause"],
    default_arms: &[],
    arm_labels: &["case_pattern"],
    handlers: &["except_clause", "except_group_clause"],
    guards: &["if_clause"],
    guarded_patterns: &[],
    logical: &["boolean_operator"],
    logical_operators: &["and", "or"],
    comments: &["comment"],
    attributes: &[],
    imports: &["import_statement", "import_from_statement"],
    identifiers: &["identifier"],
    assignments: &["assignment", "augmented_assignment"],
    return_fields: &["return_type"],
    parameters_field: "parameters",
    call_query: "(call function: (_) @callee)",
};

/// Analyzer for Python sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonAnalyzer {
    limits: AnalysisLimits,
}

impl PythonAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }

    /// Leading string literal of a function or class body.
    fn body_docstring(node: Node<'_>, source: &str) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let literal = first.named_child(0)?;
        if literal.kind() != "string" {
            return None;
        }
        let doc = strip_string_literal(node_text(literal, source));
        (!doc.is_empty()).then_some(doc)
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    fn declaration_class(&self, node: Node<'_>, _source: &str) -> Option<DeclarationClass> {
        match node.kind() {
            "function_definition" => Some(DeclarationClass::Callable),
            "class_definition" => Some(DeclarationClass::Class),
            "assignment" => node
                .child_by_field_name("left")
                .filter(|left| left.kind() == "identifier")
                .map(|_| DeclarationClass::Variable),
            _ => None,
        }
    }

    fn extract_docstring(&self, node: Node<'_>, source: &str) -> Option<String> {
        Self::body_docstring(node, source).or_else(|| preceding_comments(&VOCABULARY, node, source))
    }

    fn map_visibility(&self, _node: Node<'_>, name: &str, _source: &str) -> Visibility {
        underscore_visibility(name)
    }
}

/// Leading underscore marks a private name; dunder names stay public.
pub fn underscore_visibility(name: &str) -> Visibility {
    let dunder = name.len() > 4 && name.starts_with("__") && name.ends_with("__");
    if name.starts_with('_') && !dunder {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// Remove prefixes and quotes from a string literal and trim each line.
fn strip_string_literal(text: &str) -> String {
    let text = text.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|quote| {
            text.strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        })
        .unwrap_or(text);

    let lines: Vec<&str> = inner.lines().map(str::trim).collect();
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
#[path = "python_tests.rs"]
mod tests;
