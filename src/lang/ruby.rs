//! Ruby analyzer.

use tree_sitter::Node;

use crate::lang::common::{AnalysisLimits, DeclarationClass, LanguageAnalyzer, Visibility};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["method", "singleton_method"],
    methods: &[],
    classes: &["class", "module"],
    types: &[],
    variables: &["assignment"],
    method_scopes: &[],
    namespaces: &[],
    wrappers: &[],
    branches: &["if", "elsif", "unless", "conditional"],
    loops: &["while", "until", "for"],
    open_loops: &[],
    dispatch: &["case", "case_match"],
    exhaustive_dispatch: &[],
    arms: &["when", "else", "in_clause"],
    default_arms: &["else"],
    arm_labels: &[],
    handlers: &["rescue", "rescue_modifier"],
    guards: &[
        "if_modifier",
        "unless_modifier",
        "while_modifier",
        "until_modifier",
        "if_guard",
        "unless_guard",
    ],
    guarded_patterns: &[],
    logical: &["binary"],
    logical_operators: &["&&", "||", "and", "or"],
    comments: &["comment"],
    attributes: &[],
    imports: &[],
    identifiers: &["identifier", "constant"],
    assignments: &["assignment", "operator_assignment"],
    return_fields: &[],
    parameters_field: "parameters",
    call_query: "(call method: (_) @callee)",
};

const VISIBILITY_CALLS: &[&str] = &["private", "protected", "public"];

/// Analyzer for Ruby sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubyAnalyzer {
    limits: AnalysisLimits,
}

impl RubyAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for RubyAnalyzer {
    fn language(&self) -> Language {
        Language::Ruby
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    /// Only constant assignments declare bindings.
    fn declaration_class(&self, node: Node<'_>, _source: &str) -> Option<DeclarationClass> {
        match node.kind() {
            "method" | "singleton_method" => Some(DeclarationClass::Callable),
            "class" | "module" => Some(DeclarationClass::Class),
            "assignment" => node
                .child_by_field_name("left")
                .filter(|left| left.kind() == "constant")
                .map(|_| DeclarationClass::Variable),
            _ => None,
        }
    }

    /// `private`/`protected` sections and `private def ...` prefixes.
    fn map_visibility(&self, node: Node<'_>, name: &str, source: &str) -> Visibility {
        if name.starts_with('_') {
            return Visibility::Private;
        }

        let inline = node
            .parent()
            .filter(|args| args.kind() == "argument_list")
            .and_then(|args| args.parent())
            .filter(|call| call.kind() == "call")
            .and_then(|call| call.child_by_field_name("method"))
            .and_then(|method| Visibility::from_keyword(node_text(method, source)));
        if let Some(visibility) = inline {
            return visibility;
        }

        let mut sibling = node.prev_named_sibling();
        while let Some(current) = sibling {
            let text = node_text(current, source);
            if current.kind() == "identifier" && VISIBILITY_CALLS.contains(&text) {
                return Visibility::from_keyword(text).unwrap_or(Visibility::Public);
            }
            sibling = current.prev_named_sibling();
        }
        Visibility::Public
    }
}
