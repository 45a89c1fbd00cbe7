//! PHP analyzer.

use tree_sitter::Node;

use crate::lang::common::{
    first_identifier, modifier_keywords, AnalysisLimits, LanguageAnalyzer, Visibility,
};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["function_definition", "method_declaration"],
    methods: &[],
    classes: &["class_declaration"],
    types: &["interface_declaration", "trait_declaration", "enum_declaration"],
    variables: &["const_element", "property_element"],
    method_scopes: &[],
    namespaces: &["namespace_definition"],
    wrappers: &["const_declaration", "property_declaration"],
    branches: &["if_statement", "else_if_clause", "conditional_expression"],
    loops: &["for_statement", "foreach_statement", "while_statement", "do_statement"],
    open_loops: &["for_statement"],
    dispatch: &["switch_statement", "match_expression"],
    exhaustive_dispatch: &["match_expression"],
    arms: &[
        "case_statement",
        "default_statement",
        "match_conditional_expression",
        "match_default_expression",
    ],
    default_arms: &["default_statement", "match_default_expression"],
    arm_labels: &[],
    handlers: &["catch_clause"],
    guards: &[],
    guarded_patterns: &[],
    logical: &["binary_expression"],
    logical_operators: &["&&", "||", "and", "or", "??"],
    comments: &["comment"],
    attributes: &["attribute_list"],
    imports: &["namespace_use_declaration"],
    identifiers: &["name"],
    assignments: &["assignment_expression", "augmented_assignment_expression"],
    return_fields: &["return_type"],
    parameters_field: "parameters",
    call_query: r#"
        (function_call_expression function: (_) @callee)
        (member_call_expression name: (_) @callee)
        (scoped_call_expression name: (_) @callee)
    "#,
};

/// Analyzer for PHP sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpAnalyzer {
    limits: AnalysisLimits,
}

impl PhpAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for PhpAnalyzer {
    fn language(&self) -> Language {
        Language::Php
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    fn declaration_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        match node.kind() {
            "const_element" | "property_element" => first_identifier(&VOCABULARY, node, source),
            _ => node
                .child_by_field_name("name")
                .map(|name| node_text(name, source).to_string()),
        }
    }

    fn scope_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        node.child_by_field_name("name")
            .map(|name| node_text(name, source).to_string())
    }

    fn map_visibility(&self, node: Node<'_>, _name: &str, source: &str) -> Visibility {
        let declaration = node
            .parent()
            .filter(|parent| VOCABULARY.wrappers.contains(&parent.kind()))
            .unwrap_or(node);
        modifier_keywords(declaration, &["visibility_modifier"], source)
            .iter()
            .find_map(|keyword| Visibility::from_keyword(keyword))
            .unwrap_or(Visibility::Public)
    }

    /// `use App\Http\{Request, Response as Res};` binds `Request` and
    /// `Response`.
    fn import_names(&self, node: Node<'_>, source: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() == "namespace_use_clause" {
                let target = current
                    .named_child(0)
                    .map(|target| node_text(target, source))
                    .and_then(|text| text.rsplit('\\').next())
                    .map(str::trim)
                    .filter(|name| !name.is_empty());
                names.extend(target.map(str::to_string));
                continue;
            }
            let mut cursor = current.walk();
            let children: Vec<Node<'_>> = current.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        names
    }
}
