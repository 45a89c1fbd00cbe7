//! TypeScript and TSX analyzer.
//!
//! Both dialects share one node vocabulary; the TSX grammar only adds JSX
//! expressions, which carry no declarations of their own.

use tree_sitter::Node;

use crate::lang::common::{
    modifier_keywords, AnalysisLimits, DeclarationClass, LanguageAnalyzer, Parameter, Visibility,
};
use crate::lang::javascript::{
    hash_private_visibility, script_body, script_declaration_class, script_declaration_name,
    script_parameters,
};
use crate::lang::language::Language;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "function_signature",
        "method_signature",
        "abstract_method_signature",
    ],
    methods: &[],
    classes: &["class_declaration", "abstract_class_declaration"],
    types: &["interface_declaration", "type_alias_declaration", "enum_declaration"],
    variables: &["variable_declarator", "public_field_definition"],
    method_scopes: &[],
    namespaces: &["internal_module"],
    wrappers: &[
        "export_statement",
        "lexical_declaration",
        "variable_declaration",
        "ambient_declaration",
    ],
    branches: &["if_statement", "ternary_expression"],
    loops: &["for_statement", "for_in_statement", "while_statement", "do_statement"],
    open_loops: &["for_statement"],
    dispatch: &["switch_statement"],
    exhaustive_dispatch: &[],
    arms: &["switch_case", "switch_default"],
    default_arms: &["switch_default"],
    arm_labels: &[],
    handlers: &["catch_clause"],
    guards: &[],
    guarded_patterns: &[],
    logical: &["binary_expression"],
    logical_operators: &["&&", "||", "??"],
    comments: &["comment"],
    attributes: &["decorator"],
    imports: &["import_statement"],
    identifiers: &[
        "identifier",
        "property_identifier",
        "private_property_identifier",
        "type_identifier",
    ],
    assignments: &["assignment_expression", "augmented_assignment_expression"],
    return_fields: &["return_type"],
    parameters_field: "parameters",
    call_query: r#"
        (call_expression function: (_) @callee)
        (new_expression constructor: (_) @callee)
    "#,
};

/// Analyzer for TypeScript and TSX sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptAnalyzer {
    limits: AnalysisLimits,
    tsx: bool,
}

impl TypeScriptAnalyzer {
    pub fn new(limits: AnalysisLimits, tsx: bool) -> Self {
        Self { limits, tsx }
    }
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn language(&self) -> Language {
        if self.tsx {
            Language::Tsx
        } else {
            Language::TypeScript
        }
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    fn vocabulary(&self) -> &'static Vocabulary {
        &VOCABULARY
    }

    fn declaration_class(&self, node: Node<'_>, _source: &str) -> Option<DeclarationClass> {
        script_declaration_class(&VOCABULARY, node)
    }

    fn declaration_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        script_declaration_name(node, source)
    }

    fn extract_parameters(&self, node: Node<'_>, source: &str) -> Vec<Parameter> {
        script_parameters(&VOCABULARY, node, source)
    }

    fn map_visibility(&self, node: Node<'_>, name: &str, source: &str) -> Visibility {
        modifier_keywords(node, &["accessibility_modifier"], source)
            .iter()
            .find_map(|keyword| Visibility::from_keyword(keyword))
            .unwrap_or_else(|| hash_private_visibility(name))
    }

    fn body<'t>(&self, node: Node<'t>) -> Node<'t> {
        script_body(node)
    }
}
