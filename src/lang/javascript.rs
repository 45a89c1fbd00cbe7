//! JavaScript analyzer, shared in part with TypeScript.

use tree_sitter::Node;

use crate::lang::common::{
    leaf_name, parameters_from_list, AnalysisLimits, DeclarationClass, LanguageAnalyzer, Parameter,
    Visibility,
};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    methods: &[],
    classes: &["class_declaration"],
    types: &[],
    variables: &["variable_declarator", "field_definition"],
    method_scopes: &[],
    namespaces: &[],
    wrappers: &["export_statement", "lexical_declaration", "variable_declaration"],
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
    identifiers: &["identifier", "property_identifier", "private_property_identifier"],
    assignments: &["assignment_expression", "augmented_assignment_expression"],
    return_fields: &[],
    parameters_field: "parameters",
    call_query: r#"
        (call_expression function: (_) @callee)
        (new_expression constructor: (_) @callee)
    "#,
};

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// Analyzer for JavaScript sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptAnalyzer {
    limits: AnalysisLimits,
}

impl JavaScriptAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for JavaScriptAnalyzer {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
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

    fn map_visibility(&self, _node: Node<'_>, name: &str, _source: &str) -> Visibility {
        hash_private_visibility(name)
    }

    fn body<'t>(&self, node: Node<'t>) -> Node<'t> {
        script_body(node)
    }
}

/// Function value bound by a declarator, if any.
pub(crate) fn bound_function(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() != "variable_declarator" {
        return None;
    }
    node.child_by_field_name("value")
        .filter(|value| FUNCTION_VALUES.contains(&value.kind()))
}

/// Declarators bound to function values are callables; other declarators
/// with a plain identifier name are variables.
pub(crate) fn script_declaration_class(
    vocabulary: &Vocabulary,
    node: Node<'_>,
) -> Option<DeclarationClass> {
    let kind = node.kind();
    if kind == "variable_declarator" {
        let named = node
            .child_by_field_name("name")
            .is_some_and(|name| name.kind() == "identifier");
        return match (named, bound_function(node)) {
            (false, _) => None,
            (true, Some(_)) => Some(DeclarationClass::Callable),
            (true, None) => Some(DeclarationClass::Variable),
        };
    }

    if vocabulary.functions.contains(&kind) {
        Some(DeclarationClass::Callable)
    } else if vocabulary.classes.contains(&kind) {
        Some(DeclarationClass::Class)
    } else if vocabulary.types.contains(&kind) {
        Some(DeclarationClass::Type)
    } else if vocabulary.variables.contains(&kind) {
        Some(DeclarationClass::Variable)
    } else {
        None
    }
}

pub(crate) fn script_declaration_name(node: Node<'_>, source: &str) -> Option<String> {
    ["name", "property"]
        .iter()
        .find_map(|field| node.child_by_field_name(field))
        .and_then(|name| leaf_name(name, source))
}

/// Parameters of a declaration or of the function bound by a declarator.
pub(crate) fn script_parameters(vocabulary: &Vocabulary, node: Node<'_>, source: &str) -> Vec<Parameter> {
    let callable = bound_function(node).unwrap_or(node);
    if let Some(list) = callable.child_by_field_name("parameters") {
        return parameters_from_list(vocabulary, list, source);
    }
    // `x => x + 1`
    callable
        .child_by_field_name("parameter")
        .map(|param| {
            vec![Parameter {
                name: node_text(param, source).to_string(),
                type_name: None,
            }]
        })
        .unwrap_or_default()
}

pub(crate) fn script_body(node: Node<'_>) -> Node<'_> {
    let callable = bound_function(node).unwrap_or(node);
    callable.child_by_field_name("body").unwrap_or(callable)
}

/// `#name` members are private.
pub(crate) fn hash_private_visibility(name: &str) -> Visibility {
    if name.starts_with('#') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}
