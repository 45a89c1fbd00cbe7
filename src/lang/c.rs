//! C analyzer, with declarator helpers shared by C++.

use tree_sitter::Node;

use crate::lang::common::{
    modifier_keywords, AnalysisLimits, DeclarationClass, LanguageAnalyzer, Visibility,
};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["function_definition"],
    methods: &[],
    classes: &[],
    types: &[
        "struct_specifier",
        "union_specifier",
        "enum_specifier",
        "type_definition",
    ],
    variables: &["declaration"],
    method_scopes: &[],
    namespaces: &[],
    wrappers: &[],
    branches: &["if_statement", "conditional_expression"],
    loops: &["for_statement", "while_statement", "do_statement"],
    open_loops: &["for_statement"],
    dispatch: &["switch_statement"],
    exhaustive_dispatch: &[],
    arms: &["case_statement"],
    default_arms: &[],
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
    assignments: &["assignment_expression"],
    return_fields: &["type"],
    parameters_field: "parameters",
    call_query: "(call_expression function: (_) @callee)",
};

/// Tag specifiers that only name a type when they carry a body.
const TAG_SPECIFIERS: &[&str] = &[
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
    "class_specifier",
];

/// Analyzer for C sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CAnalyzer {
    limits: AnalysisLimits,
}

impl CAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for CAnalyzer {
    fn language(&self) -> Language {
        Language::C
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    fn declaration_class(&self, node: Node<'_>, _source: &str) -> Option<DeclarationClass> {
        c_declaration_class(&VOCABULARY, node)
    }

    fn declaration_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        c_declaration_name(node, source)
    }

    fn parameter_list<'t>(&self, node: Node<'t>, _source: &str) -> Option<Node<'t>> {
        function_declarator(node)?.child_by_field_name("parameters")
    }

    fn map_visibility(&self, node: Node<'_>, _name: &str, source: &str) -> Visibility {
        storage_visibility(node, source)
    }
}

/// Classification shared by C and C++.
pub(crate) fn c_declaration_class(vocabulary: &Vocabulary, node: Node<'_>) -> Option<DeclarationClass> {
    let kind = node.kind();
    if vocabulary.functions.contains(&kind) {
        return Some(DeclarationClass::Callable);
    }
    if TAG_SPECIFIERS.contains(&kind) && node.child_by_field_name("body").is_none() {
        return None;
    }
    if vocabulary.classes.contains(&kind) {
        Some(DeclarationClass::Class)
    } else if vocabulary.types.contains(&kind) {
        Some(DeclarationClass::Type)
    } else if kind == "declaration" {
        // prototypes are not bindings
        match function_declarator(node) {
            Some(_) => None,
            None => Some(DeclarationClass::Variable),
        }
    } else {
        None
    }
}

pub(crate) fn c_declaration_name(node: Node<'_>, source: &str) -> Option<String> {
    if let Some(function) = function_declarator(node) {
        let declarator = function.child_by_field_name("declarator")?;
        return declared_name(declarator, source);
    }
    match node.kind() {
        "type_definition" | "declaration" => {
            declared_name(node.child_by_field_name("declarator")?, source)
        }
        _ => node
            .child_by_field_name("name")
            .map(|name| node_text(name, source).to_string()),
    }
}

/// Follow nested declarators down to the function declarator.
pub(crate) fn function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.child_by_field_name("declarator")?;
    for _ in 0..16 {
        if current.kind() == "function_declarator" {
            return Some(current);
        }
        current = current.child_by_field_name("declarator")?;
    }
    None
}

/// Name introduced by a declarator: identifiers, destructor and operator
/// names are taken whole, qualified names contribute their last segment.
pub(crate) fn declared_name(declarator: Node<'_>, source: &str) -> Option<String> {
    let mut current = declarator;
    for _ in 0..16 {
        match current.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" => return Some(node_text(current, source).to_string()),
            "qualified_identifier" => current = current.child_by_field_name("name")?,
            _ => current = current.child_by_field_name("declarator")?,
        }
    }
    None
}

/// `static` file-scope declarations are private to the translation unit.
pub(crate) fn storage_visibility(node: Node<'_>, source: &str) -> Visibility {
    let is_static = modifier_keywords(node, &["storage_class_specifier"], source)
        .iter()
        .any(|keyword| keyword == "static");
    if is_static {
        Visibility::Private
    } else {
        Visibility::Public
    }
}
