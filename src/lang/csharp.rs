//! C# analyzer.

use tree_sitter::Node;

use crate::lang::common::{doc_anchor, modifier_keywords, AnalysisLimits, LanguageAnalyzer, Visibility};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &[
        "method_declaration",
        "constructor_declaration",
        "local_function_statement",
    ],
    methods: &[],
    classes: &["class_declaration", "record_declaration", "struct_declaration"],
    types: &["interface_declaration", "enum_declaration"],
    variables: &["variable_declarator", "property_declaration"],
    method_scopes: &[],
    namespaces: &["namespace_declaration", "file_scoped_namespace_declaration"],
    wrappers: &["field_declaration", "variable_declaration"],
    branches: &["if_statement", "conditional_expression"],
    loops: &[
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
    ],
    open_loops: &["for_statement"],
    dispatch: &["switch_statement", "switch_expression"],
    exhaustive_dispatch: &["switch_expression"],
    arms: &["switch_section", "switch_expression_arm"],
    default_arms: &[],
    arm_labels: &[],
    handlers: &["catch_clause"],
    guards: &["when_clause"],
    guarded_patterns: &[],
    logical: &["binary_expression"],
    logical_operators: &["&&", "||", "??"],
    comments: &["comment"],
    attributes: &["attribute_list"],
    imports: &["using_directive"],
    identifiers: &["identifier"],
    assignments: &["assignment_expression"],
    return_fields: &["returns", "type"],
    parameters_field: "parameters",
    call_query: r#"
        (invocation_expression function: (_) @callee)
        (object_creation_expression type: (_) @callee)
    "#,
};

/// Analyzer for C# sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpAnalyzer {
    limits: AnalysisLimits,
}

impl CSharpAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for CSharpAnalyzer {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    /// Namespaces keep their dotted name as one scope segment.
    fn scope_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        node.child_by_field_name("name")
            .map(|name| node_text(name, source).to_string())
    }

    fn map_visibility(&self, node: Node<'_>, _name: &str, source: &str) -> Visibility {
        let declaration = doc_anchor(&VOCABULARY, node);
        let explicit = modifier_keywords(declaration, &["modifier"], source)
            .iter()
            .find_map(|keyword| Visibility::from_keyword(keyword));
        if let Some(visibility) = explicit {
            return visibility;
        }

        let owner = declaration
            .parent()
            .filter(|body| body.kind() == "declaration_list")
            .and_then(|body| body.parent());
        match owner.map(|owner| owner.kind()) {
            Some("interface_declaration") => Visibility::Public,
            Some(kind) if VOCABULARY.classes.contains(&kind) => Visibility::Private,
            // top-level types default to internal
            _ => Visibility::Protected,
        }
    }
}
