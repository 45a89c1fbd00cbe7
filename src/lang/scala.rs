//! Scala analyzer.

use tree_sitter::Node;

use crate::lang::common::{AnalysisLimits, LanguageAnalyzer, Visibility};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["function_definition", "function_declaration"],
    methods: &[],
    classes: &["class_definition", "object_definition"],
    types: &["trait_definition", "enum_definition", "type_definition"],
    variables: &["val_definition", "var_definition"],
    method_scopes: &[],
    namespaces: &["package_clause"],
    wrappers: &[],
    branches: &["if_expression"],
    loops: &["while_expression", "for_expression", "do_while_expression"],
    open_loops: &[],
    dispatch: &["match_expression"],
    exhaustive_dispatch: &["match_expression"],
    arms: &["case_clause"],
    default_arms: &[],
    arm_labels: &[],
    handlers: &["catch_clause"],
    guards: &["guard"],
    guarded_patterns: &[],
    logical: &["infix_expression"],
    logical_operators: &["&&", "||"],
    comments: &["comment", "block_comment"],
    attributes: &["annotation"],
    imports: &["import_declaration"],
    identifiers: &["identifier"],
    assignments: &["assignment_expression"],
    return_fields: &["return_type"],
    parameters_field: "parameters",
    call_query: "(call_expression function: (_) @callee)",
};

/// Analyzer for Scala sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalaAnalyzer {
    limits: AnalysisLimits,
}

impl ScalaAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for ScalaAnalyzer {
    fn language(&self) -> Language {
        Language::Scala
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    fn map_visibility(&self, node: Node<'_>, _name: &str, source: &str) -> Visibility {
        let mut cursor = node.walk();
        let modifiers: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| child.kind() == "modifiers")
            .collect();
        modifiers
            .into_iter()
            .flat_map(|m| access_modifiers(m, source))
            .find_map(|keyword| Visibility::from_keyword(&keyword))
            .unwrap_or(Visibility::Public)
    }

    fn scope_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        node.child_by_field_name("name")
            .map(|name| node_text(name, source).to_string())
    }

    /// `import a.b.{C, D => E}` binds `C` and `D`; wildcards bind nothing.
    fn import_names(&self, node: Node<'_>, source: &str) -> Vec<String> {
        let text = node_text(node, source);
        let text = text.trim().trim_start_matches("import").trim();
        selector_names(text)
    }
}

/// `private[net]` as one keyword, so the qualifier survives.
fn access_modifiers(modifiers: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = modifiers.walk();
    let keywords = modifiers
        .children(&mut cursor)
        .filter(|child| child.kind() == "access_modifier")
        .map(|access| node_text(access, source).split_whitespace().collect::<String>())
        .collect();
    keywords
}

fn selector_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut clauses = Vec::new();
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                clauses.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(&text[start..]);

    for clause in clauses {
        let clause = clause.trim();
        match (clause.find('{'), clause.rfind('}')) {
            (Some(open), Some(close)) if open < close => {
                for selector in clause[open + 1..close].split(',') {
                    let original = selector.split("=>").next().unwrap_or_default().trim();
                    names.extend(binding(original));
                }
            }
            _ => names.extend(binding(clause.rsplit('.').next().unwrap_or_default())),
        }
    }
    names
}

fn binding(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty() && name != "_" && name != "*" && name != "given").then(|| name.to_string())
}
