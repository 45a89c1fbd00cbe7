//! Java analyzer.

use tree_sitter::Node;

use crate::lang::common::{doc_anchor, modifier_keywords, AnalysisLimits, LanguageAnalyzer, Visibility};
use crate::lang::language::Language;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["method_declaration", "constructor_declaration"],
    methods: &[],
    classes: &["class_declaration", "record_declaration"],
    types: &[
        "interface_declaration",
        "enum_declaration",
        "annotation_type_declaration",
    ],
    variables: &["variable_declarator"],
    method_scopes: &[],
    namespaces: &[],
    wrappers: &["field_declaration", "constant_declaration"],
    branches: &["if_statement", "ternary_expression"],
    loops: &[
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
    ],
    open_loops: &["for_statement"],
    dispatch: &["switch_expression", "switch_statement"],
    exhaustive_dispatch: &["switch_expression"],
    arms: &["switch_block_statement_group", "switch_rule"],
    default_arms: &[],
    arm_labels: &["switch_label"],
    handlers: &["catch_clause"],
    guards: &["guard"],
    guarded_patterns: &[],
    logical: &["binary_expression"],
    logical_operators: &["&&", "||"],
    comments: &["line_comment", "block_comment"],
    attributes: &[],
    imports: &["import_declaration"],
    identifiers: &["identifier"],
    assignments: &["assignment_expression"],
    return_fields: &["type"],
    parameters_field: "parameters",
    call_query: r#"
        (method_invocation name: (identifier) @callee)
        (object_creation_expression type: (_) @callee)
    "#,
};

/// Analyzer for Java sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaAnalyzer {
    limits: AnalysisLimits,
}

impl JavaAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for JavaAnalyzer {
    fn language(&self) -> Language {
        Language::Java
    }

    fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    fn map_visibility(&self, node: Node<'_>, _name: &str, source: &str) -> Visibility {
        // field modifiers live on the enclosing field_declaration
        let declaration = doc_anchor(&VOCABULARY, node);
        let explicit = modifier_keywords(declaration, &["modifiers"], source)
            .iter()
            .find_map(|keyword| Visibility::from_keyword(keyword));

        explicit.unwrap_or_else(|| {
            let in_interface = declaration
                .parent()
                .is_some_and(|body| body.kind() == "interface_body");
            if in_interface {
                Visibility::Public
            } else {
                // package-private
                Visibility::Protected
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::common::SignatureKind;
    use crate::lang::test_support::{complexity_of, scan};

    const SOURCE: &str = r#"package net;

import java.util.List;
import java.util.Map;

/** Serves requests. */
public class Server implements Handler {
    private static final int MAX = 3, MIN = 1;
    String name;

    public Server(String name) {
        this.name = name;
    }

    /**
     * Handles one request.
     */
    @Override
    public Response handle(Request req, int... flags) {
        int local = 0;
        switch (req.kind()) {
            case GET -> { return get(req); }
            case POST -> { return post(req); }
            default -> { return error(); }
        }
    }
}

interface Handler {
    Response handle(Request req, int... flags);
}
"#;

    #[test]
    fn test_signatures() {
        let (_, scan) = scan(Language::Java, SOURCE);
        let found: Vec<(&str, SignatureKind)> = scan
            .signatures
            .iter()
            .map(|s| (s.id.as_str(), s.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("test.java::Server", SignatureKind::Class),
                ("test.java::Server::MAX", SignatureKind::Variable),
                ("test.java::Server::MIN", SignatureKind::Variable),
                ("test.java::Server::name", SignatureKind::Variable),
                ("test.java::Server::Server", SignatureKind::Method),
                ("test.java::Server::handle", SignatureKind::Method),
                ("test.java::Handler", SignatureKind::Type),
                ("test.java::Handler::handle", SignatureKind::Method),
            ]
        );
    }

    #[test]
    fn test_modifiers_map_to_visibility() {
        let (_, scan) = scan(Language::Java, SOURCE);
        let by_id = |id: &str| scan.signatures.iter().find(|s| s.id.as_str() == id).unwrap();
        assert_eq!(by_id("test.java::Server::MAX").visibility, Visibility::Private);
        assert_eq!(by_id("test.java::Server::name").visibility, Visibility::Protected);
        assert_eq!(by_id("test.java::Server::handle").visibility, Visibility::Public);
        assert_eq!(by_id("test.java::Handler::handle").visibility, Visibility::Public);
    }

    #[test]
    fn test_javadoc_and_parameters() {
        let (_, scan) = scan(Language::Java, SOURCE);
        let handle = scan
            .signatures
            .iter()
            .find(|s| s.id.as_str() == "test.java::Server::handle")
            .unwrap();
        assert_eq!(handle.doc.as_deref(), Some("Handles one request."));
        assert_eq!(handle.return_type.as_deref(), Some("Response"));
        let params: Vec<&str> = handle.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["req", "flags"]);

        let server = scan.signatures.iter().find(|s| s.name == "Server").unwrap();
        assert_eq!(server.doc.as_deref(), Some("Serves requests."));
    }

    #[test]
    fn test_switch_rules() {
        let (tree, scan) = scan(Language::Java, SOURCE);
        let handle = scan
            .signatures
            .iter()
            .find(|s| s.id.as_str() == "test.java::Server::handle")
            .unwrap();
        let complexity = JavaAnalyzer::default().extract_complexity(&tree, handle).unwrap();
        assert_eq!(complexity.value(), 3);
    }

    #[test]
    fn test_switch_without_default() {
        let source = r#"
class Router {
    void route(int code) {
        switch (code) {
            case 1: get(); break;
            case 2: post(); break;
        }
    }
}
"#;
        assert_eq!(complexity_of(Language::Java, source, "route"), 3);
    }

    #[test]
    fn test_pattern_guard_counts() {
        let source = r#"
class Shapes {
    String describe(Object o) {
        switch (o) {
            case Integer i when i > 0 -> { return "positive"; }
            default -> { return "other"; }
        }
    }
}
"#;
        assert_eq!(complexity_of(Language::Java, source, "describe"), 3);
    }

    #[test]
    fn test_enhanced_for_and_ternary() {
        let source = r#"
class Totals {
    int sum(List<Integer> xs) {
        int total = 0;
        for (int x : xs) {
            total += x > 0 ? x : 0;
        }
        return total;
    }
}
"#;
        assert_eq!(complexity_of(Language::Java, source, "sum"), 3);
    }
}
