//! C++ analyzer.

use tree_sitter::Node;

use crate::lang::c::{c_declaration_class, c_declaration_name, function_declarator, storage_visibility};
use crate::lang::common::{AnalysisLimits, DeclarationClass, LanguageAnalyzer, Visibility};
use crate::lang::language::Language;
use crate::lang::registry::node_text;
use crate::lang::vocabulary::Vocabulary;

pub static VOCABULARY: Vocabulary = Vocabulary {
    functions: &["function_definition"],
    methods: &[],
    classes: &["class_specifier", "struct_specifier"],
    types: &["union_specifier", "enum_specifier", "type_definition", "alias_declaration"],
    variables: &["declaration"],
    method_scopes: &[],
    namespaces: &["namespace_definition"],
    wrappers: &["template_declaration"],
    branches: &["if_statement", "conditional_expression"],
    loops: &["for_statement", "for_range_loop", "while_statement", "do_statement"],
    open_loops: &["for_statement"],
    dispatch: &["switch_statement"],
    exhaustive_dispatch: &[],
    arms: &["case_statement"],
    default_arms: &[],
    arm_labels: &[],
    handlers: &["catch_clause"],
    guards: &[],
    guarded_patterns: &[],
    logical: &["binary_expression"],
    logical_operators: &["&&", "||", "and", "or"],
    comments: &["comment"],
    attributes: &[],
    imports: &["using_declaration"],
    identifiers: &["identifier"],
    assignments: &["assignment_expression"],
    return_fields: &["type"],
    parameters_field: "parameters",
    call_query: r#"
        (call_expression function: (_) @callee)
        (new_expression type: (_) @callee)
    "#,
};

/// Analyzer for C++ sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppAnalyzer {
    limits: AnalysisLimits,
}

impl CppAnalyzer {
    pub fn new(limits: AnalysisLimits) -> Self {
        Self { limits }
    }
}

impl LanguageAnalyzer for CppAnalyzer {
    fn language(&self) -> Language {
        Language::Cpp
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

    /// `void Foo::bar() {}` is a method of `Foo`.
    fn declaration_scope(&self, node: Node<'_>, source: &str) -> Option<String> {
        let name = function_declarator(node)?.child_by_field_name("declarator")?;
        if name.kind() != "qualified_identifier" {
            return None;
        }
        name.child_by_field_name("scope")
            .map(|scope| node_text(scope, source).to_string())
    }

    fn parameter_list<'t>(&self, node: Node<'t>, _source: &str) -> Option<Node<'t>> {
        function_declarator(node)?.child_by_field_name("parameters")
    }

    fn map_visibility(&self, node: Node<'_>, _name: &str, source: &str) -> Visibility {
        member_visibility(node, source).unwrap_or_else(|| storage_visibility(node, source))
    }
}

/// Visibility of a class member: the nearest preceding access specifier,
/// else the default of the enclosing class key.
fn member_visibility(node: Node<'_>, source: &str) -> Option<Visibility> {
    let mut member = node;
    while let Some(parent) = member.parent() {
        if VOCABULARY.wrappers.contains(&parent.kind()) {
            member = parent;
        } else {
            break;
        }
    }

    let list = member.parent().filter(|p| p.kind() == "field_declaration_list")?;
    let mut sibling = member.prev_sibling();
    while let Some(current) = sibling {
        if current.kind() == "access_specifier" {
            return Visibility::from_keyword(node_text(current, source));
        }
        sibling = current.prev_sibling();
    }

    match list.parent().map(|owner| owner.kind()) {
        Some("class_specifier") => Some(Visibility::Private),
        _ => Some(Visibility::Public),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::common::SignatureKind;
    use crate::lang::test_support::{complexity_of, scan};

    const SOURCE: &str = r#"
namespace net {

class Server {
public:
    Server(int port) : port_(port) {}
    int serve(int retries);

private:
    template <typename T>
    T decode(const T& raw) { return raw; }

    int port_;
};

struct Point {
    int x;
    double norm() const { return x; }
};

int Server::serve(int retries) {
    for (int attempt : attempts(retries)) {
        try {
            accept(attempt);
        } catch (const Error& e) {
            return -1;
        }
    }
    return 0;
}

}
"#;

    #[test]
    fn test_classes_and_out_of_line_methods() {
        let (_, scan) = scan(Language::Cpp, SOURCE);
        let found: Vec<(&str, SignatureKind)> = scan
            .signatures
            .iter()
            .map(|s| (s.id.as_str(), s.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("test.cpp::net::Server", SignatureKind::Class),
                ("test.cpp::net::Server::Server", SignatureKind::Method),
                ("test.cpp::net::Server::decode", SignatureKind::Method),
                ("test.cpp::net::Point", SignatureKind::Class),
                ("test.cpp::net::Point::norm", SignatureKind::Method),
                ("test.cpp::net::Server::serve", SignatureKind::Method),
            ]
        );
    }

    #[test]
    fn test_access_specifiers() {
        let (_, scan) = scan(Language::Cpp, SOURCE);
        let visibility = |name: &str| {
            scan.signatures
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.visibility)
                .unwrap()
        };
        assert_eq!(visibility("Server"), Visibility::Public);
        assert_eq!(visibility("decode"), Visibility::Private);
        assert_eq!(visibility("norm"), Visibility::Public);
        assert_eq!(visibility("serve"), Visibility::Public);
    }

    #[test]
    fn test_range_loop_and_catch() {
        assert_eq!(complexity_of(Language::Cpp, SOURCE, "serve"), 3);
    }

    #[test]
    fn test_out_of_line_parameters() {
        let (_, scan) = scan(Language::Cpp, SOURCE);
        let serve = scan.signatures.iter().find(|s| s.name == "serve").unwrap();
        assert_eq!(serve.parameters.len(), 1);
        assert_eq!(serve.parameters[0].name, "retries");
        assert_eq!(serve.return_type.as_deref(), Some("int"));
    }
}
