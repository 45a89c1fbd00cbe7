//! Closed set of language analyzers behind one capability interface.
//!
//! Callers hold an [`Analyzer`] and never name a per-language type. Adding a
//! language means adding one variant here plus its analyzer module.

use tree_sitter::Node;

use crate::core::cfg::{ComplexityScore, ControlFlowGraph};
use crate::core::errors::Result;
use crate::lang::c::CAnalyzer;
use crate::lang::common::{
    AnalysisLimits, DeclarationClass, LanguageAnalyzer, Parameter, Signature, SignatureScan,
    Visibility,
};
use crate::lang::cpp::CppAnalyzer;
use crate::lang::csharp::CSharpAnalyzer;
use crate::lang::go::GoAnalyzer;
use crate::lang::java::JavaAnalyzer;
use crate::lang::javascript::JavaScriptAnalyzer;
use crate::lang::language::Language;
use crate::lang::php::PhpAnalyzer;
use crate::lang::python::PythonAnalyzer;
use crate::lang::registry::SyntaxTree;
use crate::lang::ruby::RubyAnalyzer;
use crate::lang::rust_lang::RustAnalyzer;
use crate::lang::scala::ScalaAnalyzer;
use crate::lang::typescript::TypeScriptAnalyzer;
use crate::lang::vocabulary::Vocabulary;

/// Analyzer for one language.
#[derive(Debug, Clone, Copy)]
pub enum Analyzer {
    Python(PythonAnalyzer),
    JavaScript(JavaScriptAnalyzer),
    TypeScript(TypeScriptAnalyzer),
    Tsx(TypeScriptAnalyzer),
    Rust(RustAnalyzer),
    Go(GoAnalyzer),
    C(CAnalyzer),
    Cpp(CppAnalyzer),
    Java(JavaAnalyzer),
    CSharp(CSharpAnalyzer),
    Ruby(RubyAnalyzer),
    Php(PhpAnalyzer),
    Scala(ScalaAnalyzer),
}

macro_rules! dispatch {
    ($self:ident, $analyzer:ident => $call:expr) => {
        match $self {
            Analyzer::Python($analyzer) => $call,
            Analyzer::JavaScript($analyzer) => $call,
            Analyzer::TypeScript($analyzer) => $call,
            Analyzer::Tsx($analyzer) => $call,
            Analyzer::Rust($analyzer) => $call,
            Analyzer::Go($analyzer) => $call,
            Analyzer::C($analyzer) => $call,
            Analyzer::Cpp($analyzer) => $call,
            Analyzer::Java($analyzer) => $call,
            Analyzer::CSharp($analyzer) => $call,
            Analyzer::Ruby($analyzer) => $call,
            Analyzer::Php($analyzer) => $call,
            Analyzer::Scala($analyzer) => $call,
        }
    };
}

impl Analyzer {
    /// The analyzer for `language`.
    pub fn for_language(language: Language, limits: AnalysisLimits) -> Self {
        match language {
            Language::Python => Analyzer::Python(PythonAnalyzer::new(limits)),
            Language::JavaScript => Analyzer::JavaScript(JavaScriptAnalyzer::new(limits)),
            Language::TypeScript => Analyzer::TypeScript(TypeScriptAnalyzer::new(limits, false)),
            Language::Tsx => Analyzer::Tsx(TypeScriptAnalyzer::new(limits, true)),
            Language::Rust => Analyzer::Rust(RustAnalyzer::new(limits)),
            Language::Go => Analyzer::Go(GoAnalyzer::new(limits)),
            Language::C => Analyzer::C(CAnalyzer::new(limits)),
            Language::Cpp => Analyzer::Cpp(CppAnalyzer::new(limits)),
            Language::Java => Analyzer::Java(JavaAnalyzer::new(limits)),
            Language::CSharp => Analyzer::CSharp(CSharpAnalyzer::new(limits)),
            Language::Ruby => Analyzer::Ruby(RubyAnalyzer::new(limits)),
            Language::Php => Analyzer::Php(PhpAnalyzer::new(limits)),
            Language::Scala => Analyzer::Scala(ScalaAnalyzer::new(limits)),
        }
    }
}

impl LanguageAnalyzer for Analyzer {
    fn language(&self) -> Language {
        dispatch!(self, a => a.language())
    }

    fn limits(&self) -> AnalysisLimits {
        dispatch!(self, a => a.limits())
    }

    fn vocabulary(&self) -> &'static Vocabulary {
        dispatch!(self, a => a.vocabulary())
    }

    fn extract_signatures(&self, tree: &SyntaxTree) -> SignatureScan {
        dispatch!(self, a => a.extract_signatures(tree))
    }

    fn compute_cfg(&self, tree: &SyntaxTree, signature: &Signature) -> Result<ControlFlowGraph> {
        dispatch!(self, a => a.compute_cfg(tree, signature))
    }

    fn extract_complexity(&self, tree: &SyntaxTree, signature: &Signature) -> Result<ComplexityScore> {
        dispatch!(self, a => a.extract_complexity(tree, signature))
    }

    fn extract_docstring(&self, node: Node<'_>, source: &str) -> Option<String> {
        dispatch!(self, a => a.extract_docstring(node, source))
    }

    fn extract_parameters(&self, node: Node<'_>, source: &str) -> Vec<Parameter> {
        dispatch!(self, a => a.extract_parameters(node, source))
    }

    fn map_visibility(&self, node: Node<'_>, name: &str, source: &str) -> Visibility {
        dispatch!(self, a => a.map_visibility(node, name, source))
    }

    fn declaration_class(&self, node: Node<'_>, source: &str) -> Option<DeclarationClass> {
        dispatch!(self, a => a.declaration_class(node, source))
    }

    fn declaration_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        dispatch!(self, a => a.declaration_name(node, source))
    }

    fn declaration_scope(&self, node: Node<'_>, source: &str) -> Option<String> {
        dispatch!(self, a => a.declaration_scope(node, source))
    }

    fn scope_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        dispatch!(self, a => a.scope_name(node, source))
    }

    fn return_type(&self, node: Node<'_>, source: &str) -> Option<String> {
        dispatch!(self, a => a.return_type(node, source))
    }

    fn parameter_list<'t>(&self, node: Node<'t>, source: &str) -> Option<Node<'t>> {
        dispatch!(self, a => a.parameter_list(node, source))
    }

    fn body<'t>(&self, node: Node<'t>) -> Node<'t> {
        dispatch!(self, a => a.body(node))
    }

    fn is_nested_declaration(&self, node: Node<'_>, source: &str) -> bool {
        dispatch!(self, a => a.is_nested_declaration(node, source))
    }

    fn import_names(&self, node: Node<'_>, source: &str) -> Vec<String> {
        dispatch!(self, a => a.import_names(node, source))
    }
}
