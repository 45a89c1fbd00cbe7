//! Language-specific parsing and analysis modules.

pub mod analyzer;
pub mod common;
pub mod language;
pub mod registry;
pub mod vocabulary;

// Tree-sitter analyzers
pub mod c;
pub mod cpp;
pub mod csharp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod php;
pub mod python;
pub mod ruby;
pub mod rust_lang;
pub mod scala;
pub mod typescript;

// Re-export common types and traits for easier access
pub use analyzer::Analyzer;
pub use common::{
    AnalysisLimits, ExtractionError, LanguageAnalyzer, Parameter, Signature, SignatureKind,
    SignatureScan, Span, Visibility,
};
pub use language::{Language, LanguageInfo};
pub use registry::{Grammar, GrammarRegistry, SyntaxTree};
