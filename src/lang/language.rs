//! The closed set of supported source languages and their metadata.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TrellisError};

/// Stability indicator used for documentation and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageStability {
    Stable,
    Beta,
}

/// Metadata describing one supported language.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LanguageInfo {
    /// Canonical short key (matches CLI/config usage, e.g. "py").
    pub key: &'static str,
    /// Human-friendly display name.
    pub name: &'static str,
    /// Supported file extensions (without leading dots).
    pub extensions: &'static [&'static str],
    /// Stability status.
    pub status: LanguageStability,
    /// Feature notes for documentation/UI.
    pub notes: &'static str,
}

/// A supported source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    C,
    Cpp,
    Java,
    CSharp,
    Ruby,
    Php,
    Scala,
}

impl Language {
    /// Every supported language, in canonical order.
    pub const ALL: [Language; 13] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
        Language::Rust,
        Language::Go,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::CSharp,
        Language::Ruby,
        Language::Php,
        Language::Scala,
    ];

    /// Static metadata for this language.
    pub fn info(self) -> &'static LanguageInfo {
        match self {
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::TypeScript => &TYPESCRIPT,
            Language::Tsx => &TSX,
            Language::Rust => &RUST,
            Language::Go => &GO,
            Language::C => &C,
            Language::Cpp => &CPP,
            Language::Java => &JAVA,
            Language::CSharp => &CSHARP,
            Language::Ruby => &RUBY,
            Language::Php => &PHP,
            Language::Scala => &SCALA,
        }
    }

    /// Canonical short key.
    pub fn key(self) -> &'static str {
        self.info().key
    }

    /// Human-friendly display name.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Parse a free-form language identifier.
    pub fn parse(identifier: &str) -> Result<Self> {
        normalize_language_key(identifier)
            .ok_or_else(|| TrellisError::unsupported_language(identifier))
    }

    /// Map a file path to a language by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|language| {
            language
                .info()
                .extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(&ext))
        })
    }

    /// The tree-sitter grammar backing this language.
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
            Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
            Language::Scala => tree_sitter_scala::LANGUAGE.into(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Language {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Normalizes a language identifier to its variant.
fn normalize_language_key(language: &str) -> Option<Language> {
    let lowered = language.trim().trim_start_matches('.').to_ascii_lowercase();
    let language = match lowered.as_str() {
        "py" | "pyi" | "pyw" | "python" | "python3" => Language::Python,
        "js" | "jsx" | "mjs" | "cjs" | "javascript" | "node" => Language::JavaScript,
        "ts" | "cts" | "mts" | "typescript" => Language::TypeScript,
        "tsx" => Language::Tsx,
        "rs" | "rust" => Language::Rust,
        "go" | "golang" => Language::Go,
        "c" => Language::C,
        "cpp" | "cxx" | "cc" | "c++" | "hpp" | "hxx" | "hh" | "cplusplus" => Language::Cpp,
        "java" => Language::Java,
        "cs" | "c#" | "csharp" | "c-sharp" => Language::CSharp,
        "rb" | "ruby" => Language::Ruby,
        "php" => Language::Php,
        "scala" | "sc" => Language::Scala,
        _ => return None,
    };
    Some(language)
}

const PYTHON: LanguageInfo = LanguageInfo {
    key: "py",
    name: "Python",
    extensions: &["py", "pyi"],
    status: LanguageStability::Stable,
    notes: "Docstrings, decorators, match statements",
};

const JAVASCRIPT: LanguageInfo = LanguageInfo {
    key: "js",
    name: "JavaScript",
    extensions: &["js", "jsx", "mjs", "cjs"],
    status: LanguageStability::Stable,
    notes: "Functions, classes, arrow bindings",
};

const TYPESCRIPT: LanguageInfo = LanguageInfo {
    key: "ts",
    name: "TypeScript",
    extensions: &["ts", "cts", "mts"],
    status: LanguageStability::Stable,
    notes: "Interfaces, enums, accessibility modifiers",
};

const TSX: LanguageInfo = LanguageInfo {
    key: "tsx",
    name: "TSX",
    extensions: &["tsx"],
    status: LanguageStability::Stable,
    notes: "TypeScript with JSX",
};

const RUST: LanguageInfo = LanguageInfo {
    key: "rs",
    name: "Rust",
    extensions: &["rs"],
    status: LanguageStability::Stable,
    notes: "Impl blocks, traits, scoped visibility",
};

const GO: LanguageInfo = LanguageInfo {
    key: "go",
    name: "Go",
    extensions: &["go"],
    status: LanguageStability::Stable,
    notes: "Receivers, switches, exported names",
};

const C: LanguageInfo = LanguageInfo {
    key: "c",
    name: "C",
    extensions: &["c", "h"],
    status: LanguageStability::Beta,
    notes: "Functions, structs, static linkage",
};

const CPP: LanguageInfo = LanguageInfo {
    key: "cpp",
    name: "C++",
    extensions: &["cpp", "cxx", "cc", "c++", "hpp", "hxx", "hh", "h++"],
    status: LanguageStability::Beta,
    notes: "Classes, namespaces, templates",
};

const JAVA: LanguageInfo = LanguageInfo {
    key: "java",
    name: "Java",
    extensions: &["java"],
    status: LanguageStability::Stable,
    notes: "Classes, records, package visibility",
};

const CSHARP: LanguageInfo = LanguageInfo {
    key: "cs",
    name: "C#",
    extensions: &["cs"],
    status: LanguageStability::Beta,
    notes: "Namespaces, internal visibility",
};

const RUBY: LanguageInfo = LanguageInfo {
    key: "rb",
    name: "Ruby",
    extensions: &["rb", "rake"],
    status: LanguageStability::Beta,
    notes: "Modules, rescue clauses, modifiers",
};

const PHP: LanguageInfo = LanguageInfo {
    key: "php",
    name: "PHP",
    extensions: &["php"],
    status: LanguageStability::Beta,
    notes: "Classes, traits, match expressions",
};

const SCALA: LanguageInfo = LanguageInfo {
    key: "scala",
    name: "Scala",
    extensions: &["scala", "sc"],
    status: LanguageStability::Beta,
    notes: "Objects, traits, pattern matching",
};
