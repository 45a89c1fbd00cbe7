//! Per-file extraction: one source file in, one immutable [`FileAnalysis`] out.
//!
//! Extraction holds no shared mutable state. The registry hands out shared
//! grammars and every call owns its parser and syntax tree, so any number of
//! files can be extracted in parallel.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use streaming_iterator::StreamingIterator;
use tracing::{debug, warn};
use tree_sitter::{Node, QueryCursor};

use crate::core::cfg::{CfgSummary, ComplexityScore};
use crate::core::config::AnalysisConfig;
use crate::core::errors::{Result, TrellisError};
use crate::graph::resolution::CallIdentifier;
use crate::lang::analyzer::Analyzer;
use crate::lang::common::{
    locate_declaration, AnalysisLimits, ExtractionError, LanguageAnalyzer, Signature,
};
use crate::lang::language::Language;
use crate::lang::registry::{node_text, GrammarRegistry, SyntaxTree};
use crate::lang::vocabulary::Vocabulary;

/// A file handed over by the discovery layer.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub language: Language,
    pub text: Arc<str>,
    /// Freshness timestamp
    pub modified: DateTime<Utc>,
}

impl SourceFile {
    pub fn new(
        path: impl Into<String>,
        language: Language,
        text: impl Into<Arc<str>>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            language,
            text: text.into(),
            modified,
        }
    }

    /// BLAKE3 digest of the text, hex encoded.
    pub fn content_hash(&self) -> String {
        content_hash(&self.text)
    }
}

/// BLAKE3 digest of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Names referenced from a body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct References {
    /// Normalized callee identifiers (`a::b::name`)
    pub calls: BTreeSet<String>,
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.reads.is_empty() && self.writes.is_empty()
    }
}

/// A signature together with everything derived from its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzedSignature {
    pub signature: Arc<Signature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg: Option<CfgSummary>,
    pub references: References,
}

/// Immutable result of extracting one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAnalysis {
    pub path: String,
    pub language: Language,
    pub content_hash: String,
    pub modified: DateTime<Utc>,
    /// Signatures in source order
    pub signatures: Vec<AnalyzedSignature>,
    /// References made outside every signature (script-level code)
    pub module_references: References,
    /// Names bound by import declarations
    pub imports: BTreeSet<String>,
    pub errors: Vec<ExtractionError>,
}

impl FileAnalysis {
    fn empty(file: &SourceFile, content_hash: String) -> Self {
        Self {
            path: file.path.clone(),
            language: file.language,
            content_hash,
            modified: file.modified,
            signatures: Vec::new(),
            module_references: References::default(),
            imports: BTreeSet::new(),
            errors: Vec::new(),
        }
    }

    /// Whether anything was dropped during extraction.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Drives files through the registry and their language analyzer.
#[derive(Debug, Clone, Copy)]
pub struct FileExtractor<'a> {
    registry: &'a GrammarRegistry,
    config: &'a AnalysisConfig,
}

impl<'a> FileExtractor<'a> {
    pub fn new(registry: &'a GrammarRegistry, config: &'a AnalysisConfig) -> Self {
        Self { registry, config }
    }

    /// Extract one file.
    ///
    /// Per-file and per-signature failures are recorded on the returned
    /// analysis. Only fatal conditions (a poisoned registry) are returned as
    /// errors.
    pub fn extract(&self, file: &SourceFile) -> Result<FileAnalysis> {
        let started = Instant::now();
        let mut analysis = FileAnalysis::empty(file, file.content_hash());

        if file.text.len() > self.config.max_file_bytes {
            let err = TrellisError::FileTooLarge {
                file: file.path.clone(),
                size: file.text.len(),
                limit: self.config.max_file_bytes,
            };
            warn!("Skipping {}: {}", file.path, err);
            analysis
                .errors
                .push(ExtractionError::from_error(&err, &file.path, None, None));
            return Ok(analysis);
        }

        let tree = match self
            .registry
            .parse(file.language, file.path.clone(), Arc::clone(&file.text))
        {
            Ok(tree) => tree,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("Failed to parse {}: {}", file.path, err);
                analysis
                    .errors
                    .push(ExtractionError::from_error(&err, &file.path, None, None));
                return Ok(analysis);
            }
        };

        let analyzer = Analyzer::for_language(file.language, AnalysisLimits::from(self.config));
        let scan = analyzer.extract_signatures(&tree);
        analysis.errors.extend(scan.errors);

        for signature in scan.signatures {
            let analyzed = if signature.kind.is_callable() {
                match analyzer.compute_cfg(&tree, &signature) {
                    Ok(cfg) => AnalyzedSignature {
                        complexity: Some(cfg.complexity()),
                        cfg: Some(cfg.summary()),
                        references: References::default(),
                        signature: Arc::new(signature),
                    },
                    Err(err) => {
                        debug!("Dropping {}: {}", signature.id, err);
                        analysis.errors.push(ExtractionError::from_error(
                            &err,
                            &file.path,
                            Some(&signature.name),
                            Some(signature.span.start_line),
                        ));
                        continue;
                    }
                }
            } else {
                AnalyzedSignature {
                    signature: Arc::new(signature),
                    complexity: None,
                    cfg: None,
                    references: References::default(),
                }
            };
            analysis.signatures.push(analyzed);
        }

        let grammar = self.registry.get_grammar(file.language)?;
        attribute_calls(&mut analysis, &tree, grammar.call_query());
        for analyzed in &mut analysis.signatures {
            if !analyzed.signature.kind.is_callable() {
                continue;
            }
            if let Some(node) = locate_declaration(&analyzer, &tree, &analyzed.signature.span) {
                body_accesses(&analyzer, node, tree.source(), &mut analyzed.references);
            }
        }
        analysis.imports = collect_imports(&analyzer, &tree);

        if tree.has_errors() && analysis.errors.is_empty() {
            let line = first_error_line(tree.root()).unwrap_or(1);
            analysis.errors.push(ExtractionError::partial_parse(
                &file.path,
                None,
                line,
                "file contains syntax errors",
            ));
        }

        debug!(
            "Extracted {} signatures from {} in {:?} ({} errors)",
            analysis.signatures.len(),
            file.path,
            started.elapsed(),
            analysis.errors.len()
        );
        Ok(analysis)
    }
}

/// Attribute every call-site capture to the innermost enclosing signature.
fn attribute_calls(analysis: &mut FileAnalysis, tree: &SyntaxTree, query: &tree_sitter::Query) {
    let source = tree.source();
    let spans: Vec<(usize, usize)> = analysis
        .signatures
        .iter()
        .map(|s| (s.signature.span.start_byte, s.signature.span.end_byte))
        .collect();

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root(), source.as_bytes());
    while let Some(m) = matches.next() {
        for capture in m.captures {
            let node = capture.node;
            let Some(callee) = CallIdentifier::parse(node_text(node, source)) else {
                continue;
            };
            let (start, end) = (node.start_byte(), node.end_byte());
            let owner = spans
                .iter()
                .enumerate()
                .filter(|(_, (s, e))| *s <= start && end <= *e)
                .min_by_key(|(_, (s, e))| e - s)
                .map(|(index, _)| index);

            let references = match owner {
                Some(index) => &mut analysis.signatures[index].references,
                None => &mut analysis.module_references,
            };
            references.calls.insert(callee.qualified());
        }
    }
}

/// Fields holding the accessed member of a member-access expression.
const MEMBER_FIELDS: &[&str] = &["attribute", "property", "field"];
/// Fields holding the receiver of a member-access expression.
const RECEIVER_FIELDS: &[&str] = &["object", "receiver", "expression", "operand", "value", "argument"];

/// Identifier reads and writes in a callable's body, excluding parameters and
/// nested declarations.
fn body_accesses<A>(analyzer: &A, declaration: Node<'_>, source: &str, references: &mut References)
where
    A: LanguageAnalyzer + ?Sized,
{
    let vocabulary = analyzer.vocabulary();
    let parameters: BTreeSet<String> = analyzer
        .extract_parameters(declaration, source)
        .into_iter()
        .map(|p| p.name)
        .collect();
    let max_depth = analyzer.limits().max_tree_depth;

    let root = analyzer.body(declaration);
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth {
            continue;
        }
        if node.id() != root.id() && analyzer.is_nested_declaration(node, source) {
            continue;
        }
        if vocabulary.is_identifier(node.kind()) {
            let name = identifier_text(node, source);
            if !name.is_empty() && !parameters.contains(name) {
                references.reads.insert(name.to_string());
            }
            continue;
        }

        let written = vocabulary
            .assignments
            .contains(&node.kind())
            .then(|| node.child_by_field_name("left"))
            .flatten();
        if let Some(left) = written {
            for name in written_names(vocabulary, left, source) {
                if !parameters.contains(&name) {
                    references.writes.insert(name);
                }
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|child| Some(child.id()) != written.map(|left| left.id()))
            .collect();
        for child in children.into_iter().rev() {
            stack.push((child, depth + 1));
        }
    }
}

/// Names assigned by the left-hand side of an assignment. Member access
/// writes the accessed member, never the receiver.
fn written_names(vocabulary: &Vocabulary, left: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![left];
    while let Some(node) = stack.pop() {
        if vocabulary.is_identifier(node.kind()) {
            let name = identifier_text(node, source);
            if !name.is_empty() {
                names.push(name.to_string());
            }
            continue;
        }
        if let Some(member) = MEMBER_FIELDS
            .iter()
            .find_map(|field| node.child_by_field_name(field))
        {
            stack.push(member);
            continue;
        }
        if RECEIVER_FIELDS
            .iter()
            .any(|field| node.child_by_field_name(field).is_some())
        {
            stack.extend(
                ["name", "method"]
                    .iter()
                    .find_map(|field| node.child_by_field_name(field)),
            );
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    names
}

fn identifier_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node_text(node, source).trim().trim_start_matches('$')
}

/// Names bound by every import declaration in the file.
fn collect_imports<A>(analyzer: &A, tree: &SyntaxTree) -> BTreeSet<String>
where
    A: LanguageAnalyzer + ?Sized,
{
    let vocabulary = analyzer.vocabulary();
    let mut imports = BTreeSet::new();
    if vocabulary.imports.is_empty() {
        return imports;
    }

    let mut stack = vec![(tree.root(), 0usize)];
    let max_depth = analyzer.limits().max_tree_depth;
    while let Some((node, depth)) = stack.pop() {
        if vocabulary.imports.contains(&node.kind()) {
            imports.extend(analyzer.import_names(node, tree.source()));
            continue;
        }
        if depth >= max_depth {
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor).map(|child| (child, depth + 1)));
    }
    imports
}

fn first_error_line(root: Node<'_>) -> Option<usize> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}
