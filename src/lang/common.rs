//! Shared signature model and the per-language analyzer capability set.
//!
//! [`LanguageAnalyzer`] carries default implementations of every capability
//! driven by the language's [`Vocabulary`]; per-language analyzers override
//! the hooks where their grammar or visibility rules differ.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::core::cfg::{CfgBuilder, ComplexityScore, ControlFlowGraph};
use crate::core::config::AnalysisConfig;
use crate::core::errors::{ErrorKind, Result, TrellisError};
use crate::graph::pdg::NodeId;
use crate::lang::language::Language;
use crate::lang::registry::{node_text, SyntaxTree};
use crate::lang::vocabulary::{self, Vocabulary};

/// Kind of an extracted declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    Function,
    Method,
    Class,
    Type,
    Variable,
}

impl SignatureKind {
    pub fn is_callable(self) -> bool {
        matches!(self, SignatureKind::Function | SignatureKind::Method)
    }

    pub fn is_container(self) -> bool {
        matches!(self, SignatureKind::Class | SignatureKind::Type)
    }
}

/// Shared three-state visibility.
///
/// Finer-grained modifiers collapse onto this model: crate, package and
/// assembly scoped visibility all map to `Protected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Map a modifier keyword onto the shared model. A qualified
    /// `private[pkg]` is package-scoped and collapses like Java's package
    /// access; `private[this]` stays private.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim();
        if let Some(qualifier) = keyword.strip_prefix("private") {
            match qualifier.trim() {
                "[this]" => Some(Visibility::Private),
                q if q.starts_with('[') => Some(Visibility::Protected),
                _ => Some(Visibility::Private),
            }
        } else if keyword.starts_with("protected") || keyword == "internal" {
            Some(Visibility::Protected)
        } else if keyword == "public" {
            Some(Visibility::Public)
        } else {
            None
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

/// Location of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub file: String,
    /// 1-based first line
    pub start_line: usize,
    /// 1-based last line
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Span {
    pub fn of(file: &str, node: Node<'_>) -> Self {
        Self {
            file: file.to_string(),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    pub fn contains(&self, start_byte: usize, end_byte: usize) -> bool {
        self.start_byte <= start_byte && end_byte <= self.end_byte
    }
}

/// A declaration extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub id: NodeId,
    pub language: Language,
    pub kind: SignatureKind,
    pub name: String,
    /// Enclosing scope names, outermost first
    pub scope: Vec<String>,
    /// Nearest enclosing signature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<NodeId>,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub span: Span,
}

/// Per-signature or per-file failure recorded during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionError {
    pub kind: ErrorKind,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl ExtractionError {
    pub fn from_error(
        err: &TrellisError,
        file: &str,
        signature: Option<&str>,
        line: Option<usize>,
    ) -> Self {
        Self {
            kind: err.kind(),
            file: file.to_string(),
            signature: signature.map(str::to_string),
            line,
            message: err.to_string(),
        }
    }

    pub fn partial_parse(file: &str, signature: Option<&str>, line: usize, message: &str) -> Self {
        Self {
            kind: ErrorKind::PartialParseFailure,
            file: file.to_string(),
            signature: signature.map(str::to_string),
            line: Some(line),
            message: message.to_string(),
        }
    }
}

/// Signatures discovered in one tree, in source order.
#[derive(Debug, Clone, Default)]
pub struct SignatureScan {
    pub signatures: Vec<Signature>,
    pub errors: Vec<ExtractionError>,
}

/// Traversal limits applied by analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisLimits {
    pub max_tree_depth: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_tree_depth: AnalysisConfig::default().max_tree_depth,
        }
    }
}

impl From<&AnalysisConfig> for AnalysisLimits {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            max_tree_depth: config.max_tree_depth,
        }
    }
}

/// Coarse classification of a declaration node before scoping is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationClass {
    /// Function, or method when declared inside a class or type
    Callable,
    Method,
    Class,
    Type,
    Variable,
}

impl DeclarationClass {
    fn signature_kind(self, in_type_scope: bool) -> SignatureKind {
        match self {
            DeclarationClass::Callable if in_type_scope => SignatureKind::Method,
            DeclarationClass::Callable => SignatureKind::Function,
            DeclarationClass::Method => SignatureKind::Method,
            DeclarationClass::Class => SignatureKind::Class,
            DeclarationClass::Type => SignatureKind::Type,
            DeclarationClass::Variable => SignatureKind::Variable,
        }
    }
}

/// Capability set implemented once per language.
pub trait LanguageAnalyzer: Send + Sync {
    /// Language handled by this analyzer.
    fn language(&self) -> Language;

    /// Traversal limits.
    fn limits(&self) -> AnalysisLimits;

    fn vocabulary(&self) -> &'static Vocabulary {
        vocabulary::for_language(self.language())
    }

    /// Every top-level and nested declaration with its span.
    fn extract_signatures(&self, tree: &SyntaxTree) -> SignatureScan {
        scan_declarations(self, tree)
    }

    /// Control flow graph of the signature's body.
    fn compute_cfg(&self, tree: &SyntaxTree, signature: &Signature) -> Result<ControlFlowGraph> {
        let source = tree.source();
        let node = locate_declaration(self, tree, &signature.span).ok_or_else(|| {
            TrellisError::partial_parse(
                tree.path(),
                Some(signature.name.clone()),
                Some(signature.span.start_line),
                "declaration not found in syntax tree",
            )
        })?;

        CfgBuilder::new(
            self.vocabulary(),
            source,
            self.limits().max_tree_depth,
            |candidate: Node<'_>| self.is_nested_declaration(candidate, source),
        )
        .build(self.body(node))
    }

    /// Complexity derived from [`LanguageAnalyzer::compute_cfg`].
    fn extract_complexity(&self, tree: &SyntaxTree, signature: &Signature) -> Result<ComplexityScore> {
        Ok(self.compute_cfg(tree, signature)?.complexity())
    }

    /// Documentation attached to a declaration.
    fn extract_docstring(&self, node: Node<'_>, source: &str) -> Option<String> {
        preceding_comments(self.vocabulary(), node, source)
    }

    /// Ordered parameter list of a callable declaration.
    fn extract_parameters(&self, node: Node<'_>, source: &str) -> Vec<Parameter> {
        match self.parameter_list(node, source) {
            Some(list) => parameters_from_list(self.vocabulary(), list, source),
            None => Vec::new(),
        }
    }

    /// Visibility of a declaration in the shared three-state model.
    fn map_visibility(&self, _node: Node<'_>, _name: &str, _source: &str) -> Visibility {
        Visibility::Public
    }

    /// Classify `node` as a declaration, if it is one.
    fn declaration_class(&self, node: Node<'_>, _source: &str) -> Option<DeclarationClass> {
        let vocabulary = self.vocabulary();
        let kind = node.kind();
        if vocabulary.methods.contains(&kind) {
            Some(DeclarationClass::Method)
        } else if vocabulary.functions.contains(&kind) {
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

    /// Declared name; `None` for anonymous declarations.
    fn declaration_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        ["name", "declarator", "left", "pattern"]
            .iter()
            .find_map(|field| node.child_by_field_name(field))
            .and_then(|name| leaf_name(name, source))
    }

    /// Extra scope qualifying a declaration (Go receivers, out-of-line C++
    /// member definitions). A qualified callable is a method.
    fn declaration_scope(&self, _node: Node<'_>, _source: &str) -> Option<String> {
        None
    }

    /// Name pushed by a namespace or `impl`-like container.
    fn scope_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        ["type", "name"]
            .iter()
            .find_map(|field| node.child_by_field_name(field))
            .and_then(|name| leaf_name(name, source))
    }

    /// Declared return type of a callable.
    fn return_type(&self, node: Node<'_>, source: &str) -> Option<String> {
        self.vocabulary()
            .return_fields
            .iter()
            .find_map(|field| node.child_by_field_name(field))
            .map(|ty| clean_type(node_text(ty, source)))
            .filter(|ty| !ty.is_empty())
    }

    /// Parameter list node of a callable.
    fn parameter_list<'t>(&self, node: Node<'t>, _source: &str) -> Option<Node<'t>> {
        node.child_by_field_name(self.vocabulary().parameters_field)
    }

    /// Subtree walked for control flow.
    fn body<'t>(&self, node: Node<'t>) -> Node<'t> {
        node.child_by_field_name("body").unwrap_or(node)
    }

    /// Declarations analyzed on their own; never walked as part of a body.
    fn is_nested_declaration(&self, node: Node<'_>, source: &str) -> bool {
        matches!(
            self.declaration_class(node, source),
            Some(class) if class != DeclarationClass::Variable
        )
    }

    /// Names bound by an import declaration.
    fn import_names(&self, node: Node<'_>, source: &str) -> Vec<String> {
        imported_names(self.vocabulary(), node, source)
    }
}

struct ScopeEntry {
    name: Option<String>,
    parent: Option<usize>,
    container: Option<NodeId>,
    in_callable: bool,
    in_type: bool,
}

fn scope_path(scopes: &[ScopeEntry], mut index: Option<usize>) -> Vec<String> {
    let mut path = Vec::new();
    while let Some(i) = index {
        if let Some(name) = &scopes[i].name {
            path.push(name.clone());
        }
        index = scopes[i].parent;
    }
    path.reverse();
    path
}

/// Assigns ordinal suffixes to repeated (scope, name) pairs in source order.
#[derive(Default)]
struct IdAllocator {
    seen: HashMap<NodeId, usize>,
}

impl IdAllocator {
    fn allocate(&mut self, file: &str, scope: &[String], name: &str) -> NodeId {
        let base = NodeId::symbol(file, scope, name);
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            base.with_ordinal(*count)
        }
    }
}

/// Default signature discovery: an explicit worklist over the whole tree.
pub fn scan_declarations<A>(analyzer: &A, tree: &SyntaxTree) -> SignatureScan
where
    A: LanguageAnalyzer + ?Sized,
{
    let vocabulary = analyzer.vocabulary();
    let source = tree.source();
    let file = tree.path();
    let max_depth = analyzer.limits().max_tree_depth;

    let mut scan = SignatureScan::default();
    let mut scopes: Vec<ScopeEntry> = Vec::new();
    let mut ids = IdAllocator::default();
    let mut depth_reported = false;
    let mut stack: Vec<(Node<'_>, Option<usize>, usize)> = vec![(tree.root(), None, 0)];

    while let Some((node, scope, depth)) = stack.pop() {
        if depth > max_depth {
            if !depth_reported {
                let err = TrellisError::TreeDepthExceeded {
                    depth,
                    limit: max_depth,
                };
                scan.errors.push(ExtractionError::from_error(
                    &err,
                    file,
                    None,
                    Some(node.start_position().row + 1),
                ));
                depth_reported = true;
            }
            continue;
        }

        let (in_callable, in_type, container) = match scope.map(|i| &scopes[i]) {
            Some(entry) => (entry.in_callable, entry.in_type, entry.container.clone()),
            None => (false, false, None),
        };
        let mut child_scope = scope;

        if let Some(class) = analyzer.declaration_class(node, source) {
            let local_binding = class == DeclarationClass::Variable && in_callable;
            let name = if local_binding {
                None
            } else {
                analyzer.declaration_name(node, source)
            };

            if let Some(name) = name {
                let qualifier = analyzer.declaration_scope(node, source);
                let kind = class.signature_kind(in_type || qualifier.is_some());
                let mut path = scope_path(&scopes, scope);
                path.extend(qualifier);
                let id = ids.allocate(file, &path, &name);
                let line = node.start_position().row + 1;

                if node.has_error() && !kind.is_container() {
                    scan.errors.push(ExtractionError::partial_parse(
                        file,
                        Some(&name),
                        line,
                        "declaration contains syntax errors",
                    ));
                } else {
                    let (parameters, return_type) = if kind.is_callable() {
                        (
                            analyzer.extract_parameters(node, source),
                            analyzer.return_type(node, source),
                        )
                    } else {
                        (Vec::new(), None)
                    };
                    scan.signatures.push(Signature {
                        id: id.clone(),
                        language: tree.language(),
                        kind,
                        visibility: analyzer.map_visibility(node, &name, source),
                        doc: analyzer.extract_docstring(node, source),
                        name: name.clone(),
                        scope: path,
                        container,
                        parameters,
                        return_type,
                        span: Span::of(file, node),
                    });
                }

                if kind == SignatureKind::Variable {
                    continue;
                }
                scopes.push(ScopeEntry {
                    name: Some(name),
                    parent: scope,
                    container: Some(id),
                    in_callable: kind.is_callable(),
                    in_type: kind.is_container(),
                });
                child_scope = Some(scopes.len() - 1);
            }
        } else if vocabulary.method_scopes.contains(&node.kind())
            || vocabulary.namespaces.contains(&node.kind())
        {
            scopes.push(ScopeEntry {
                name: analyzer.scope_name(node, source),
                parent: scope,
                container,
                in_callable,
                in_type: vocabulary.method_scopes.contains(&node.kind()),
            });
            child_scope = Some(scopes.len() - 1);
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push((child, child_scope, depth + 1));
        }
    }

    scan
}

/// Find the declaration node a signature was extracted from.
pub fn locate_declaration<'t, A>(analyzer: &A, tree: &'t SyntaxTree, span: &Span) -> Option<Node<'t>>
where
    A: LanguageAnalyzer + ?Sized,
{
    let mut node = tree
        .root()
        .descendant_for_byte_range(span.start_byte, span.end_byte)?;
    loop {
        if node.start_byte() == span.start_byte
            && node.end_byte() == span.end_byte
            && analyzer.declaration_class(node, tree.source()).is_some()
        {
            return Some(node);
        }
        node = node.parent()?;
    }
}

/// Name text of a declarator-like node, following `declarator`/`name`
/// fields down to a leaf.
pub fn leaf_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node;
    for _ in 0..16 {
        if current.named_child_count() == 0 {
            let text = node_text(current, source).trim();
            return (!text.is_empty()).then(|| text.to_string());
        }
        current = ["declarator", "name", "pattern"]
            .iter()
            .find_map(|field| current.child_by_field_name(field))
            .or_else(|| current.named_child(0))?;
    }
    None
}

/// First descendant whose kind is an identifier in `vocabulary`.
pub fn first_identifier(vocabulary: &Vocabulary, node: Node<'_>, source: &str) -> Option<String> {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if vocabulary.is_identifier(current.kind()) {
            return Some(node_text(current, source).to_string());
        }
        let mut cursor = current.walk();
        let children: Vec<Node<'_>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Strip annotation punctuation from a type's source text.
pub fn clean_type(text: &str) -> String {
    text.trim()
        .trim_start_matches("->")
        .trim_start_matches(':')
        .trim()
        .to_string()
}

const RECEIVER_KINDS: &[&str] = &["self_parameter", "this"];
const RECEIVER_NAMES: &[&str] = &["self", "cls", "this", "&self", "&mut self"];

/// Parameters declared by the named children of `list`.
pub fn parameters_from_list(vocabulary: &Vocabulary, list: Node<'_>, source: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut cursor = list.walk();
    let entries: Vec<Node<'_>> = list.named_children(&mut cursor).collect();

    for entry in entries {
        if vocabulary.is_comment(entry.kind()) || RECEIVER_KINDS.contains(&entry.kind()) {
            continue;
        }
        let type_name = entry
            .child_by_field_name("type")
            .map(|ty| clean_type(node_text(ty, source)))
            .filter(|ty| !ty.is_empty());

        let mut name_cursor = entry.walk();
        let mut names: Vec<String> = entry
            .children_by_field_name("name", &mut name_cursor)
            .filter_map(|name| leaf_name(name, source))
            .collect();
        if names.is_empty() {
            let name = ["pattern", "declarator"]
                .iter()
                .find_map(|field| entry.child_by_field_name(field))
                .and_then(|name| leaf_name(name, source))
                .or_else(|| {
                    if vocabulary.is_identifier(entry.kind()) {
                        Some(node_text(entry, source).to_string())
                    } else {
                        first_identifier(vocabulary, entry, source)
                    }
                });
            names.extend(name);
        }

        for name in names {
            let name = name.trim_start_matches('$').to_string();
            if RECEIVER_NAMES.contains(&name.as_str()) {
                continue;
            }
            parameters.push(Parameter {
                name,
                type_name: type_name.clone(),
            });
        }
    }
    parameters
}

/// Node used as the anchor for preceding comments: the outermost wrapper
/// (decorator, export, declaration list) around `node`.
pub fn doc_anchor<'t>(vocabulary: &Vocabulary, node: Node<'t>) -> Node<'t> {
    let mut anchor = node;
    while let Some(parent) = anchor.parent() {
        if vocabulary.wrappers.contains(&parent.kind()) {
            anchor = parent;
        } else {
            break;
        }
    }
    anchor
}

/// Nearest run of comment siblings directly above a declaration.
pub fn preceding_comments(vocabulary: &Vocabulary, node: Node<'_>, source: &str) -> Option<String> {
    let anchor = doc_anchor(vocabulary, node);
    let mut expected_row = anchor.start_position().row;
    let mut blocks = Vec::new();
    let mut sibling = anchor.prev_sibling();

    while let Some(current) = sibling {
        let kind = current.kind();
        if vocabulary.attributes.contains(&kind) {
            expected_row = current.start_position().row;
        } else if vocabulary.is_comment(kind) {
            if current.end_position().row + 1 < expected_row {
                break;
            }
            blocks.push(clean_comment(node_text(current, source)));
            expected_row = current.start_position().row;
        } else {
            break;
        }
        sibling = current.prev_sibling();
    }

    blocks.reverse();
    let doc = blocks
        .into_iter()
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!doc.is_empty()).then_some(doc)
}

/// Remove comment markers from every line of a comment.
pub fn clean_comment(text: &str) -> String {
    const OPENERS: &[&str] = &["/**", "/*!", "/*", "///", "//!", "//", "#", "--"];

    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let mut line = line.trim();
            if let Some(opener) = OPENERS.iter().find(|opener| line.starts_with(**opener)) {
                line = &line[opener.len()..];
            }
            line = line.trim_end().trim_end_matches("*/");
            line = line.trim_start();
            if let Some(rest) = line.strip_prefix('*') {
                line = rest;
            }
            line.trim().to_string()
        })
        .collect();

    let first = lines.iter().position(|line| !line.is_empty());
    let last = lines.iter().rposition(|line| !line.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Fields naming where an import comes from or what it is renamed to.
const IMPORT_ORIGIN_FIELDS: &[&str] = &["scope", "qualifier", "module_name", "source", "alias", "prefix"];

/// Identifier leaves of an import declaration, skipping module paths and
/// aliases. Dotted names contribute their last segment only.
pub fn imported_names(vocabulary: &Vocabulary, node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        if current.kind() == "dotted_name" {
            let last = current.named_child(current.named_child_count().saturating_sub(1));
            names.extend(last.map(|leaf| node_text(leaf, source).to_string()));
            continue;
        }
        if vocabulary.is_identifier(current.kind()) {
            names.push(node_text(current, source).trim_start_matches('$').to_string());
            continue;
        }

        // `path` is the origin when the node also names what it imports
        let has_target = current.child_by_field_name("name").is_some()
            || current.child_by_field_name("list").is_some();
        let mut excluded: Vec<usize> = Vec::new();
        for field in IMPORT_ORIGIN_FIELDS {
            excluded.extend(current.child_by_field_name(field).map(|n| n.id()));
        }
        if has_target {
            excluded.extend(current.child_by_field_name("path").map(|n| n.id()));
        }

        let mut cursor = current.walk();
        let children: Vec<Node<'_>> = current
            .named_children(&mut cursor)
            .filter(|child| !excluded.contains(&child.id()))
            .collect();
        stack.extend(children.into_iter().rev());
    }

    names.retain(|name| !name.is_empty());
    names
}

/// Modifier keywords of a declaration: the text of children whose kind is in
/// `kinds`, split on whitespace.
pub fn modifier_keywords(node: Node<'_>, kinds: &[&str], source: &str) -> Vec<String> {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| kinds.contains(&child.kind()))
        .flat_map(|child| {
            node_text(child, source)
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
