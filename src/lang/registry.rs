//! Grammar registry: lazily compiled, shared per-language parsing resources.
//!
//! The registry is an owned value held by the orchestrator (usually behind an
//! `Arc`). Each language gets one slot; the map lock is held only long enough
//! to clone a slot handle, and compilation runs inside the slot's `OnceCell`
//! so concurrent callers racing on one language wait for a single compile
//! while lookups for other languages proceed.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::{debug, error, warn};
use tree_sitter::{Parser, Query, Tree};

use crate::core::errors::{Result, TrellisError};
use crate::lang::language::Language;
use crate::lang::vocabulary;

/// Compiled, immutable parsing resources for one language.
pub struct Grammar {
    language: Language,
    ts_language: tree_sitter::Language,
    call_query: Query,
}

impl Grammar {
    /// Compile the grammar for `language`.
    ///
    /// Attaches the grammar to a probe parser to validate its ABI and compiles
    /// the call-site query. Any failure is a `GrammarLoad` error.
    pub fn compile(language: Language) -> Result<Self> {
        let ts_language = language.tree_sitter_language();

        let mut probe = Parser::new();
        probe.set_language(&ts_language).map_err(|e| {
            TrellisError::grammar_load(language.key(), format!("incompatible grammar: {e}"))
        })?;

        let source = vocabulary::for_language(language).call_query;
        let call_query = Query::new(&ts_language, source).map_err(|e| {
            TrellisError::grammar_load(language.key(), format!("invalid call query: {e}"))
        })?;

        Ok(Self {
            language,
            ts_language,
            call_query,
        })
    }

    /// Language this grammar parses.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Underlying tree-sitter language handle.
    pub fn ts_language(&self) -> &tree_sitter::Language {
        &self.ts_language
    }

    /// Query capturing callee expressions as `@callee`.
    pub fn call_query(&self) -> &Query {
        &self.call_query
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("language", &self.language)
            .field("call_patterns", &self.call_query.pattern_count())
            .finish()
    }
}

/// Parse result of one file, owned by the extraction call that produced it.
pub struct SyntaxTree {
    language: Language,
    path: String,
    source: Arc<str>,
    tree: Tree,
}

impl SyntaxTree {
    /// Language of the parsed text.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Path of the parsed file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root node of the tree.
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: tree_sitter::Node<'_>) -> &str {
        node_text(node, &self.source)
    }

    /// Whether the tree contains any ERROR or MISSING node.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("language", &self.language)
            .field("path", &self.path)
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// Text of `node` within `source`, empty when the range is not valid UTF-8.
pub fn node_text<'a>(node: tree_sitter::Node<'_>, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Function used to build a grammar on a cache miss.
pub type GrammarCompiler = Arc<dyn Fn(Language) -> Result<Grammar> + Send + Sync>;

type Slot = Arc<OnceCell<Arc<Grammar>>>;

/// Concurrency-safe cache of compiled grammars.
pub struct GrammarRegistry {
    slots: RwLock<HashMap<Language, Slot>>,
    compilations: AtomicUsize,
    compiler: GrammarCompiler,
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("compilations", &self.compilation_count())
            .finish()
    }
}

impl GrammarRegistry {
    /// Create an empty registry that compiles the bundled grammars.
    pub fn new() -> Self {
        Self::with_compiler(Arc::new(Grammar::compile))
    }

    /// Create an empty registry with a custom compiler.
    pub fn with_compiler(compiler: GrammarCompiler) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
            compiler,
        }
    }

    /// Get the grammar for `language`, compiling it on first use.
    pub fn get_grammar(&self, language: Language) -> Result<Arc<Grammar>> {
        let slot = self.slot(language)?;
        let grammar = slot.get_or_try_init(|| self.compile(language))?;
        Ok(Arc::clone(grammar))
    }

    /// Get a grammar by free-form identifier.
    ///
    /// The identifier is resolved before the cache is consulted, so an
    /// unknown identifier never creates a slot.
    pub fn get_grammar_by_name(&self, identifier: &str) -> Result<Arc<Grammar>> {
        let language = Language::parse(identifier)?;
        self.get_grammar(language)
    }

    /// Number of languages with a compiled grammar in the cache.
    pub fn cached_count(&self) -> Result<usize> {
        let slots = self.slots.read().map_err(|_| Self::poisoned())?;
        Ok(slots.values().filter(|slot| slot.get().is_some()).count())
    }

    /// Number of compilation attempts performed so far, successful or not.
    pub fn compilation_count(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    /// Parse `text` with the grammar for `language`.
    ///
    /// A fresh parser is created per call. Malformed input still yields a
    /// tree; error regions appear as ERROR or MISSING nodes.
    pub fn parse(
        &self,
        language: Language,
        path: impl Into<String>,
        text: Arc<str>,
    ) -> Result<SyntaxTree> {
        let grammar = self.get_grammar(language)?;
        let path = path.into();

        let mut parser = Parser::new();
        parser.set_language(grammar.ts_language()).map_err(|e| {
            TrellisError::grammar_load(language.key(), format!("Failed to set parser language: {e}"))
        })?;

        let tree = parser.parse(text.as_bytes(), None).ok_or_else(|| {
            TrellisError::partial_parse(path.clone(), None, None, "parser produced no tree")
        })?;

        Ok(SyntaxTree {
            language,
            path,
            source: text,
            tree,
        })
    }

    fn slot(&self, language: Language) -> Result<Slot> {
        {
            let slots = self.slots.read().map_err(|_| Self::poisoned())?;
            if let Some(slot) = slots.get(&language) {
                return Ok(Arc::clone(slot));
            }
        }

        let mut slots = self.slots.write().map_err(|_| Self::poisoned())?;
        Ok(Arc::clone(slots.entry(language).or_default()))
    }

    fn compile(&self, language: Language) -> Result<Arc<Grammar>> {
        self.compilations.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        match (self.compiler)(language) {
            Ok(grammar) => {
                debug!(
                    "Compiled {} grammar in {:?}",
                    language.name(),
                    started.elapsed()
                );
                Ok(Arc::new(grammar))
            }
            Err(err) => {
                warn!("Grammar compilation for {} failed: {}", language.name(), err);
                Err(err)
            }
        }
    }

    fn poisoned() -> TrellisError {
        error!("Grammar registry lock poisoned by a panicking writer");
        TrellisError::lock_inconsistency(
            "grammar_registry",
            "registry lock poisoned by a panicking writer",
        )
    }
}
