//! Orchestrator facade: extraction, merge, publish and queries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::TrellisConfig;
use crate::core::errors::{Result, TrellisError};
use crate::core::extractor::{FileAnalysis, FileExtractor, SourceFile};
use crate::graph::builder::{BuildReport, GraphBuilder};
use crate::graph::expansion::{ContextBundle, ContextExpander};
use crate::graph::pdg::{NodeId, ProgramDependenceGraph};
use crate::graph::store::GraphStore;
use crate::lang::common::Signature;
use crate::lang::registry::GrammarRegistry;

type AnalysisCache = BTreeMap<String, Arc<FileAnalysis>>;

/// Owns the grammar registry, the published graph and the per-file
/// analysis cache.
///
/// Builds are serialized by the cache mutex; queries only touch the graph
/// store and never wait for a build.
pub struct Indexer {
    registry: Arc<GrammarRegistry>,
    store: GraphStore,
    config: TrellisConfig,
    pool: Option<ThreadPool>,
    cache: Mutex<AnalysisCache>,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("registry", &self.registry)
            .field("generation", &self.store.generation())
            .field("cached_files", &self.cache.lock().len())
            .finish()
    }
}

impl Indexer {
    /// Create an indexer with its own grammar registry.
    pub fn new(config: TrellisConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(GrammarRegistry::new()))
    }

    /// Create an indexer sharing `registry`.
    pub fn with_registry(config: TrellisConfig, registry: Arc<GrammarRegistry>) -> Result<Self> {
        config.validate()?;

        let pool = match config.build.worker_threads {
            0 => None,
            threads => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("trellis-extract-{index}"))
                    .build()
                    .map_err(|e| {
                        TrellisError::internal(format!("Failed to build worker pool: {e}"))
                    })?,
            ),
        };

        Ok(Self {
            registry,
            store: GraphStore::new(),
            config,
            pool,
            cache: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<GrammarRegistry> {
        &self.registry
    }

    /// Full rebuild from `files`. Publishes only when the build succeeds;
    /// two files with the same path fail the build with `GraphIntegrity`.
    pub fn index(&self, files: Vec<SourceFile>, cancel: &CancellationToken) -> Result<BuildReport> {
        let started = Instant::now();
        let mut cache = self.cache.lock();
        info!("Indexing {} files", files.len());

        let files = self.enabled(files);
        let analyses = self.extract_all(&files, &AnalysisCache::new(), cancel)?;
        let report = self.merge_and_publish(&analyses, cancel, started)?;

        *cache = analyses
            .into_iter()
            .map(|analysis| (analysis.path.clone(), analysis))
            .collect();
        Ok(report)
    }

    /// Incremental rebuild: replace `changed` files, drop `removed` paths and
    /// reuse every other cached analysis. Changed files whose content hash
    /// is unchanged are not re-extracted.
    pub fn update(
        &self,
        changed: Vec<SourceFile>,
        removed: &[String],
        cancel: &CancellationToken,
    ) -> Result<BuildReport> {
        let started = Instant::now();
        let mut cache = self.cache.lock();
        info!(
            "Updating index: {} changed, {} removed",
            changed.len(),
            removed.len()
        );

        let changed = self.enabled(changed);
        let analyses = self.extract_all(&changed, &cache, cancel)?;

        let replaced: BTreeSet<&str> = removed
            .iter()
            .map(String::as_str)
            .chain(analyses.iter().map(|analysis| analysis.path.as_str()))
            .collect();
        let mut merged: Vec<Arc<FileAnalysis>> = cache
            .values()
            .filter(|analysis| !replaced.contains(analysis.path.as_str()))
            .cloned()
            .collect();
        merged.extend(analyses.iter().cloned());

        let report = self.merge_and_publish(&merged, cancel, started)?;
        *cache = merged
            .into_iter()
            .map(|analysis| (analysis.path.clone(), analysis))
            .collect();
        Ok(report)
    }

    /// Budgeted context around `node_id`; the configured default budget is
    /// used when `token_budget` is `None`.
    pub fn expand(&self, node_id: &NodeId, token_budget: Option<usize>) -> Result<ContextBundle> {
        let graph = self.store.current()?;
        let budget = token_budget.unwrap_or(self.config.expansion.default_token_budget);
        ContextExpander::new(&graph, &self.config.expansion).expand(node_id, budget)
    }

    /// Signature behind `node_id`. Module nodes have none and report
    /// `NodeNotFound`.
    pub fn lookup_signature(&self, node_id: &NodeId) -> Result<Arc<Signature>> {
        let graph = self.store.current()?;
        graph
            .node(node_id)
            .and_then(|node| node.signature.clone())
            .ok_or_else(|| TrellisError::node_not_found(node_id.as_str()))
    }

    /// Current graph snapshot.
    pub fn snapshot(&self) -> Result<Arc<ProgramDependenceGraph>> {
        self.store.current()
    }

    fn enabled(&self, files: Vec<SourceFile>) -> Vec<SourceFile> {
        let enabled = self.config.analysis.enabled_languages();
        files
            .into_iter()
            .filter(|file| {
                let keep = enabled.contains(&file.language);
                if !keep {
                    debug!("Skipping {}: {} is disabled", file.path, file.language);
                }
                keep
            })
            .collect()
    }

    fn extract_all(
        &self,
        files: &[SourceFile],
        reusable: &AnalysisCache,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<FileAnalysis>>> {
        let extractor = FileExtractor::new(&self.registry, &self.config.analysis);
        let run = || {
            files
                .par_iter()
                .map(|file| {
                    if cancel.is_cancelled() {
                        return Err(TrellisError::cancelled("extraction"));
                    }
                    let unchanged = reusable
                        .get(&file.path)
                        .filter(|cached| cached.content_hash == file.content_hash());
                    match unchanged {
                        Some(cached) => Ok(refreshed(cached, file.modified)),
                        None => extractor.extract(file).map(Arc::new),
                    }
                })
                .collect::<Result<Vec<_>>>()
        };

        let analyses = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        if let Err(err) = &analyses {
            warn!("Extraction aborted: {}", err);
        }
        analyses
    }

    fn merge_and_publish(
        &self,
        analyses: &[Arc<FileAnalysis>],
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<BuildReport> {
        let builder = GraphBuilder::new(&self.config.build).with_cancellation(cancel);
        let (graph, mut report) = builder.build(analyses.iter().map(Arc::as_ref))?;

        if cancel.is_cancelled() {
            warn!("Build cancelled before publish");
            return Err(TrellisError::cancelled("publish"));
        }
        report.generation = self.store.publish(graph);
        report.elapsed = started.elapsed();

        info!(
            generation = report.generation,
            files = report.files,
            nodes = report.nodes,
            edges = report.edges,
            unresolved = report.unresolved.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Index published"
        );
        Ok(report)
    }
}

/// Cached analysis carrying the caller's latest freshness timestamp.
fn refreshed(cached: &Arc<FileAnalysis>, modified: DateTime<Utc>) -> Arc<FileAnalysis> {
    if cached.modified == modified {
        return Arc::clone(cached);
    }
    let mut analysis = FileAnalysis::clone(cached);
    analysis.modified = modified;
    Arc::new(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::lang::language::Language;

    fn file(path: &str, text: &str) -> SourceFile {
        SourceFile::new(path, Language::Python, text, Utc::now())
    }

    #[test]
    fn test_queries_before_index() {
        let indexer = Indexer::new(TrellisConfig::default()).unwrap();
        let id = NodeId::from("a.py::f");
        assert_eq!(indexer.expand(&id, None).unwrap_err().kind(), ErrorKind::NotIndexed);
        assert_eq!(indexer.lookup_signature(&id).unwrap_err().kind(), ErrorKind::NotIndexed);
        assert!(indexer.snapshot().is_err());
    }

    #[test]
    fn test_index_then_lookup() {
        let indexer = Indexer::new(TrellisConfig::default()).unwrap();
        let report = indexer
            .index(
                vec![file("a.py", "def f(x: int) -> int:\n    return x\n")],
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(report.generation, 1);
        assert_eq!(report.files, 1);

        let signature = indexer.lookup_signature(&NodeId::from("a.py::f")).unwrap();
        assert_eq!(signature.parameters.len(), 1);
        assert_eq!(signature.return_type.as_deref(), Some("int"));

        let err = indexer.lookup_signature(&NodeId::from("a.py")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeNotFound);
    }

    #[test]
    fn test_disabled_languages_are_skipped() {
        let mut config = TrellisConfig::default();
        config.analysis.languages = vec!["rust".to_string()];
        let indexer = Indexer::new(config).unwrap();
        let report = indexer
            .index(vec![file("a.py", "def f():\n    pass\n")], &CancellationToken::new())
            .unwrap();
        assert_eq!(report.files, 0);
        assert_eq!(indexer.registry().cached_count().unwrap(), 0);
    }

    #[test]
    fn test_dedicated_pool() {
        let mut config = TrellisConfig::default();
        config.build.worker_threads = 2;
        let indexer = Indexer::new(config).unwrap();
        let files = (0..8)
            .map(|i| file(&format!("m{i}.py"), "def f():\n    g()\n"))
            .collect();
        let report = indexer.index(files, &CancellationToken::new()).unwrap();
        assert_eq!(report.files, 8);
    }
}
