//! Serial merge of per-file analyses into one [`ProgramDependenceGraph`].
//!
//! Extraction runs in parallel and produces independent [`FileAnalysis`]
//! records; the merge is single-threaded so node ids and edge resolution
//! never race. Node identity comes from the analyses themselves, so an
//! unchanged file always contributes the same ids.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::BuildConfig;
use crate::core::errors::{ErrorKind, Result, TrellisError};
use crate::core::extractor::{FileAnalysis, References};
use crate::graph::pdg::{NodeId, NodeKind, PdgEdge, PdgNode, ProgramDependenceGraph, Relation};
use crate::graph::resolution::{CallIdentifier, SymbolEntry, SymbolTable, Unresolved};
use crate::lang::common::ExtractionError;

/// A reference that produced no edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub kind: ErrorKind,
    pub source: NodeId,
    pub file: String,
    pub name: String,
    pub relation: Relation,
    /// Matching candidates; 0 when nothing matched
    pub candidates: usize,
}

/// Counts and diagnostics of one build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub files: usize,
    pub nodes: usize,
    pub edges: usize,
    /// Generation the graph was published as (0 when not published)
    pub generation: u64,
    pub errors: Vec<ExtractionError>,
    pub unresolved: Vec<UnresolvedReference>,
    #[serde(serialize_with = "serialize_duration_ms", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

fn serialize_duration_ms<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

/// Merges analyses into a validated graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'a> {
    config: &'a BuildConfig,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Abandon the build when `token` is cancelled.
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Merge `analyses` into a new graph.
    ///
    /// Fails with `BuildCancelled` when cancelled between phases and with
    /// `GraphIntegrity` when the merged graph has duplicate ids or dangling
    /// edges. The report's `generation` is left at 0.
    pub fn build<'f, I>(&self, analyses: I) -> Result<(ProgramDependenceGraph, BuildReport)>
    where
        I: IntoIterator<Item = &'f FileAnalysis>,
    {
        let started = Instant::now();
        let mut files: Vec<&FileAnalysis> = analyses.into_iter().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut report = BuildReport {
            files: files.len(),
            ..BuildReport::default()
        };

        let mut nodes = Vec::new();
        let mut table = SymbolTable::new();
        for file in &files {
            self.check_cancelled("node assignment")?;
            report.errors.extend(file.errors.iter().cloned());
            nodes.push(module_node(file));
            for analyzed in &file.signatures {
                let signature = &analyzed.signature;
                let kind = NodeKind::from(signature.kind);
                table.insert(
                    &signature.name,
                    SymbolEntry {
                        id: signature.id.clone(),
                        kind,
                        file: file.path.clone(),
                        scope: signature.scope.clone(),
                    },
                );
                nodes.push(PdgNode {
                    id: signature.id.clone(),
                    kind,
                    name: signature.name.clone(),
                    language: signature.language,
                    file: file.path.clone(),
                    start_line: signature.span.start_line,
                    end_line: signature.span.end_line,
                    signature: Some(Arc::clone(signature)),
                    complexity: analyzed.complexity,
                    freshness: file.modified,
                });
            }
        }
        debug!("Assigned {} nodes from {} files", nodes.len(), files.len());

        let known: BTreeSet<&NodeId> = nodes.iter().map(|node| &node.id).collect();
        let mut edges = Vec::new();
        for file in &files {
            self.check_cancelled("edge resolution")?;
            let module = NodeId::module(&file.path);

            for analyzed in &file.signatures {
                let signature = &analyzed.signature;
                let container = signature
                    .container
                    .as_ref()
                    .filter(|container| known.contains(container))
                    .cloned()
                    .unwrap_or_else(|| module.clone());
                edges.push(PdgEdge::new(container, signature.id.clone(), Relation::Defines));

                self.resolve_references(
                    &table,
                    &signature.id,
                    &file.path,
                    &analyzed.references,
                    &mut edges,
                    &mut report,
                );
            }

            self.resolve_references(
                &table,
                &module,
                &file.path,
                &file.module_references,
                &mut edges,
                &mut report,
            );

            for name in &file.imports {
                let Some(reference) = CallIdentifier::parse(name) else {
                    continue;
                };
                match table.resolve(&reference, &file.path, |kind| kind != NodeKind::Module) {
                    Ok(target) => {
                        edges.push(PdgEdge::new(module.clone(), target.id.clone(), Relation::Imports))
                    }
                    Err(reason) => self.record_unresolved(
                        &mut report,
                        &module,
                        &file.path,
                        name,
                        Relation::Imports,
                        reason,
                    ),
                }
            }
        }

        self.check_cancelled("validation")?;
        let graph = ProgramDependenceGraph::from_parts(nodes, edges, files.len())?;
        graph.validate()?;

        report.nodes = graph.node_count();
        report.edges = graph.edge_count();
        report.elapsed = started.elapsed();

        if !report.unresolved.is_empty() {
            warn!(
                "{} references could not be resolved to a unique symbol",
                report.unresolved.len()
            );
        }
        info!(
            files = report.files,
            nodes = report.nodes,
            edges = report.edges,
            errors = report.errors.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Merged program dependence graph"
        );
        Ok((graph, report))
    }

    fn resolve_references(
        &self,
        table: &SymbolTable,
        source: &NodeId,
        file: &str,
        references: &References,
        edges: &mut Vec<PdgEdge>,
        report: &mut BuildReport,
    ) {
        for call in &references.calls {
            let Some(reference) = CallIdentifier::parse(call) else {
                continue;
            };
            match table.resolve(&reference, file, |kind| {
                kind.is_callable() || kind == NodeKind::Class
            }) {
                Ok(target) => edges.push(PdgEdge::new(source.clone(), target.id.clone(), Relation::Calls)),
                Err(reason) => {
                    self.record_unresolved(report, source, file, call, Relation::Calls, reason)
                }
            }
        }

        // locals dominate identifier accesses, so misses are not diagnosed
        let accesses = references
            .reads
            .iter()
            .map(|name| (name, Relation::Reads))
            .chain(references.writes.iter().map(|name| (name, Relation::Writes)));
        for (name, relation) in accesses {
            let Some(reference) = CallIdentifier::parse(name) else {
                continue;
            };
            if let Ok(target) = table.resolve(&reference, file, |kind| kind == NodeKind::Variable) {
                edges.push(PdgEdge::new(source.clone(), target.id.clone(), relation));
            }
        }
    }

    fn record_unresolved(
        &self,
        report: &mut BuildReport,
        source: &NodeId,
        file: &str,
        name: &str,
        relation: Relation,
        reason: Unresolved,
    ) {
        if !self.config.record_unresolved {
            return;
        }
        let candidates = match reason {
            Unresolved::NoMatch => 0,
            Unresolved::Ambiguous(count) => count,
        };
        report.unresolved.push(UnresolvedReference {
            kind: ErrorKind::UnresolvedReference,
            source: source.clone(),
            file: file.to_string(),
            name: name.to_string(),
            relation,
            candidates,
        });
    }

    fn check_cancelled(&self, phase: &str) -> Result<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => {
                warn!("Graph build cancelled during {}", phase);
                Err(TrellisError::cancelled(phase))
            }
            _ => Ok(()),
        }
    }
}

fn module_node(file: &FileAnalysis) -> PdgNode {
    let end_line = file
        .signatures
        .iter()
        .map(|s| s.signature.span.end_line)
        .max()
        .unwrap_or(1);
    PdgNode {
        id: NodeId::module(&file.path),
        kind: NodeKind::Module,
        name: file.path.clone(),
        language: file.language,
        file: file.path.clone(),
        start_line: 1,
        end_line,
        signature: None,
        complexity: None,
        freshness: file.modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AnalysisConfig;
    use crate::core::extractor::{FileExtractor, SourceFile};
    use crate::lang::language::Language;
    use crate::lang::registry::GrammarRegistry;
    use chrono::Utc;

    fn analyze(files: &[(&str, &str)]) -> Vec<FileAnalysis> {
        let registry = GrammarRegistry::new();
        let config = AnalysisConfig::default();
        let extractor = FileExtractor::new(&registry, &config);
        files
            .iter()
            .map(|(path, text)| {
                let file = SourceFile::new(*path, Language::Python, *text, Utc::now());
                extractor.extract(&file).unwrap()
            })
            .collect()
    }

    fn has_edge(graph: &ProgramDependenceGraph, source: &str, target: &str, relation: Relation) -> bool {
        graph
            .edges()
            .contains(&PdgEdge::new(NodeId::from(source), NodeId::from(target), relation))
    }

    #[test]
    fn test_cross_file_call_and_defines() {
        let analyses = analyze(&[
            ("src/a.py", "from b import parse_headers\n\ndef handle_request(req):\n    return parse_headers(req)\n"),
            ("src/b.py", "class Parser:\n    def parse(self):\n        pass\n\ndef parse_headers(req):\n    return Parser()\n"),
        ]);
        let config = BuildConfig::default();
        let (graph, report) = GraphBuilder::new(&config).build(&analyses).unwrap();

        assert!(has_edge(&graph, "src/a.py::handle_request", "src/b.py::parse_headers", Relation::Calls));
        assert!(has_edge(&graph, "src/b.py::parse_headers", "src/b.py::Parser", Relation::Calls));
        assert!(has_edge(&graph, "src/a.py", "src/b.py::parse_headers", Relation::Imports));
        assert!(has_edge(&graph, "src/b.py", "src/b.py::Parser", Relation::Defines));
        assert!(has_edge(&graph, "src/b.py::Parser", "src/b.py::Parser::parse", Relation::Defines));
        assert_eq!(report.files, 2);
        assert_eq!(report.nodes, graph.node_count());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_unresolved_calls_are_diagnostics() {
        let analyses = analyze(&[("a.py", "def main():\n    print(len([]))\n")]);
        let config = BuildConfig::default();
        let (graph, report) = GraphBuilder::new(&config).build(&analyses).unwrap();

        assert!(graph.callees(&NodeId::from("a.py::main")).is_empty());
        let names: Vec<&str> = report.unresolved.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["len", "print"]);
        assert!(report
            .unresolved
            .iter()
            .all(|u| u.kind == ErrorKind::UnresolvedReference && u.candidates == 0));

        let quiet = BuildConfig {
            record_unresolved: false,
            ..BuildConfig::default()
        };
        let (_, report) = GraphBuilder::new(&quiet).build(&analyses).unwrap();
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_ambiguous_call_prefers_same_directory() {
        let analyses = analyze(&[
            ("api/handler.py", "def serve():\n    helper()\n"),
            ("api/util.py", "def helper():\n    pass\n"),
            ("cli/util.py", "def helper():\n    pass\n"),
            ("web/main.py", "def serve():\n    helper()\n"),
        ]);
        let config = BuildConfig::default();
        let (graph, report) = GraphBuilder::new(&config).build(&analyses).unwrap();

        assert!(has_edge(&graph, "api/handler.py::serve", "api/util.py::helper", Relation::Calls));
        assert!(graph.callees(&NodeId::from("web/main.py::serve")).is_empty());
        let ambiguous = report
            .unresolved
            .iter()
            .find(|u| u.source.as_str() == "web/main.py::serve")
            .unwrap();
        assert_eq!(ambiguous.candidates, 2);
    }

    #[test]
    fn test_reads_writes_and_recursion() {
        let analyses = analyze(&[(
            "state.py",
            "LIMIT = 3\ncount = 0\n\ndef tick(n):\n    global count\n    count = count + LIMIT\n    if n:\n        tick(n - 1)\n",
        )]);
        let config = BuildConfig::default();
        let (graph, _) = GraphBuilder::new(&config).build(&analyses).unwrap();

        assert!(has_edge(&graph, "state.py::tick", "state.py::LIMIT", Relation::Reads));
        assert!(has_edge(&graph, "state.py::tick", "state.py::count", Relation::Writes));
        assert!(has_edge(&graph, "state.py::tick", "state.py::tick", Relation::Calls));
    }

    #[test]
    fn test_rebuild_is_identical() {
        let sources = [
            ("a.py", "def f():\n    g()\n\ndef f():\n    pass\n"),
            ("b.py", "def g():\n    f()\n"),
        ];
        let config = BuildConfig::default();
        let (first, _) = GraphBuilder::new(&config).build(&analyze(&sources)).unwrap();
        let (second, _) = GraphBuilder::new(&config).build(&analyze(&sources)).unwrap();

        assert!(first.contains(&NodeId::from("a.py::f#2")));
        let ids: Vec<&str> = first.nodes().map(|n| n.id.as_str()).collect();
        let again: Vec<&str> = second.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, again);
        assert_eq!(first.edges(), second.edges());
    }

    #[test]
    fn test_duplicate_paths_violate_integrity() {
        let mut analyses = analyze(&[("a.py", "def f():\n    pass\n")]);
        analyses.push(analyses[0].clone());
        let config = BuildConfig::default();
        let err = GraphBuilder::new(&config).build(&analyses).unwrap_err();
        assert!(matches!(err, TrellisError::GraphIntegrity { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_cancelled_build_fails() {
        let analyses = analyze(&[("a.py", "def f():\n    pass\n")]);
        let config = BuildConfig::default();
        let token = CancellationToken::new();
        token.cancel();
        let err = GraphBuilder::new(&config)
            .with_cancellation(&token)
            .build(&analyses)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BuildCancelled);
    }
}
