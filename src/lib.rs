//! # Trellis-RS: Program Dependence Graphs for Context Retrieval
//!
//! Trellis parses source files in thirteen languages, extracts declaration
//! signatures and per-function control flow, and merges them into a
//! queryable program dependence graph (PDG). The graph answers one question
//! well: given a function, method or type, which surrounding code fits into
//! a fixed token budget?
//!
//! - **Language analysis**: tree-sitter grammars loaded lazily through a
//!   shared registry, with one analyzer per language
//! - **Control flow**: per-callable CFGs and cyclomatic complexity
//! - **Graph build**: cross-file name resolution into `Calls`, `Reads`,
//!   `Writes`, `Imports` and `Defines` edges
//! - **Expansion**: budgeted breadth-first context around a seed node
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     api::Indexer                            │
//! ├──────────────────┬──────────────────┬───────────────────────┤
//! │  lang            │  core            │  graph                │
//! │ • Registry       │ • Extractor      │ • Builder/Resolution  │
//! │ • 13 analyzers   │ • CFG            │ • Store (snapshots)   │
//! │ • Vocabularies   │ • Config/Errors  │ • Expansion           │
//! └──────────────────┴──────────────────┴───────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use tokio_util::sync::CancellationToken;
//! use trellis_rs::{Indexer, Language, NodeId, SourceFile, TrellisConfig};
//!
//! fn main() -> trellis_rs::Result<()> {
//!     let indexer = Indexer::new(TrellisConfig::default())?;
//!     let file = SourceFile::new(
//!         "app.py",
//!         Language::Python,
//!         "def main():\n    run()\n\ndef run():\n    pass\n",
//!         Utc::now(),
//!     );
//!     let report = indexer.index(vec![file], &CancellationToken::new())?;
//!     println!("{} nodes, {} edges", report.nodes, report.edges);
//!
//!     let bundle = indexer.expand(&NodeId::from("app.py::main"), Some(500))?;
//!     println!("{} entries", bundle.len());
//!     Ok(())
//! }
//! ```

#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core per-file analysis
pub mod core {
    //! Per-file extraction, control flow, configuration and errors.

    pub mod cfg;
    pub mod config;
    pub mod errors;
    pub mod extractor;
}

// Language registry and analyzers
pub mod lang;

// Program dependence graph
pub mod graph {
    //! Graph model, cross-file resolution, publication and expansion.

    pub mod builder;
    pub mod expansion;
    pub mod pdg;
    pub mod resolution;
    pub mod store;
}

// Public API
pub mod api {
    //! High-level indexing facade.

    pub mod indexer;
}

// Re-export primary types for convenience
pub use api::indexer::Indexer;
pub use core::config::TrellisConfig;
pub use core::errors::{ErrorKind, Result, TrellisError};
pub use core::extractor::{FileAnalysis, SourceFile};
pub use graph::builder::BuildReport;
pub use graph::expansion::{ContextBundle, ContextEntry};
pub use graph::pdg::{NodeId, NodeKind, ProgramDependenceGraph, Relation};
pub use lang::{GrammarRegistry, Language, Signature};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
