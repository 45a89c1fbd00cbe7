//! CLI argument structures.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Program dependence graphs and budgeted context for source trees
#[derive(Parser)]
#[command(name = "trellis")]
#[command(version = VERSION)]
#[command(about = "Trellis - program dependence graphs for context retrieval")]
#[command(long_about = "
Index a source tree into a program dependence graph and pull budgeted
context around any function, method or type.

Common Usage:

  # Index a directory and print build statistics
  trellis index ./src

  # Context around a function within 800 tokens
  trellis expand ./src 'app.py::main' --budget 800

  # Signature of a method
  trellis signature ./src 'server.py::Server::handle'

  # List supported programming languages
  trellis languages
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML)
    #[arg(short, long, global = true, env = "TRELLIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a directory and report build statistics
    Index(IndexArgs),

    /// Print the context bundle around a node as JSON
    Expand(ExpandArgs),

    /// Print the signature of a node as JSON
    Signature(SignatureArgs),

    /// List supported programming languages
    Languages,

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Root directory to index
    pub dir: PathBuf,

    /// Emit the build report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExpandArgs {
    /// Root directory to index
    pub dir: PathBuf,

    /// Seed node id, e.g. `app.py::main`
    pub node_id: String,

    /// Token budget (defaults to `expansion.default_token_budget`)
    #[arg(short, long)]
    pub budget: Option<usize>,
}

#[derive(Args)]
pub struct SignatureArgs {
    /// Root directory to index
    pub dir: PathBuf,

    /// Node id, e.g. `server.py::Server::handle`
    pub node_id: String,
}
