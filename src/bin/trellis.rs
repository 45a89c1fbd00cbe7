//! Trellis CLI - program dependence graphs and budgeted context retrieval.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Index(args) => {
            let config = cli::load_configuration(cli.config.as_deref())?;
            cli::index_command(args, config)?;
        }
        Commands::Expand(args) => {
            let config = cli::load_configuration(cli.config.as_deref())?;
            cli::expand_command(args, config)?;
        }
        Commands::Signature(args) => {
            let config = cli::load_configuration(cli.config.as_deref())?;
            cli::signature_command(args, config)?;
        }
        Commands::Languages => {
            cli::list_languages()?;
        }
        Commands::PrintDefaultConfig => {
            cli::print_default_config()?;
        }
    }

    Ok(())
}
