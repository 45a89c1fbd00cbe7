//! Command execution.

use std::path::Path;
use std::sync::Arc;

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tokio_util::sync::CancellationToken;
use tracing::info;

use trellis_rs::{BuildReport, Indexer, Language, NodeId, TrellisConfig};

use super::args::{ExpandArgs, IndexArgs, SignatureArgs};
use super::discovery::discover_sources;

/// Load the configuration file, or defaults when none is given.
pub fn load_configuration(path: Option<&Path>) -> anyhow::Result<TrellisConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Ok(TrellisConfig::from_yaml_file(path)?)
        }
        None => Ok(TrellisConfig::default()),
    }
}

fn build_index(dir: &Path, config: TrellisConfig) -> anyhow::Result<(Indexer, BuildReport)> {
    let files = discover_sources(dir)?;
    let indexer = Indexer::new(config)?;
    let report = indexer.index(files, &CancellationToken::new())?;
    Ok((indexer, report))
}

pub fn index_command(args: IndexArgs, config: TrellisConfig) -> anyhow::Result<()> {
    let (_, report) = build_index(&args.dir, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Indexed".bright_green().bold(),
        args.dir.display().to_string().cyan()
    );
    println!();

    #[derive(Tabled)]
    struct SummaryRow {
        metric: &'static str,
        value: String,
    }

    let rows = vec![
        SummaryRow { metric: "files", value: report.files.to_string() },
        SummaryRow { metric: "nodes", value: report.nodes.to_string() },
        SummaryRow { metric: "edges", value: report.edges.to_string() },
        SummaryRow { metric: "unresolved", value: report.unresolved.len().to_string() },
        SummaryRow { metric: "errors", value: report.errors.len().to_string() },
        SummaryRow { metric: "generation", value: report.generation.to_string() },
        SummaryRow {
            metric: "elapsed",
            value: format!("{} ms", report.elapsed.as_millis()),
        },
    ];
    println!("{}", Table::new(rows).with(Style::rounded()));

    if !report.errors.is_empty() {
        println!();
        println!("{}", "Extraction errors".yellow().bold());
        for error in &report.errors {
            let line = error.line.map(|l| format!(":{l}")).unwrap_or_default();
            println!("  {}{} {}", error.file, line, error.message.dimmed());
        }
    }
    Ok(())
}

pub fn expand_command(args: ExpandArgs, config: TrellisConfig) -> anyhow::Result<()> {
    let (indexer, _) = build_index(&args.dir, config)?;
    let bundle = indexer.expand(&NodeId::from(args.node_id), args.budget)?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

pub fn signature_command(args: SignatureArgs, config: TrellisConfig) -> anyhow::Result<()> {
    let (indexer, _) = build_index(&args.dir, config)?;
    let signature = indexer.lookup_signature(&NodeId::from(args.node_id))?;
    println!("{}", serde_json::to_string_pretty(Arc::as_ref(&signature))?);
    Ok(())
}

pub fn list_languages() -> anyhow::Result<()> {
    println!("{}", "Supported Programming Languages".bright_blue().bold());
    println!("   Found {} supported languages", Language::ALL.len());
    println!();

    #[derive(Tabled)]
    struct LanguageRow {
        language: &'static str,
        key: &'static str,
        extensions: String,
        status: String,
    }

    let rows: Vec<_> = Language::ALL
        .iter()
        .map(|language| {
            let info = language.info();
            LanguageRow {
                language: info.name,
                key: info.key,
                extensions: info
                    .extensions
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", "),
                status: format!("{:?}", info.status),
            }
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

pub fn print_default_config() -> anyhow::Result<()> {
    println!("# Default trellis configuration");
    println!("# Usage: trellis index --config your-config.yml <dir>");
    println!();
    print!("{}", serde_yaml::to_string(&TrellisConfig::default())?);
    Ok(())
}
