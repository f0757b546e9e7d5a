//! formatmatrix CLI - render the data-format support matrix

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Diagnostics go to stderr; stdout carries only command output

use anyhow::Context;
use clap::{Parser, Subcommand};
use formatmatrix_core::config::{self, ResolvedConfig};
use formatmatrix_core::tabs::initial_tab_from_query;
use formatmatrix_core::{build_widget, render_page, report};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "formatmatrix")]
#[command(about = "Render the data-format support matrix as tabbed HTML")]
#[command(version)]
struct Cli {
    /// Log progress (equivalent to RUST_LOG=formatmatrix=info)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the matrix to a self-contained HTML page
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// Initially active tab id (overrides --query and the config file)
        #[arg(long)]
        tab: Option<String>,

        /// Existing URL query string; its `tab` parameter picks the initial tab
        #[arg(long)]
        query: Option<String>,

        /// Output file path (default: formatmatrix.html)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the Overview (per-modality coverage and totals)
    Overview {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate or inspect a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Directory holding the modality JSON files (overrides config file)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Modality keyword filter; repeat to match any of several
    #[arg(long)]
    filter: Vec<String>,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without rendering
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Render {
            source,
            tab,
            query,
            output,
        } => {
            let resolved = load_config(&source)?;
            let query = query.unwrap_or_default();
            let tab = tab.unwrap_or_else(|| initial_tab_from_query(&query, &resolved.default_tab));

            let widget = build_widget(&resolved, &source.filter, Some(tab.as_str()))?;
            let html = render_page(&widget);

            let output_path = output.unwrap_or_else(|| PathBuf::from("formatmatrix.html"));
            write_output(&output_path, &html)?;

            info!(tables = widget.tables().len(), "rendered matrix");
            println!("{}", output_path.display());
            println!("?{}", widget.tab_controller().sync_query(&query));
        }
        Commands::Overview { source, format } => {
            let resolved = load_config(&source)?;
            let widget = build_widget(&resolved, &source.filter, None)?;

            match format {
                OutputFormat::Text => {
                    print!(
                        "{}",
                        report::render_text(widget.overview(), &widget.settings().layout)
                    );
                }
                OutputFormat::Json => {
                    println!("{}", report::render_json(widget.overview()));
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print!("{}", describe_config(&resolved));
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("formatmatrix={level},formatmatrix_core={level}"))
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

/// Resolve config from the working directory, then apply CLI overrides
fn load_config(source: &SourceArgs) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    let mut resolved = config::load_and_resolve(&project_root, source.config.as_deref())
        .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        info!(path = %config_path.display(), "using config");
    }
    if let Some(data) = &source.data {
        resolved.data_dir = data.clone();
    }
    if !resolved.data_dir.is_dir() {
        anyhow::bail!(
            "Data directory does not exist: {}",
            resolved.data_dir.display()
        );
    }
    Ok(resolved)
}

fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write output: {}", path.display()))
}

fn describe_config(resolved: &ResolvedConfig) -> String {
    let settings = &resolved.settings;
    let mut out = String::new();

    out.push_str("Configuration:\n");
    match resolved.config_path {
        Some(ref p) => out.push_str(&format!("  Source: {}\n", p.display())),
        None => out.push_str("  Source: defaults (no config file found)\n"),
    }
    out.push_str(&format!("  Data dir: {}\n", resolved.data_dir.display()));
    out.push_str(&format!("  Title: {}\n", settings.title));
    out.push_str(&format!("  Default tab: {}\n", resolved.default_tab));
    out.push('\n');

    out.push_str("Layout:\n");
    out.push_str(&format!("  delimiter: {:?}\n", settings.layout.delimiter));
    out.push_str(&format!("  sticky_columns: {}\n", settings.sticky_columns));
    let opacity = settings.layout.cell_opacity;
    out.push_str(&format!("  cell_opacity: {}\n", opacity));
    out.push_str(&format!(
        "  column_order: {}\n",
        settings.layout.column_order.join(", ")
    ));
    out.push('\n');

    out.push_str("Associations:\n");
    for assoc in &settings.associations {
        out.push_str(&format!("  {} <- {}\n", assoc.target, assoc.source));
    }
    out.push('\n');

    out.push_str("Modalities:\n");
    for spec in &resolved.modalities {
        out.push_str(&format!(
            "  {} ({}): {} [{}]\n",
            spec.id,
            spec.modality,
            spec.file,
            spec.keywords.join(", ")
        ));
    }
    out
}
