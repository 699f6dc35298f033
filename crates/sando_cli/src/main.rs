//! Sando CLI
//!
//! Build, inspect and scaffold Sando design-token projects.
//!
//! # Usage
//!
//! ```bash
//! # Scaffold sando.toml and a starter token tree
//! sando init my-tokens --name acme
//!
//! # Build every stale layer (all layers with --force)
//! sando build
//!
//! # Show which layers would rebuild, and why
//! sando status
//! ```

mod config;
mod project;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use sando_tokens::{
    discover_layers, BuildOptions, FileCacheStore, JsonEngine, LayerConfig, LayerSources,
    Orchestrator, RebuildDecision,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::SandoConfig;

#[derive(Parser)]
#[command(name = "sando")]
#[command(version)]
#[command(about = "Compile layered design tokens into CSS custom properties and typed modules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sando.toml or the directory holding it
    #[arg(long, short, global = true, default_value = ".")]
    config: PathBuf,

    /// Log debug output
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build stale layers and print a summary
    Build {
        /// Rebuild every layer, ignoring the cache
        #[arg(long, short)]
        force: bool,

        /// Build only this layer (ingredients, flavors or recipes)
        #[arg(long)]
        layer: Option<String>,
    },

    /// Show whether each layer needs a rebuild
    Status,

    /// List discovered layers, flavors and modes
    List,

    /// Remove generated output and the build cache
    Clean,

    /// Create sando.toml and a starter token tree
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Build { force, layer } => cmd_build(&cli.config, force, layer),
        Commands::Status => cmd_status(&cli.config),
        Commands::List => cmd_list(&cli.config),
        Commands::Clean => cmd_clean(&cli.config),
        Commands::Init { path, name } => cmd_init(&path, name),
    }
}

fn load(config_path: &Path) -> Result<(SandoConfig, Vec<LayerConfig>)> {
    let config = SandoConfig::load_from_dir(config_path)?;
    let layers = discover_layers(&config.tokens_dir(), &config.selectors.default_flavor)
        .context("Failed to discover token sources")?;
    Ok((config, layers))
}

fn cmd_build(config_path: &Path, force: bool, only: Option<String>) -> Result<ExitCode> {
    let (config, layers) = load(config_path)?;
    if let Some(only) = &only {
        if !layers.iter().any(|l| &l.name == only) {
            let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
            anyhow::bail!("Unknown layer `{}` (expected one of: {})", only, names.join(", "));
        }
    }

    let ctx = config.build_context(generated_at(std::env::var("SOURCE_DATE_EPOCH").ok())?);
    let mut cache = FileCacheStore::load(config.cache_file());

    tracing::info!("Building `{}`", config.project.name);
    let report = Orchestrator::new(&JsonEngine, &mut cache, &ctx)
        .with_options(BuildOptions { force, only })
        .run(&layers);

    print!("{}", report.summary());
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_status(config_path: &Path) -> Result<ExitCode> {
    let (config, layers) = load(config_path)?;
    let ctx = config.build_context(String::new());
    let mut cache = FileCacheStore::load(config.cache_file());

    let orchestrator = Orchestrator::new(&JsonEngine, &mut cache, &ctx);
    for (layer, decision) in orchestrator.plan(&layers) {
        match decision {
            RebuildDecision::UpToDate => println!("{}: up to date", layer.name),
            RebuildDecision::Rebuild(reason) => {
                println!("{}: needs rebuild ({})", layer.name, reason)
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_list(config_path: &Path) -> Result<ExitCode> {
    let (config, layers) = load(config_path)?;
    let modes = config.mode_registry();

    for layer in &layers {
        match &layer.sources {
            LayerSources::Files(files) => {
                println!("{} ({} files)", layer.name, files.len());
                for file in files {
                    println!("  {}", relative(&config.root, file).display());
                }
            }
            LayerSources::Flavors(flavors) => {
                println!("{} ({} flavors)", layer.name, flavors.len());
                for flavor in flavors {
                    let marker = if config.selectors.is_default_flavor(&flavor.name) {
                        " (default)"
                    } else {
                        ""
                    };
                    println!("  {}{}", flavor.name, marker);
                    for mode in flavor.mode_files.keys() {
                        let kind = match modes.get(mode) {
                            Some(mode) => format!("{:?}", mode.kind()),
                            None => "unknown, emitted as base".to_string(),
                        };
                        println!("    {mode}: {kind}");
                    }
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

fn cmd_clean(config_path: &Path) -> Result<ExitCode> {
    let config = SandoConfig::load_from_dir(config_path)?;

    let output_dir = config.removable_output_dir()?;
    if output_dir.exists() {
        fs::remove_dir_all(&output_dir)
            .with_context(|| format!("Failed to remove {}", output_dir.display()))?;
        tracing::info!("Removed {}", output_dir.display());
    }

    let cache_file = config.cache_file();
    if cache_file.exists() {
        fs::remove_file(&cache_file)
            .with_context(|| format!("Failed to remove {}", cache_file.display()))?;
        tracing::info!("Removed {}", cache_file.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_init(path: &Path, name: Option<String>) -> Result<ExitCode> {
    let name = match name {
        Some(name) => name,
        None => default_project_name(path)?,
    };
    project::create_project(path, &name)?;
    println!("Created `{}`. Run `sando build` to compile it.", name);
    Ok(ExitCode::SUCCESS)
}

fn default_project_name(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read the current directory")?
            .join(path)
    };
    Ok(absolute
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .last()
        .unwrap_or("design-tokens")
        .to_string())
}

/// Header stamp: `SOURCE_DATE_EPOCH` when set, for reproducible output,
/// otherwise the current time
fn generated_at(source_date_epoch: Option<String>) -> Result<String> {
    let time = match source_date_epoch {
        Some(epoch) => {
            let seconds: i64 = epoch
                .trim()
                .parse()
                .with_context(|| format!("SOURCE_DATE_EPOCH `{epoch}` is not a number"))?;
            DateTime::<Utc>::from_timestamp(seconds, 0)
                .with_context(|| format!("SOURCE_DATE_EPOCH `{epoch}` is out of range"))?
        }
        None => Utc::now(),
    };
    Ok(time.to_rfc3339_opts(SecondsFormat::Secs, true))
}
