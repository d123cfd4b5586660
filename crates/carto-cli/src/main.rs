//! CLI binary for cartograph: structural queries over a project's graph.
//!
//! Reads the snapshot maintained by the engine; it never mutates the
//! graph. Exit codes: 0 on success, 1 on invalid arguments, 2 when the
//! project has no graph yet.

use anyhow::{Context, Result};
use carto_core::config::{self, EngineConfig};
use carto_core::snapshot::{self, LoadedState};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cartograph", about = "Incremental code-graph queries")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List everything that references an entity
    Callers {
        /// Entity name, scoped name, node id, or regex
        name: String,
    },

    /// List everything an entity references
    Callees {
        name: String,
    },

    /// Files a file depends on
    Deps {
        file: String,
    },

    /// Files that depend on a file
    Rdeps {
        file: String,
    },

    /// Entities defined in a file
    File {
        file: String,
    },

    /// Full record of an entity
    Entity {
        name: String,
    },

    /// Files affected by a change to a file
    Impact {
        file: String,

        /// Restrict to files referencing this bare name
        #[arg(long)]
        name: Option<String>,

        /// Maximum reverse-dependency depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Unreferenced functions and classes
    Dead,

    /// Shortest dependency path between two entities
    Path {
        source: String,
        target: String,
    },

    /// Search node names by regex
    Search {
        pattern: String,
    },

    /// Circular file dependencies
    Cycles,

    /// Exported symbols of a file
    Exports {
        file: String,
    },

    /// Node and edge counts
    Stats,

    /// Emit the graph as Graphviz DOT
    Visualize,

    /// Full graph overview
    Summary,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let project_root = match cli.project {
        Some(p) => p,
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    let config_root = config::config_root();
    let cfg = EngineConfig::load(&config_root).context("failed to load config")?;

    let snapshot_file = config::snapshot_path(&config_root, &project_root);
    let Some(state) = snapshot::load(&snapshot_file)? else {
        eprintln!("no graph for {} (expected {})", project_root.display(), snapshot_file.display());
        return Ok(ExitCode::from(2));
    };
    let LoadedState { store, exports, .. } = state;

    match cli.command {
        Commands::Callers { name } => print_json(&carto_nav::neighbors::callers(&store, &name))?,
        Commands::Callees { name } => print_json(&carto_nav::neighbors::callees(&store, &name))?,
        Commands::Deps { file } => print_json(&carto_nav::deps::deps(&store, &file))?,
        Commands::Rdeps { file } => print_json(&carto_nav::deps::rdeps(&store, &file))?,
        Commands::File { file } => print_json(&carto_nav::fetch::file_info(&store, &file))?,
        Commands::Entity { name } => print_json(&carto_nav::fetch::entity_info(&store, &name))?,
        Commands::Impact { file, name, depth } => {
            let depth = depth.unwrap_or(cfg.query.impact_depth);
            print_json(&carto_nav::impact::impact(&store, &file, name.as_deref(), depth))?;
        }
        Commands::Dead => {
            print_json(&carto_nav::dead::dead(&store, &cfg.query.entrypoint_patterns))?;
        }
        Commands::Path { source, target } => {
            print_json(&carto_nav::paths::shortest_path(&store, &source, &target))?;
        }
        Commands::Search { pattern } => print_json(&carto_nav::search::search(&store, &pattern))?,
        Commands::Cycles => print_json(&carto_nav::cycles::detect_cycles(&store))?,
        Commands::Exports { file } => {
            #[derive(Serialize)]
            struct ExportsReport<'a> {
                file: &'a str,
                exports: Vec<&'a String>,
            }
            let names = exports.get(&file).map(|s| s.iter().collect()).unwrap_or_default();
            print_json(&ExportsReport {
                file: &file,
                exports: names,
            })?;
        }
        Commands::Stats => {
            #[derive(Serialize)]
            struct Stats {
                nodes: usize,
                edges: usize,
                files: usize,
            }
            print_json(&Stats {
                nodes: store.node_count(),
                edges: store.edge_count(),
                files: store.files().len(),
            })?;
        }
        Commands::Visualize => print!("{}", carto_nav::export::export_dot(&store)),
        Commands::Summary => {
            print_json(&carto_nav::summary::summarize(
                &store,
                cfg.query.summary_top_k,
                &cfg.query.entrypoint_patterns,
            ))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
