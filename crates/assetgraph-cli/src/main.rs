//! Asset directory inspection CLI.
//!
//! Provides the `assetgraph` binary for examining a directory written by an
//! asset store without rebuilding anything. It reads the `.state` metadata
//! files directly, so it needs no registry of producers.
//!
//! Exit codes: 0 = success, 1 = drift found (`drift` only), 2 = malformed
//! state or dependency cycle, 3 = I/O error.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;

use assetgraph_core::AssetError;
use assetgraph_storage::{
    dependency_graph, dependency_order, list_assets, to_dot, AssetSummary, DiskStatus,
};

/// Inspect persisted asset graphs.
#[derive(Parser)]
#[command(name = "assetgraph", about = "Inspect persisted asset graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List every persisted asset with its hash and disk status.
    List {
        /// Asset directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Report assets whose payload was edited or removed since the last write.
    Drift {
        /// Asset directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print the dependency graph.
    Graph {
        /// Asset directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print names parents-first instead of Graphviz DOT.
        #[arg(long)]
        order: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::List { dir, json } => run_list(&dir, json),
        Commands::Drift { dir, json } => run_drift(&dir, json),
        Commands::Graph { dir, order } => run_graph(&dir, order),
    };
    process::exit(exit_code);
}

/// Map an error to an exit code after printing it.
fn fail(err: &AssetError) -> i32 {
    eprintln!("Error: {}", err);
    match err.root_cause() {
        AssetError::Io { .. } | AssetError::NotFound { .. } => 3,
        _ => 2,
    }
}

fn load(dir: &Path) -> Result<Vec<AssetSummary>, AssetError> {
    let summaries = list_assets(dir)?;
    debug!(dir = %dir.display(), assets = summaries.len(), "loaded asset state");
    Ok(summaries)
}

fn print_json(value: &impl serde::Serialize) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e));
    println!("{}", json);
}

fn status_label(status: DiskStatus) -> &'static str {
    match status {
        DiskStatus::Clean => "clean",
        DiskStatus::Drifted => "drifted",
        DiskStatus::Missing => "missing",
    }
}

/// Execute the list subcommand.
fn run_list(dir: &Path, json: bool) -> i32 {
    let summaries = match load(dir) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if json {
        print_json(&summaries);
        return 0;
    }
    for summary in &summaries {
        println!(
            "{}  {:<7}  {}{}  ({} bytes, {} parents)",
            summary.hash.short(),
            status_label(summary.status),
            summary.name,
            if summary.frozen { " [frozen]" } else { "" },
            summary.size,
            summary.parents.len(),
        );
    }
    0
}

/// Execute the drift subcommand.
///
/// Drifted assets will be frozen by the next read; missing ones will be
/// regenerated.
fn run_drift(dir: &Path, json: bool) -> i32 {
    let summaries = match load(dir) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let drifted: Vec<&AssetSummary> = summaries
        .iter()
        .filter(|s| s.status != DiskStatus::Clean)
        .collect();

    if json {
        print_json(&drifted);
    } else if drifted.is_empty() {
        println!("No drift in {}", dir.display());
    } else {
        for summary in &drifted {
            println!("{}: {}", summary.name, status_label(summary.status));
        }
    }
    if drifted.is_empty() {
        0
    } else {
        1
    }
}

/// Execute the graph subcommand.
fn run_graph(dir: &Path, order: bool) -> i32 {
    let summaries = match load(dir) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let graph = dependency_graph(&summaries);
    if !order {
        print!("{}", to_dot(&graph));
        return 0;
    }
    match dependency_order(&graph) {
        Ok(names) => {
            for name in names {
                println!("{}", name);
            }
            0
        }
        Err(e) => fail(&e),
    }
}
