//! Read-only inspection of a persisted asset directory.
//!
//! Works from the metadata files alone, without a registry or a rebuild, so
//! it can describe a directory written by any producer set.
//!
//! # Architecture
//!
//! - [`list_assets`]: one [`AssetSummary`] per metadata file, with the
//!   payload's [`DiskStatus`] relative to the recorded digest.
//! - [`dependency_graph`]: parent -> child edges between the listed assets.
//! - [`dependency_order`]: parents-first ordering, or a cycle error.
//! - [`to_dot`]: Graphviz rendering of the dependency graph.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use walkdir::WalkDir;

use assetgraph_core::slug::{self, STATE_DIR};
use assetgraph_core::{AssetError, AssetHash, AssetRecord, Reference};

/// How a payload file compares with its recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskStatus {
    /// Payload matches the recorded digest.
    Clean,
    /// Payload was edited; the next read will freeze the asset.
    Drifted,
    /// Metadata exists but the payload file does not.
    Missing,
}

/// One persisted asset as seen from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub name: String,
    /// Hash of the recorded state.
    pub hash: AssetHash,
    pub frozen: bool,
    pub parents: Vec<Reference>,
    /// Payload size in bytes, zero when missing.
    pub size: u64,
    pub status: DiskStatus,
}

fn summarize(dir: &Path, record: AssetRecord) -> Result<AssetSummary, AssetError> {
    let data_path = dir.join(slug::data_path(&record.name));
    let (size, status) = match fs::read(&data_path) {
        Ok(data) if AssetHash::of(&data) == record.data_digest => {
            (data.len() as u64, DiskStatus::Clean)
        }
        Ok(data) => (data.len() as u64, DiskStatus::Drifted),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (0, DiskStatus::Missing),
        Err(e) => return Err(AssetError::io("read", &data_path, e)),
    };
    Ok(AssetSummary {
        hash: record.hash()?,
        name: record.name,
        frozen: record.frozen,
        parents: record.parents,
        size,
        status,
    })
}

/// Lists every asset with a metadata file under `dir`, sorted by name.
///
/// A directory without a `.state` subdirectory holds no assets.
pub fn list_assets(dir: &Path) -> Result<Vec<AssetSummary>, AssetError> {
    let state_dir = dir.join(STATE_DIR);
    if !state_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    for entry in WalkDir::new(&state_dir).min_depth(1) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(&state_dir).to_path_buf();
            AssetError::io("walk", path, err.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let bytes = fs::read(entry.path()).map_err(|e| AssetError::io("read", entry.path(), e))?;
        let record: AssetRecord =
            serde_json::from_slice(&bytes).map_err(|source| AssetError::Serialization {
                what: entry.path().display().to_string(),
                source,
            })?;
        summaries.push(summarize(dir, record)?);
    }
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}

/// Builds a graph with one node per asset name and an edge from each
/// parent to every asset that consumed it.
///
/// Parents that have no summary of their own still get a node.
pub fn dependency_graph(summaries: &[AssetSummary]) -> DiGraph<String, ()> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for summary in summaries {
        nodes
            .entry(summary.name.as_str())
            .or_insert_with(|| graph.add_node(summary.name.clone()));
    }
    for summary in summaries {
        let child = nodes[summary.name.as_str()];
        for parent in &summary.parents {
            let parent_idx = *nodes
                .entry(parent.name.as_str())
                .or_insert_with(|| graph.add_node(parent.name.clone()));
            graph.update_edge(parent_idx, child, ());
        }
    }
    graph
}

/// Orders asset names so every parent precedes its children.
pub fn dependency_order(graph: &DiGraph<String, ()>) -> Result<Vec<String>, AssetError> {
    toposort(graph, None)
        .map(|order| order.into_iter().map(|idx| graph[idx].clone()).collect())
        .map_err(|cycle| AssetError::DependencyCycle {
            name: graph[cycle.node_id()].clone(),
        })
}

/// Renders the dependency graph in Graphviz DOT format.
pub fn to_dot(graph: &DiGraph<String, ()>) -> String {
    format!("{:?}", Dot::with_config(graph, &[Config::EdgeNoLabel]))
}
