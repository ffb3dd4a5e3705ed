pub mod check;
pub mod graph;
pub mod play;
pub mod show;

use std::path::Path;

use df_core::DialogueGraph;
use tracing::debug;

/// Load a dialogue file, or every `.json` file in a directory.
fn load_graph(path: &Path) -> Result<DialogueGraph, String> {
    let graph = DialogueGraph::load_path(path).map_err(|e| e.to_string())?;
    if graph.is_empty() {
        return Err(format!("no dialogue nodes found in {}", path.display()));
    }
    debug!(path = %path.display(), nodes = graph.len(), "dialogue graph loaded");
    Ok(graph)
}
