use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{GraphError, GraphResult};
use crate::node::DialogueNode;

/// Source of dialogue nodes, looked up by id.
///
/// The engine only ever reads from a store. Nodes are handed out behind an
/// [`Arc`] so a session can hold its current node without borrowing the store.
pub trait GraphStore {
    /// Fetch the node with the given id.
    fn load(&self, id: &str) -> GraphResult<Arc<DialogueNode>>;

    /// Check that a node can be shown. Defaults to [`DialogueNode::validate`].
    fn validate(&self, node: &DialogueNode) -> GraphResult<()> {
        node.validate()
    }
}

impl<T: GraphStore + ?Sized> GraphStore for &T {
    fn load(&self, id: &str) -> GraphResult<Arc<DialogueNode>> {
        (**self).load(id)
    }

    fn validate(&self, node: &DialogueNode) -> GraphResult<()> {
        (**self).validate(node)
    }
}

/// An in-memory, immutable-once-built index of dialogue nodes.
#[derive(Debug, Clone, Default)]
pub struct DialogueGraph {
    nodes: HashMap<String, Arc<DialogueNode>>,
}

/// A definition file holds either one node or a list of nodes.
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeFile {
    Many(Vec<DialogueNode>),
    One(Box<DialogueNode>),
}

impl DialogueGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from nodes, rejecting duplicate ids.
    pub fn from_nodes(nodes: impl IntoIterator<Item = DialogueNode>) -> GraphResult<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert(node)?;
        }
        Ok(graph)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Parse a JSON document holding a node object or an array of nodes.
    pub fn from_json_str(json: &str) -> GraphResult<Self> {
        let mut graph = Self::new();
        graph.extend_from_json(json, "<input>")?;
        Ok(graph)
    }

    /// Load every node from a single JSON file.
    pub fn from_file(path: &Path) -> GraphResult<Self> {
        let mut graph = Self::new();
        graph.extend_from_file(path)?;
        Ok(graph)
    }

    /// Load every `*.json` file in a directory, in file-name order.
    pub fn from_dir(dir: &Path) -> GraphResult<Self> {
        let io_err = |source| GraphError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut graph = Self::new();
        for file in files {
            graph.extend_from_file(&file)?;
        }
        Ok(graph)
    }

    /// Load from a file or, if `path` is a directory, from every file in it.
    pub fn load_path(path: &Path) -> GraphResult<Self> {
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_file(path)
        }
    }

    fn extend_from_file(&mut self, path: &Path) -> GraphResult<()> {
        let json = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.extend_from_json(&json, &path.display().to_string())
    }

    fn extend_from_json(&mut self, json: &str, source_name: &str) -> GraphResult<()> {
        let file: NodeFile = serde_json::from_str(json).map_err(|source| GraphError::Parse {
            source_name: source_name.to_string(),
            source,
        })?;
        match file {
            NodeFile::Many(nodes) => {
                for node in nodes {
                    self.insert(node)?;
                }
            }
            NodeFile::One(node) => self.insert(*node)?,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    /// Add a node. Fails if a node with the same id already exists.
    pub fn insert(&mut self, node: DialogueNode) -> GraphResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.insert(node.id.clone(), Arc::new(node));
        Ok(())
    }

    /// Get a node by id.
    pub fn get(&self, id: &str) -> Option<&DialogueNode> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All node ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// All nodes, sorted by id.
    pub fn nodes(&self) -> Vec<&DialogueNode> {
        let mut nodes: Vec<&DialogueNode> = self.nodes.values().map(Arc::as_ref).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl GraphStore for DialogueGraph {
    fn load(&self, id: &str) -> GraphResult<Arc<DialogueNode>> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }
}
