//! Core types for dialogue graphs: nodes, lines, choices, and the graph store.
//!
//! This crate defines the authored data the dialogue engine walks. It is
//! independent of the engine itself: you can build a [`DialogueGraph`]
//! programmatically or load one from the JSON node definition format.

/// Error types used throughout the crate.
pub mod error;
/// The graph store trait and the in-memory indexed graph.
pub mod graph;
/// Dialogue node, line, and choice types.
pub mod node;
/// Per-node validation and graph-wide diagnostics.
pub mod validate;

/// Re-export error types.
pub use error::{GraphError, GraphResult};
/// Re-export graph store types.
pub use graph::{DialogueGraph, GraphStore};
/// Re-export node types.
pub use node::{Choice, DialogueNode, Line, PresentationHints};
/// Re-export diagnostics types.
pub use validate::{GraphIssue, Severity, diagnose};
