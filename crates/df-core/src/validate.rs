//! Graph-wide diagnostics for authored dialogue.
//!
//! The engine validates each node only when it is entered. This pass runs
//! at authoring time instead: it checks every node, every reference between
//! nodes, and optionally which nodes can be reached from the entry points.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::graph::DialogueGraph;
use crate::node::DialogueNode;

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Suspicious authoring that still plays.
    Warning,
    /// The node will fail when entered.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A problem found in a dialogue graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphIssue {
    /// Id of the node where the issue was found.
    pub node: String,
    /// A human-readable description of the issue.
    pub message: String,
    /// How serious the issue is.
    pub severity: Severity,
}

impl GraphIssue {
    fn error(node: &str, message: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    fn warning(node: &str, message: impl Into<String>) -> Self {
        Self {
            node: node.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    /// Whether this issue is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.node, self.message)
    }
}

/// Check every node in the graph.
///
/// When `entries` is non-empty, nodes that cannot be reached from any of
/// them are reported as warnings. Issues are ordered by node id.
pub fn diagnose(graph: &DialogueGraph, entries: &[&str]) -> Vec<GraphIssue> {
    let mut issues = Vec::new();

    for node in graph.nodes() {
        check_node(graph, node, &mut issues);
    }

    for entry in entries {
        if !graph.contains(entry) {
            issues.push(GraphIssue::error(entry, "entry node does not exist"));
        }
    }

    if !entries.is_empty() {
        let reachable = reachable_from(graph, entries);
        for id in graph.ids() {
            if !reachable.contains(id) {
                issues.push(GraphIssue::warning(id, "unreachable from any entry node"));
            }
        }
    }

    issues.sort_by(|a, b| a.node.cmp(&b.node));
    issues
}

fn check_node(graph: &DialogueGraph, node: &DialogueNode, issues: &mut Vec<GraphIssue>) {
    if let Err(e) = node.validate() {
        issues.push(GraphIssue::error(&node.id, e.to_string()));
    }

    for (i, line) in node.lines.iter().enumerate() {
        let delay = line.auto_continue_delay_seconds;
        if line.auto_continue && (!delay.is_finite() || delay < 0.0) {
            issues.push(GraphIssue::warning(
                &node.id,
                format!("line {i} has auto-continue delay {delay}, treated as 0"),
            ));
        }
    }

    for (i, choice) in node.choices.iter().enumerate() {
        if choice.text.trim().is_empty() {
            issues.push(GraphIssue::warning(&node.id, format!("choice {i} has no text")));
        }
        if !choice.ends_conversation() && !graph.contains(&choice.target_node_id) {
            issues.push(GraphIssue::error(
                &node.id,
                format!(
                    "choice {i} targets unknown node \"{}\"",
                    choice.target_node_id
                ),
            ));
        }
    }

    if let Some(next) = &node.default_next_id {
        if !graph.contains(next) {
            issues.push(GraphIssue::error(
                &node.id,
                format!("default next targets unknown node \"{next}\""),
            ));
        }
        if node.ends_conversation {
            issues.push(GraphIssue::warning(
                &node.id,
                "marked as ending the conversation but has a default next node",
            ));
        }
    }
}

/// Breadth-first walk over choice and default-next edges.
fn reachable_from<'a>(graph: &'a DialogueGraph, entries: &[&str]) -> HashSet<&'a str> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut queue: VecDeque<&'a DialogueNode> =
        entries.iter().filter_map(|id| graph.get(id)).collect();

    while let Some(node) = queue.pop_front() {
        if !seen.insert(node.id.as_str()) {
            continue;
        }
        queue.extend(
            node.targets()
                .filter_map(|target| graph.get(target))
                .filter(|next| !seen.contains(next.id.as_str())),
        );
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Choice, Line};

    fn line(text: &str) -> Line {
        Line::new("A", text)
    }

    fn clean_graph() -> DialogueGraph {
        DialogueGraph::from_nodes([
            DialogueNode::new("start")
                .with_line(line("Hi"))
                .with_choice(Choice::new("Loop", "start"))
                .with_choice(Choice::new("Leave", "bye")),
            DialogueNode::new("bye").with_line(line("Bye")).ending(),
        ])
        .unwrap()
    }

    #[test]
    fn clean_graph_has_no_issues() {
        assert!(diagnose(&clean_graph(), &["start"]).is_empty());
    }

    #[test]
    fn invalid_node_reported_as_error() {
        let graph = DialogueGraph::from_nodes([DialogueNode::new("empty")]).unwrap();
        let issues = diagnose(&graph, &[]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(
            issues[0].to_string(),
            "error: empty: invalid dialogue node \"empty\": node has no lines"
        );
    }

    #[test]
    fn dangling_references_reported() {
        let graph = DialogueGraph::from_nodes([DialogueNode::new("a")
            .with_line(line("x"))
            .with_choice(Choice::new("Go", "nowhere"))
            .with_default_next("void")])
        .unwrap();
        let issues = diagnose(&graph, &[]);
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"choice 0 targets unknown node \"nowhere\""));
        assert!(messages.contains(&"default next targets unknown node \"void\""));
        assert!(issues.iter().all(GraphIssue::is_error));
    }

    #[test]
    fn blank_choice_target_is_not_dangling() {
        let graph = DialogueGraph::from_nodes([DialogueNode::new("a")
            .with_line(line("x"))
            .with_choice(Choice::new("Leave", ""))])
        .unwrap();
        assert!(diagnose(&graph, &[]).is_empty());
    }

    #[test]
    fn suspicious_authoring_reported_as_warnings() {
        let graph = DialogueGraph::from_nodes([
            DialogueNode::new("a")
                .with_line(line("x").auto_continue_after(-1.0))
                .with_choice(Choice::new("  ", "b")),
            DialogueNode::new("b")
                .with_line(line("y"))
                .with_default_next("a")
                .ending(),
        ])
        .unwrap();
        let issues = diagnose(&graph, &[]);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn unreachable_nodes_reported_when_entries_given() {
        let mut graph = clean_graph();
        graph
            .insert(DialogueNode::new("orphan").with_line(line("lonely")))
            .unwrap();

        assert!(diagnose(&graph, &[]).is_empty());

        let issues = diagnose(&graph, &["start"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node, "orphan");
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn unknown_entry_reported() {
        let issues = diagnose(&clean_graph(), &["start", "missing"]);
        assert!(issues.iter().any(|i| i.node == "missing" && i.is_error()));
    }
}
