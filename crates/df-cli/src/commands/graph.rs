use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use df_core::DialogueGraph;

pub fn run(path: &Path) -> Result<(), String> {
    let graph = super::load_graph(path)?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["From", "Kind", "To", "Gate"]);

    let edges = edges(&graph);
    for edge in &edges {
        table.add_row(vec![edge.from, edge.kind.as_str(), edge.to.as_str(), edge.gate.as_str()]);
    }

    println!("{table}");
    println!();
    println!("  {} nodes, {} edges", graph.len(), edges.len());

    Ok(())
}

struct Edge<'a> {
    from: &'a str,
    kind: String,
    to: String,
    gate: String,
}

fn edges(graph: &DialogueGraph) -> Vec<Edge<'_>> {
    let mut edges = Vec::new();

    for node in graph.nodes() {
        for (i, choice) in node.choices.iter().enumerate() {
            let to = if choice.ends_conversation() {
                "(end)".to_string()
            } else if graph.contains(&choice.target_node_id) {
                choice.target_node_id.clone()
            } else {
                format!("{} (missing)", choice.target_node_id)
            };
            let gate = match (&choice.required_flag, &choice.set_flag) {
                (Some(req), Some(set)) => format!("requires {req}, sets {set}"),
                (Some(req), None) => format!("requires {req}"),
                (None, Some(set)) => format!("sets {set}"),
                (None, None) => String::new(),
            };
            edges.push(Edge {
                from: &node.id,
                kind: format!("choice {}", i + 1),
                to,
                gate,
            });
        }

        if let Some(next) = &node.default_next_id {
            let to = if graph.contains(next) {
                next.clone()
            } else {
                format!("{next} (missing)")
            };
            edges.push(Edge {
                from: &node.id,
                kind: "next".to_string(),
                to,
                gate: String::new(),
            });
        }
    }

    edges
}
