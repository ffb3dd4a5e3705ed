use std::path::Path;

use colored::Colorize;
use df_core::{Severity, diagnose};

pub fn run(path: &Path, entries: &[String]) -> Result<(), String> {
    let graph = super::load_graph(path)?;
    let entries: Vec<&str> = entries.iter().map(String::as_str).collect();

    let issues = diagnose(&graph, &entries);
    for issue in &issues {
        let label = match issue.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        eprintln!("{label}: {}: {}", issue.node.bold(), issue.message);
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    let warnings = issues.len() - errors;
    if errors > 0 {
        return Err(format!("check failed: {errors} error(s), {warnings} warning(s)"));
    }

    println!("  All checks passed for {}.", path.display());
    println!("  {} nodes, {warnings} warning(s)", graph.len());

    Ok(())
}
