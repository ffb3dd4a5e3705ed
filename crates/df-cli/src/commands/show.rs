use std::path::Path;

use colored::Colorize;
use df_core::{Choice, GraphStore, Line};

pub fn run(path: &Path, id: &str) -> Result<(), String> {
    let graph = super::load_graph(path)?;
    let node = graph.load(id).map_err(|e| e.to_string())?;

    println!("  {} [{} line(s)]", node.id.bold(), node.lines.len());
    if let Err(e) = node.validate() {
        println!("  {} {e}", "invalid:".red());
    }
    println!();

    for (i, line) in node.lines.iter().enumerate() {
        print_line(i, line);
    }

    if !node.choices.is_empty() {
        println!();
        println!("  {}", "Choices:".dimmed());
        for (i, choice) in node.choices.iter().enumerate() {
            print_choice(i, choice);
        }
    }

    println!();
    if let Some(next) = &node.default_next_id {
        println!("  next:        {next}");
    }
    if node.ends_conversation {
        println!("  ends conversation");
    }
    if let Some(event) = &node.on_complete_event_name {
        println!("  on complete: {event}");
    }

    Ok(())
}

fn print_line(index: usize, line: &Line) {
    println!("  {index:>2}. {}: {}", line.speaker.bold(), line.text);

    let mut notes = Vec::new();
    if line.auto_continue {
        notes.push(format!("auto-continue after {}s", line.auto_continue_delay_seconds));
    }
    let hints = &line.hints;
    for (name, value) in [
        ("portrait", &hints.portrait_ref),
        ("voice", &hints.voice_ref),
        ("bgm", &hints.bgm_hint),
        ("background", &hints.background_hint),
    ] {
        if let Some(value) = value {
            notes.push(format!("{name} {value}"));
        }
    }
    if !notes.is_empty() {
        println!("      {}", notes.join(", ").dimmed());
    }
}

fn print_choice(index: usize, choice: &Choice) {
    let target = if choice.ends_conversation() {
        "(end)".to_string()
    } else {
        choice.target_node_id.clone()
    };
    let mut line = format!("  {:>2}. {} -> {target}", index + 1, choice.text);
    if let Some(flag) = &choice.required_flag {
        line.push_str(&format!(" [requires {flag}]"));
    }
    if let Some(flag) = &choice.set_flag {
        line.push_str(&format!(" [sets {flag}]"));
    }
    println!("{line}");
}
