//! Interactive terminal playthrough of a conversation.
//!
//! Input, one command per line: empty to advance, a number to pick that
//! choice, `s` to skip the typewriter, `q` to quit.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;
use std::thread;

use colored::Colorize;
use df_engine::{
    DialogueEngine, DialogueEvent, EngineConfig, EngineError, ManualClock, MemoryFlags, Phase,
};

type EventLog = Rc<RefCell<Vec<DialogueEvent>>>;

pub fn run(
    path: &Path,
    start: &str,
    flags: &[String],
    no_wait: bool,
    speed: f64,
) -> Result<(), String> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(format!("--speed must be a positive number, got {speed}"));
    }
    let graph = super::load_graph(path)?;
    let config = EngineConfig::default().with_delay_scale(1.0 / speed);
    let flags = MemoryFlags::with_flags(flags);
    let mut engine = DialogueEngine::new(graph, flags, ManualClock::new()).with_config(config);

    let log: EventLog = Rc::default();
    let sink = Rc::clone(&log);
    engine.subscribe_all(move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });

    engine.start(start).map_err(|e| e.to_string())?;

    let stdin = io::stdin();
    let mut input = stdin.lock().lines();

    loop {
        render(&log);
        if !engine.is_active() {
            break;
        }

        if let Some(wait) = engine.scheduler().next_due() {
            if !no_wait {
                thread::sleep(wait);
            }
            engine.update(wait).map_err(|e| e.to_string())?;
            continue;
        }

        prompt(engine.phase())?;
        let Some(line) = input.next() else {
            engine.end();
            continue;
        };
        let line = line.map_err(|e| format!("failed to read input: {e}"))?;

        let result = match line.trim() {
            "" => engine.advance(),
            "q" => {
                engine.end();
                Ok(())
            }
            "s" => {
                engine.skip_typewriter();
                Ok(())
            }
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => engine.select_choice(n - 1),
                _ => {
                    println!("  {}", format!("unknown command: {other}").yellow());
                    Ok(())
                }
            },
        };

        match result {
            Ok(()) => {}
            Err(EngineError::InvalidChoiceIndex { available, .. }) => {
                println!("  {}", format!("pick a choice from 1 to {available}").yellow());
            }
            Err(e) => return Err(e.to_string()),
        }
    }

    print_flags(engine.flags());
    Ok(())
}

fn prompt(phase: Phase) -> Result<(), String> {
    let marker = match phase {
        Phase::ChoicesPresented => "choose> ",
        _ => "> ",
    };
    print!("{}", marker.dimmed());
    io::stdout().flush().map_err(|e| e.to_string())
}

fn render(log: &EventLog) {
    for event in log.borrow_mut().drain(..) {
        match event {
            DialogueEvent::DialogueStarted { node } => {
                println!("  {}", format!("--- {} ---", node.id).dimmed());
            }
            DialogueEvent::LineDisplayed { line, .. } => {
                println!("  {}: {}", line.speaker.bold(), line.text);
            }
            DialogueEvent::ChoicesPresented { choices, .. } => {
                for (i, choice) in choices.iter().enumerate() {
                    println!("  {}. {}", i + 1, choice.text.cyan());
                }
            }
            DialogueEvent::TypewriterSkipped => {}
            DialogueEvent::DialogueEnded {
                on_complete_event, ..
            } => {
                println!("  {}", "--- end ---".dimmed());
                if let Some(name) = on_complete_event {
                    println!("  event: {name}");
                }
            }
        }
    }
}

fn print_flags(flags: &MemoryFlags) {
    let set: Vec<&str> = flags
        .iter()
        .filter(|(_, value)| *value)
        .map(|(name, _)| name)
        .collect();
    if set.is_empty() {
        println!("  flags: (none)");
    } else {
        println!("  flags: {}", set.join(", "));
    }
}
