use std::fmt;
use std::sync::Arc;

use df_core::{Choice, DialogueNode, Line};

/// Names of the engine lifecycle events, for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A conversation began.
    DialogueStarted,
    /// A line is ready to be shown.
    LineDisplayed,
    /// Choices are ready to be shown.
    ChoicesPresented,
    /// The host asked to reveal the current line at once.
    TypewriterSkipped,
    /// The conversation finished.
    DialogueEnded,
}

impl EventKind {
    /// Every event kind, in the order they can occur.
    pub const ALL: [EventKind; 5] = [
        EventKind::DialogueStarted,
        EventKind::LineDisplayed,
        EventKind::ChoicesPresented,
        EventKind::TypewriterSkipped,
        EventKind::DialogueEnded,
    ];

    /// The event name.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::DialogueStarted => "DialogueStarted",
            EventKind::LineDisplayed => "LineDisplayed",
            EventKind::ChoicesPresented => "ChoicesPresented",
            EventKind::TypewriterSkipped => "TypewriterSkipped",
            EventKind::DialogueEnded => "DialogueEnded",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something the engine did, published after the state change it describes.
///
/// Events carry snapshots so subscribers never need to reach back into the
/// engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueEvent {
    /// A conversation began at `node`.
    DialogueStarted {
        /// The entry node.
        node: Arc<DialogueNode>,
    },
    /// A line is ready to be shown.
    LineDisplayed {
        /// Node the line belongs to.
        node_id: String,
        /// Index of the line within the node.
        index: usize,
        /// The line itself, hints included.
        line: Line,
    },
    /// The node's lines are exhausted and these choices are on offer.
    ChoicesPresented {
        /// Node the choices belong to.
        node_id: String,
        /// Available choices, in authored order.
        choices: Vec<Choice>,
    },
    /// The host asked to reveal the current line at once.
    TypewriterSkipped,
    /// The conversation finished.
    DialogueEnded {
        /// Node the conversation ended on.
        node_id: String,
        /// That node's `onCompleteEventName`, forwarded verbatim.
        on_complete_event: Option<String>,
    },
}

impl DialogueEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            DialogueEvent::DialogueStarted { .. } => EventKind::DialogueStarted,
            DialogueEvent::LineDisplayed { .. } => EventKind::LineDisplayed,
            DialogueEvent::ChoicesPresented { .. } => EventKind::ChoicesPresented,
            DialogueEvent::TypewriterSkipped => EventKind::TypewriterSkipped,
            DialogueEvent::DialogueEnded { .. } => EventKind::DialogueEnded,
        }
    }
}
