//! Dialogue nodes, lines, and choices.
//!
//! These types mirror the JSON node definition format one-to-one. Field
//! names are camelCase on the wire; optional fields may be omitted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// One authored unit of dialogue: lines, choices, and a transition rule.
///
/// Nodes are immutable once loaded into a graph. They reference each other
/// by id through [`Choice::target_node_id`] and [`DialogueNode::default_next_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueNode {
    /// Unique identifier for this node.
    pub id: String,
    /// Lines shown in order. Must be non-empty.
    pub lines: Vec<Line>,
    /// Player choices offered once the last line has been shown.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Node entered automatically when no choice is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_next_id: Option<String>,
    /// Authoring marker for nodes that close a conversation.
    #[serde(default)]
    pub ends_conversation: bool,
    /// Opaque tag forwarded to the host when the conversation ends here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_complete_event_name: Option<String>,
}

impl DialogueNode {
    /// Create an empty node with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lines: Vec::new(),
            choices: Vec::new(),
            default_next_id: None,
            ends_conversation: false,
            on_complete_event_name: None,
        }
    }

    /// Add a line.
    pub fn with_line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }

    /// Add a choice.
    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Set the default next node.
    pub fn with_default_next(mut self, node_id: impl Into<String>) -> Self {
        self.default_next_id = Some(node_id.into());
        self
    }

    /// Mark this node as ending the conversation.
    pub fn ending(mut self) -> Self {
        self.ends_conversation = true;
        self
    }

    /// Set the completion event tag.
    pub fn with_on_complete(mut self, event_name: impl Into<String>) -> Self {
        self.on_complete_event_name = Some(event_name.into());
        self
    }

    /// Check that the node can be shown.
    ///
    /// Fails if the id is blank, there are no lines, or any line has blank text.
    pub fn validate(&self) -> GraphResult<()> {
        if self.id.trim().is_empty() {
            return Err(GraphError::validation(&self.id, "node id is empty"));
        }
        if self.lines.is_empty() {
            return Err(GraphError::validation(&self.id, "node has no lines"));
        }
        if let Some(index) = self.lines.iter().position(|l| l.text.trim().is_empty()) {
            return Err(GraphError::validation(
                &self.id,
                format!("line {index} has empty text"),
            ));
        }
        Ok(())
    }

    /// Ids of every node this node can transition to, in authored order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .map(|c| c.target_node_id.as_str())
            .filter(|id| !id.trim().is_empty())
            .chain(self.default_next_id.as_deref())
    }
}

/// One piece of spoken or narrated text within a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// Who says the line.
    #[serde(default = "default_speaker")]
    pub speaker: String,
    /// The line text. Must not be blank.
    pub text: String,
    /// Characters per second for the typewriter effect.
    #[serde(default = "default_typewriter_speed")]
    pub typewriter_speed: f64,
    /// Advance to the next step automatically after a delay.
    #[serde(default)]
    pub auto_continue: bool,
    /// Delay before auto-continuing, in seconds.
    #[serde(default = "default_auto_continue_delay")]
    pub auto_continue_delay_seconds: f64,
    /// Presentation hints, forwarded verbatim.
    #[serde(flatten)]
    pub hints: PresentationHints,
}

fn default_speaker() -> String {
    "Narrator".to_string()
}

fn default_typewriter_speed() -> f64 {
    30.0
}

fn default_auto_continue_delay() -> f64 {
    2.0
}

impl Line {
    /// Create a line with default presentation settings.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            typewriter_speed: default_typewriter_speed(),
            auto_continue: false,
            auto_continue_delay_seconds: default_auto_continue_delay(),
            hints: PresentationHints::default(),
        }
    }

    /// Auto-continue after the given number of seconds.
    pub fn auto_continue_after(mut self, seconds: f64) -> Self {
        self.auto_continue = true;
        self.auto_continue_delay_seconds = seconds;
        self
    }

    /// Set the presentation hints.
    pub fn with_hints(mut self, hints: PresentationHints) -> Self {
        self.hints = hints;
        self
    }

    /// The auto-continue delay as a duration.
    ///
    /// Negative, NaN, or overflowing values collapse to zero.
    pub fn auto_continue_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.auto_continue_delay_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Presentation hints the engine stores and forwards but never inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationHints {
    /// Portrait or sprite reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait_ref: Option<String>,
    /// Voice clip reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_ref: Option<String>,
    /// Background music hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm_hint: Option<String>,
    /// Background image hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_hint: Option<String>,
}

/// A player-selectable branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// The text shown to the player.
    pub text: String,
    /// Node entered when this choice is taken. Blank ends the conversation.
    pub target_node_id: String,
    /// Flag that must be set for the choice to be offered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_flag: Option<String>,
    /// Flag set to `true` when the choice is taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_flag: Option<String>,
}

impl Choice {
    /// Create an ungated choice leading to `target`.
    pub fn new(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_node_id: target.into(),
            required_flag: None,
            set_flag: None,
        }
    }

    /// Only offer this choice when `flag` is set.
    pub fn requires(mut self, flag: impl Into<String>) -> Self {
        self.required_flag = Some(flag.into());
        self
    }

    /// Set `flag` when this choice is taken.
    pub fn sets(mut self, flag: impl Into<String>) -> Self {
        self.set_flag = Some(flag.into());
        self
    }

    /// Whether taking this choice ends the conversation instead of moving on.
    pub fn ends_conversation(&self) -> bool {
        self.target_node_id.trim().is_empty()
    }
}
