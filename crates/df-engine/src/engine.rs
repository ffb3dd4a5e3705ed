//! The dialogue state machine.
//!
//! One [`DialogueEngine`] runs at most one session at a time. A session
//! starts with [`DialogueEngine::start`], moves forward through
//! [`DialogueEngine::advance`] and [`DialogueEngine::select_choice`], and
//! finishes with [`DialogueEngine::end`]. Exactly one `DialogueStarted` /
//! `DialogueEnded` pair brackets each session; hops between nodes inside a
//! session only emit `LineDisplayed` and `ChoicesPresented`.
//!
//! Every transition mutates state first and publishes its event second.
//! Fallible transitions load and validate their target before touching
//! anything, so an error always leaves the engine where it was.

use std::sync::Arc;
use std::time::Duration;

use df_core::{Choice, DialogueNode, GraphStore, Line};
use tracing::{debug, warn};

use crate::clock::{ManualClock, Scheduler, TimerHandle};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::event::{DialogueEvent, EventKind};
use crate::flags::FlagStore;
use crate::notifier::{EventNotifier, HandlerResult, SubscriptionId};

/// Where the engine is in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No conversation is active.
    Idle,
    /// A line has been shown and the engine waits for `advance`.
    WaitingForInput,
    /// Choices have been presented and the engine waits for `select_choice`.
    ChoicesPresented,
}

/// Mutable traversal state for the active conversation.
#[derive(Debug)]
struct Session {
    node: Arc<DialogueNode>,
    line_index: usize,
    phase: Phase,
    choices: Vec<Choice>,
    pending_timer: Option<TimerHandle>,
}

impl Session {
    fn new(node: Arc<DialogueNode>) -> Self {
        Self {
            node,
            line_index: 0,
            phase: Phase::WaitingForInput,
            choices: Vec::new(),
            pending_timer: None,
        }
    }
}

/// Choices whose `requiredFlag` is unset or set, in authored order.
pub fn available_choices(node: &DialogueNode, flags: &impl FlagStore) -> Vec<Choice> {
    node.choices
        .iter()
        .filter(|c| c.required_flag.as_deref().is_none_or(|f| flags.get_flag(f)))
        .cloned()
        .collect()
}

/// Branching dialogue state machine.
///
/// Generic over where nodes come from (`G`), where flags live (`F`), and the
/// clock auto-continue timers are registered against (`S`).
#[derive(Debug)]
pub struct DialogueEngine<G, F, S = ManualClock> {
    graph: G,
    flags: F,
    scheduler: S,
    notifier: EventNotifier,
    config: EngineConfig,
    session: Option<Session>,
}

impl<G, F, S> DialogueEngine<G, F, S>
where
    G: GraphStore,
    F: FlagStore,
    S: Scheduler,
{
    /// Create an idle engine with the default configuration.
    pub fn new(graph: G, flags: F, scheduler: S) -> Self {
        Self {
            graph,
            flags,
            scheduler,
            notifier: EventNotifier::new(),
            config: EngineConfig::default(),
            session: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    // -----------------------------------------------------------------------
    // Collaborators
    // -----------------------------------------------------------------------

    /// The graph store.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// The flag store.
    pub fn flags(&self) -> &F {
        &self.flags
    }

    /// Mutable access to the flag store.
    pub fn flags_mut(&mut self) -> &mut F {
        &mut self.flags
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Mutable access to the scheduler.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable access to the event notifier.
    pub fn notifier_mut(&mut self) -> &mut EventNotifier {
        &mut self.notifier
    }

    /// Subscribe to one kind of event.
    pub fn subscribe<H>(&mut self, kind: EventKind, handler: H) -> SubscriptionId
    where
        H: FnMut(&DialogueEvent) -> HandlerResult + 'static,
    {
        self.notifier.subscribe(kind, handler)
    }

    /// Subscribe to every event.
    pub fn subscribe_all<H>(&mut self, handler: H) -> SubscriptionId
    where
        H: FnMut(&DialogueEvent) -> HandlerResult + 'static,
    {
        self.notifier.subscribe_all(handler)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, |s| s.phase)
    }

    /// Whether a conversation is active.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// True while a line or a set of choices is waiting on the player.
    pub fn is_waiting_for_input(&self) -> bool {
        matches!(
            self.phase(),
            Phase::WaitingForInput | Phase::ChoicesPresented
        )
    }

    /// The node the session is on.
    pub fn current_node(&self) -> Option<&DialogueNode> {
        self.session.as_ref().map(|s| s.node.as_ref())
    }

    /// Index of the current line within the current node.
    pub fn current_line_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.line_index)
    }

    /// The line being shown, if the node's lines are not yet exhausted.
    pub fn current_line(&self) -> Option<&Line> {
        self.session
            .as_ref()
            .and_then(|s| s.node.lines.get(s.line_index))
    }

    /// Choices currently presented. Empty unless in [`Phase::ChoicesPresented`].
    pub fn available_choices(&self) -> &[Choice] {
        match &self.session {
            Some(s) if s.phase == Phase::ChoicesPresented => &s.choices,
            _ => &[],
        }
    }

    /// Fraction of the current node's lines already passed, in `[0, 1]`.
    ///
    /// Zero while idle.
    pub fn get_progress(&self) -> f64 {
        match &self.session {
            Some(s) if !s.node.lines.is_empty() => {
                (s.line_index as f64 / s.node.lines.len() as f64).min(1.0)
            }
            _ => 0.0,
        }
    }

    /// Handle of the pending auto-continue timer, if any.
    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.session.as_ref().and_then(|s| s.pending_timer)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Start a conversation at `node_id`.
    ///
    /// The node is loaded and validated first; on failure nothing changes,
    /// including any session already running. If a session is active it is
    /// ended (emitting its `DialogueEnded`) before the new one begins.
    pub fn start(&mut self, node_id: &str) -> EngineResult<()> {
        let node = self.load_valid(node_id)?;

        if self.session.is_some() {
            warn!(node = %node.id, "dialogue already active, ending it before starting a new one");
            self.end();
        }

        debug!(node = %node.id, "dialogue started");
        self.session = Some(Session::new(Arc::clone(&node)));
        self.notifier
            .publish(&DialogueEvent::DialogueStarted { node });
        self.show_current_line();
        Ok(())
    }

    /// Move past the current line.
    ///
    /// Shows the next line of the node, or once the node is exhausted
    /// presents its available choices, enters its default next node, or
    /// ends the conversation, in that order of preference.
    ///
    /// Idle engines report [`EngineError::NotActive`]. While choices are
    /// presented the call is a no-op.
    pub fn advance(&mut self) -> EngineResult<()> {
        let Some(session) = self.session.as_mut() else {
            warn!("advance called with no active dialogue");
            return Err(EngineError::NotActive);
        };
        if session.phase == Phase::ChoicesPresented {
            warn!(node = %session.node.id, "advance called while choices are pending");
            return Ok(());
        }

        let next_index = session.line_index + 1;
        if next_index < session.node.lines.len() {
            self.cancel_timer();
            if let Some(session) = self.session.as_mut() {
                session.line_index = next_index;
            }
            self.show_current_line();
            return Ok(());
        }

        self.finish_node()
    }

    /// Take one of the presented choices.
    ///
    /// The index refers to [`Self::available_choices`]. The target node is
    /// loaded and validated before the choice's flag is set, so a failed
    /// call changes neither the session nor the flags.
    pub fn select_choice(&mut self, index: usize) -> EngineResult<()> {
        let Some(session) = self.session.as_ref() else {
            warn!(index, "select_choice called with no active dialogue");
            return Err(EngineError::NotActive);
        };
        let available = match session.phase {
            Phase::ChoicesPresented => session.choices.len(),
            _ => 0,
        };
        let Some(choice) = session.choices.get(index).filter(|_| index < available) else {
            warn!(index, available, "invalid choice index");
            return Err(EngineError::InvalidChoiceIndex { index, available });
        };
        let choice = choice.clone();

        let target = if choice.ends_conversation() {
            None
        } else {
            Some(self.load_valid(&choice.target_node_id)?)
        };

        debug!(choice = %choice.text, "choice selected");
        if let Some(flag) = &choice.set_flag {
            debug!(flag = %flag, "story flag set");
            self.flags.set_flag(flag, true);
        }

        match target {
            Some(node) => self.enter_node(node),
            None => self.end(),
        }
        Ok(())
    }

    /// Ask the presentation layer to reveal the current line at once.
    ///
    /// Engine state is unaffected.
    pub fn skip_typewriter(&mut self) {
        self.notifier.publish(&DialogueEvent::TypewriterSkipped);
    }

    /// End the active conversation.
    ///
    /// Cancels any pending timer and emits `DialogueEnded`. Does nothing if
    /// no conversation is active.
    pub fn end(&mut self) {
        self.cancel_timer();
        let Some(session) = self.session.take() else {
            return;
        };

        debug!(node = %session.node.id, "dialogue ended");
        let node = session.node;
        self.notifier.publish(&DialogueEvent::DialogueEnded {
            node_id: node.id.clone(),
            on_complete_event: node.on_complete_event_name.clone(),
        });
    }

    /// Deliver a due timer.
    ///
    /// If `handle` is the session's pending auto-continue timer, this
    /// behaves exactly like [`Self::advance`]. Any other handle is stale and
    /// ignored.
    pub fn fire_timer(&mut self, handle: TimerHandle) -> EngineResult<()> {
        let Some(session) = self.session.as_mut() else {
            debug!(timer = handle.value(), "ignoring timer, no active dialogue");
            return Ok(());
        };
        if session.pending_timer != Some(handle) {
            debug!(timer = handle.value(), "ignoring stale timer");
            return Ok(());
        }

        debug!(timer = handle.value(), "auto-continue timer fired");
        session.pending_timer = None;
        self.advance()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn load_valid(&self, node_id: &str) -> EngineResult<Arc<DialogueNode>> {
        let node = self.graph.load(node_id)?;
        self.graph.validate(&node)?;
        Ok(node)
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.session.as_mut().and_then(|s| s.pending_timer.take()) {
            self.scheduler.cancel(handle);
        }
    }

    /// The current node's lines are exhausted; pick the transition.
    fn finish_node(&mut self) -> EngineResult<()> {
        let Some(session) = self.session.as_ref() else {
            return Err(EngineError::NotActive);
        };
        let node = Arc::clone(&session.node);

        let choices = available_choices(&node, &self.flags);
        if !choices.is_empty() {
            self.cancel_timer();
            if let Some(session) = self.session.as_mut() {
                session.line_index = node.lines.len();
                session.phase = Phase::ChoicesPresented;
                session.choices = choices.clone();
            }
            debug!(node = %node.id, count = choices.len(), "choices presented");
            self.notifier.publish(&DialogueEvent::ChoicesPresented {
                node_id: node.id.clone(),
                choices,
            });
            return Ok(());
        }

        if let Some(next_id) = node.default_next_id.as_deref() {
            let next = self.load_valid(next_id)?;
            self.enter_node(next);
            return Ok(());
        }

        self.end();
        Ok(())
    }

    /// Move the session onto another node without re-emitting `DialogueStarted`.
    fn enter_node(&mut self, node: Arc<DialogueNode>) {
        self.cancel_timer();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        debug!(from = %session.node.id, to = %node.id, "entering node");
        session.node = node;
        session.line_index = 0;
        session.phase = Phase::WaitingForInput;
        session.choices.clear();
        self.show_current_line();
    }

    fn show_current_line(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(line) = session.node.lines.get(session.line_index).cloned() else {
            return;
        };

        session.phase = Phase::WaitingForInput;
        if line.auto_continue && self.config.auto_continue {
            let delay = self.config.scaled_delay(line.auto_continue_delay());
            let handle = self.scheduler.schedule(delay);
            debug!(
                timer = handle.value(),
                delay_ms = delay.as_millis() as u64,
                "auto-continue scheduled"
            );
            session.pending_timer = Some(handle);
        }

        debug!(
            node = %session.node.id,
            index = session.line_index,
            speaker = %line.speaker,
            "line displayed"
        );
        let event = DialogueEvent::LineDisplayed {
            node_id: session.node.id.clone(),
            index: session.line_index,
            line,
        };
        self.notifier.publish(&event);
    }
}

impl<G, F> DialogueEngine<G, F, ManualClock>
where
    G: GraphStore,
    F: FlagStore,
{
    /// Advance the manual clock and deliver any timers that came due.
    ///
    /// Timers scheduled while delivering wait for the next call, so a chain
    /// of zero-delay lines moves one line per update.
    pub fn update(&mut self, elapsed: Duration) -> EngineResult<()> {
        for handle in self.scheduler.advance(elapsed) {
            self.fire_timer(handle)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use df_core::{DialogueGraph, GraphError};

    use super::*;
    use crate::flags::MemoryFlags;

    type Log = Rc<RefCell<Vec<DialogueEvent>>>;
    type TestEngine = DialogueEngine<DialogueGraph, MemoryFlags>;

    fn line(text: &str) -> Line {
        Line::new("Guide", text)
    }

    fn engine(nodes: Vec<DialogueNode>) -> (TestEngine, Log) {
        let graph = DialogueGraph::from_nodes(nodes).unwrap();
        let mut engine = DialogueEngine::new(graph, MemoryFlags::new(), ManualClock::new());
        let log: Log = Rc::default();
        let sink = Rc::clone(&log);
        engine.subscribe_all(move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        (engine, log)
    }

    fn kinds(log: &Log) -> Vec<EventKind> {
        log.borrow().iter().map(DialogueEvent::kind).collect()
    }

    fn count(log: &Log, kind: EventKind) -> usize {
        log.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    fn welcome_graph() -> Vec<DialogueNode> {
        vec![
            DialogueNode::new("welcome")
                .with_line(line("Welcome."))
                .with_line(line("This is the square."))
                .with_line(line("Where to?"))
                .with_choice(Choice::new("Path A", "pathA"))
                .with_choice(Choice::new("Path B", "pathB")),
            DialogueNode::new("pathA")
                .with_line(line("You took path A."))
                .ending()
                .with_on_complete("took_a"),
            DialogueNode::new("pathB")
                .with_line(line("You took path B."))
                .ending(),
        ]
    }

    #[test]
    fn welcome_scenario() {
        let (mut engine, log) = engine(welcome_graph());
        use EventKind::*;

        engine.start("welcome").unwrap();
        assert_eq!(kinds(&log), vec![DialogueStarted, LineDisplayed]);

        engine.advance().unwrap();
        engine.advance().unwrap();
        assert_eq!(engine.phase(), Phase::WaitingForInput);
        engine.advance().unwrap();

        assert_eq!(engine.phase(), Phase::ChoicesPresented);
        assert_eq!(engine.available_choices().len(), 2);
        match log.borrow().last() {
            Some(DialogueEvent::ChoicesPresented { node_id, choices }) => {
                assert_eq!(node_id, "welcome");
                assert_eq!(choices.len(), 2);
            }
            other => panic!("expected ChoicesPresented, got {other:?}"),
        }

        engine.select_choice(0).unwrap();
        match log.borrow().last() {
            Some(DialogueEvent::LineDisplayed { node_id, index, line }) => {
                assert_eq!(node_id, "pathA");
                assert_eq!(*index, 0);
                assert_eq!(line.text, "You took path A.");
            }
            other => panic!("expected LineDisplayed, got {other:?}"),
        }

        engine.advance().unwrap();
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(
            kinds(&log),
            vec![
                DialogueStarted,
                LineDisplayed,
                LineDisplayed,
                LineDisplayed,
                ChoicesPresented,
                LineDisplayed,
                DialogueEnded
            ]
        );
        match log.borrow().last() {
            Some(DialogueEvent::DialogueEnded {
                node_id,
                on_complete_event,
            }) => {
                assert_eq!(node_id, "pathA");
                assert_eq!(on_complete_event.as_deref(), Some("took_a"));
            }
            other => panic!("expected DialogueEnded, got {other:?}"),
        }
    }

    #[test]
    fn progress_tracks_lines() {
        let (mut engine, _) = engine(welcome_graph());
        assert_eq!(engine.get_progress(), 0.0);

        engine.start("welcome").unwrap();
        let mut seen = vec![engine.get_progress()];
        for _ in 0..3 {
            engine.advance().unwrap();
            seen.push(engine.get_progress());
        }

        assert_eq!(seen[0], 0.0);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn waiting_for_input_covers_lines_and_choices() {
        let (mut engine, _) = engine(welcome_graph());
        assert!(!engine.is_waiting_for_input());

        engine.start("welcome").unwrap();
        assert!(engine.is_waiting_for_input());
        for _ in 0..3 {
            engine.advance().unwrap();
        }
        assert!(engine.is_waiting_for_input());

        engine.end();
        assert!(!engine.is_waiting_for_input());
    }

    #[test]
    fn start_unknown_node_is_not_found_and_silent() {
        let (mut engine, log) = engine(welcome_graph());
        let err = engine.start("nowhere").unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn start_empty_node_is_validation_error_and_silent() {
        let (mut engine, log) = engine(vec![DialogueNode::new("empty")]);
        let err = engine.start("empty").unwrap_err();

        assert!(err.is_validation());
        assert!(!engine.is_active());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failed_restart_keeps_running_session() {
        let mut nodes = welcome_graph();
        nodes.push(DialogueNode::new("broken").with_line(line(" ")));
        let (mut engine, log) = engine(nodes);

        engine.start("welcome").unwrap();
        engine.advance().unwrap();
        assert!(engine.start("broken").is_err());

        assert_eq!(engine.current_node().unwrap().id, "welcome");
        assert_eq!(engine.current_line_index(), Some(1));
        assert_eq!(count(&log, EventKind::DialogueEnded), 0);
    }

    #[test]
    fn restart_ends_old_session_exactly_once() {
        let (mut engine, log) = engine(welcome_graph());
        engine.start("welcome").unwrap();
        engine.advance().unwrap();
        log.borrow_mut().clear();

        engine.start("pathB").unwrap();

        assert_eq!(
            kinds(&log),
            vec![
                EventKind::DialogueEnded,
                EventKind::DialogueStarted,
                EventKind::LineDisplayed
            ]
        );
        assert_eq!(engine.current_node().unwrap().id, "pathB");
        assert_eq!(engine.current_line_index(), Some(0));
    }

    #[test]
    fn end_is_idempotent() {
        let (mut engine, log) = engine(welcome_graph());
        engine.start("pathA").unwrap();

        engine.end();
        engine.end();

        assert_eq!(count(&log, EventKind::DialogueEnded), 1);
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.get_progress(), 0.0);
    }

    #[test]
    fn advance_while_idle_is_not_active() {
        let (mut engine, log) = engine(welcome_graph());
        assert!(matches!(engine.advance(), Err(EngineError::NotActive)));
        assert!(matches!(engine.select_choice(0), Err(EngineError::NotActive)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn advance_while_choices_pending_is_noop() {
        let (mut engine, log) = engine(welcome_graph());
        engine.start("welcome").unwrap();
        for _ in 0..3 {
            engine.advance().unwrap();
        }
        let before = log.borrow().len();

        engine.advance().unwrap();

        assert_eq!(log.borrow().len(), before);
        assert_eq!(engine.phase(), Phase::ChoicesPresented);
    }

    #[test]
    fn invalid_choice_index_changes_nothing() {
        let (mut engine, log) = engine(welcome_graph());
        engine.start("welcome").unwrap();
        for _ in 0..3 {
            engine.advance().unwrap();
        }
        let before = log.borrow().len();

        let err = engine.select_choice(2).unwrap_err();

        assert!(matches!(
            err,
            EngineError::InvalidChoiceIndex {
                index: 2,
                available: 2
            }
        ));
        assert_eq!(log.borrow().len(), before);
        assert_eq!(engine.phase(), Phase::ChoicesPresented);
        assert_eq!(engine.available_choices().len(), 2);
    }

    #[test]
    fn select_choice_before_choices_presented_is_rejected() {
        let (mut engine, _) = engine(welcome_graph());
        engine.start("welcome").unwrap();

        let err = engine.select_choice(0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidChoiceIndex { available: 0, .. }
        ));
        assert_eq!(engine.current_line_index(), Some(0));
    }

    #[test]
    fn flag_gated_choice_appears_after_flag_set() {
        let nodes = vec![
            DialogueNode::new("gate")
                .with_line(line("A guard blocks the way."))
                .with_choice(Choice::new("Greet the guard", "greeted").sets("met_guard"))
                .with_choice(Choice::new("Ask for the password", "password").requires("met_guard"))
                .with_choice(Choice::new("Leave", "")),
            DialogueNode::new("greeted")
                .with_line(line("The guard nods."))
                .with_default_next("gate"),
            DialogueNode::new("password").with_line(line("It is 'swordfish'.")),
        ];
        let (mut engine, _) = engine(nodes);

        engine.start("gate").unwrap();
        engine.advance().unwrap();
        let texts: Vec<_> = engine.available_choices().iter().map(|c| c.text.clone()).collect();
        assert_eq!(texts, vec!["Greet the guard", "Leave"]);

        engine.select_choice(0).unwrap();
        assert!(engine.flags().get_flag("met_guard"));
        engine.advance().unwrap();
        assert_eq!(engine.current_node().unwrap().id, "gate");
        engine.advance().unwrap();

        let texts: Vec<_> = engine.available_choices().iter().map(|c| c.text.clone()).collect();
        assert_eq!(texts, vec!["Greet the guard", "Ask for the password", "Leave"]);
    }

    #[test]
    fn blank_target_ends_after_setting_flag() {
        let nodes = vec![DialogueNode::new("farewell")
            .with_line(line("Anything else?"))
            .with_choice(Choice::new("No, goodbye", "").sets("said_goodbye"))];
        let (mut engine, log) = engine(nodes);

        engine.start("farewell").unwrap();
        engine.advance().unwrap();
        engine.select_choice(0).unwrap();

        assert!(engine.flags().get_flag("said_goodbye"));
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(count(&log, EventKind::DialogueEnded), 1);
    }

    #[test]
    fn choice_into_missing_node_leaves_session_and_flags_alone() {
        let nodes = vec![DialogueNode::new("a")
            .with_line(line("Pick."))
            .with_choice(Choice::new("Broken", "missing").sets("took_broken"))];
        let (mut engine, _) = engine(nodes);
        engine.start("a").unwrap();
        engine.advance().unwrap();

        let err = engine.select_choice(0).unwrap_err();

        assert!(matches!(err, EngineError::Graph(GraphError::NotFound(_))));
        assert!(!engine.flags().get_flag("took_broken"));
        assert_eq!(engine.phase(), Phase::ChoicesPresented);
    }

    #[test]
    fn choice_hop_does_not_restart_dialogue() {
        let (mut engine, log) = engine(welcome_graph());
        engine.start("welcome").unwrap();
        for _ in 0..3 {
            engine.advance().unwrap();
        }
        engine.select_choice(1).unwrap();
        engine.advance().unwrap();

        assert_eq!(count(&log, EventKind::DialogueStarted), 1);
        assert_eq!(count(&log, EventKind::DialogueEnded), 1);
    }

    #[test]
    fn default_next_chains_without_restart() {
        let nodes = vec![
            DialogueNode::new("one").with_line(line("One.")).with_default_next("two"),
            DialogueNode::new("two").with_line(line("Two.")),
        ];
        let (mut engine, log) = engine(nodes);

        engine.start("one").unwrap();
        engine.advance().unwrap();
        assert_eq!(engine.current_node().unwrap().id, "two");
        assert_eq!(engine.get_progress(), 0.0);
        engine.advance().unwrap();

        use EventKind::*;
        assert_eq!(
            kinds(&log),
            vec![DialogueStarted, LineDisplayed, LineDisplayed, DialogueEnded]
        );
    }

    #[test]
    fn invalid_default_next_surfaces_when_entered() {
        let nodes = vec![
            DialogueNode::new("one").with_line(line("One.")).with_default_next("broken"),
            DialogueNode::new("broken"),
        ];
        let (mut engine, log) = engine(nodes);

        engine.start("one").unwrap();
        let before = log.borrow().len();
        let err = engine.advance().unwrap_err();

        assert!(err.is_validation());
        assert_eq!(log.borrow().len(), before);
        assert_eq!(engine.current_node().unwrap().id, "one");
        assert_eq!(engine.current_line_index(), Some(0));
        assert_eq!(engine.phase(), Phase::WaitingForInput);
    }

    #[test]
    fn long_chain_completes_iteratively() {
        const LEN: usize = 10_000;
        let nodes: Vec<_> = (0..LEN)
            .map(|i| {
                let node = DialogueNode::new(format!("n{i}")).with_line(line("Onward."));
                if i + 1 < LEN {
                    node.with_default_next(format!("n{}", i + 1))
                } else {
                    node
                }
            })
            .collect();
        let (mut engine, log) = engine(nodes);

        engine.start("n0").unwrap();
        let mut steps = 0;
        while engine.is_active() {
            engine.advance().unwrap();
            steps += 1;
        }

        assert_eq!(steps, LEN);
        assert_eq!(count(&log, EventKind::LineDisplayed), LEN);
        assert_eq!(count(&log, EventKind::DialogueStarted), 1);
        assert_eq!(count(&log, EventKind::DialogueEnded), 1);
    }

    #[test]
    fn cycle_gated_by_flag_terminates() {
        let nodes = vec![
            DialogueNode::new("loop")
                .with_line(line("Again?"))
                .with_choice(Choice::new("Once more", "loop").sets("looped"))
                .with_choice(Choice::new("Done", "done").requires("looped")),
            DialogueNode::new("done").with_line(line("Finally.")),
        ];
        let (mut engine, _) = engine(nodes);

        engine.start("loop").unwrap();
        engine.advance().unwrap();
        assert_eq!(engine.available_choices().len(), 1);
        engine.select_choice(0).unwrap();
        engine.advance().unwrap();
        assert_eq!(engine.available_choices().len(), 2);
        engine.select_choice(1).unwrap();
        engine.advance().unwrap();

        assert!(!engine.is_active());
    }

    #[test]
    fn skip_typewriter_is_only_a_hint() {
        let (mut engine, log) = engine(welcome_graph());
        engine.start("welcome").unwrap();

        engine.skip_typewriter();

        assert_eq!(
            log.borrow().last().map(DialogueEvent::kind),
            Some(EventKind::TypewriterSkipped)
        );
        assert_eq!(engine.phase(), Phase::WaitingForInput);
        assert_eq!(engine.current_line_index(), Some(0));
    }

    #[test]
    fn failing_subscriber_does_not_corrupt_session() {
        let (mut engine, log) = engine(welcome_graph());
        engine.subscribe(EventKind::LineDisplayed, |_| Err("render failed".into()));

        engine.start("welcome").unwrap();
        engine.advance().unwrap();

        assert_eq!(engine.current_line_index(), Some(1));
        assert_eq!(count(&log, EventKind::LineDisplayed), 2);
    }

    // -----------------------------------------------------------------------
    // Auto-continue
    // -----------------------------------------------------------------------

    fn auto_graph() -> Vec<DialogueNode> {
        vec![
            DialogueNode::new("auto")
                .with_line(line("First.").auto_continue_after(2.0))
                .with_line(line("Second."))
                .with_default_next("after"),
            DialogueNode::new("after").with_line(line("After.")),
        ]
    }

    #[test]
    fn auto_continue_fires_after_delay() {
        let (mut engine, _) = engine(auto_graph());
        engine.start("auto").unwrap();
        assert!(engine.pending_timer().is_some());

        engine.update(Duration::from_secs(1)).unwrap();
        assert_eq!(engine.current_line_index(), Some(0));

        engine.update(Duration::from_secs(1)).unwrap();
        assert_eq!(engine.current_line_index(), Some(1));
        assert!(engine.pending_timer().is_none());
    }

    #[test]
    fn manual_advance_cancels_timer() {
        let (mut engine, log) = engine(auto_graph());
        engine.start("auto").unwrap();
        let handle = engine.pending_timer().unwrap();

        engine.advance().unwrap();
        assert!(!engine.scheduler().is_pending(handle));

        let before = log.borrow().len();
        engine.update(Duration::from_secs(5)).unwrap();
        assert_eq!(log.borrow().len(), before);
        assert_eq!(engine.current_line_index(), Some(1));
    }

    #[test]
    fn end_cancels_timer() {
        let (mut engine, _) = engine(auto_graph());
        engine.start("auto").unwrap();

        engine.end();

        assert_eq!(engine.scheduler().pending(), 0);
    }

    #[test]
    fn stale_timer_ignored_after_restart() {
        let (mut engine, log) = engine(auto_graph());
        engine.start("auto").unwrap();
        let stale = engine.pending_timer().unwrap();

        engine.start("after").unwrap();
        let before = log.borrow().len();
        engine.fire_timer(stale).unwrap();

        assert_eq!(log.borrow().len(), before);
        assert_eq!(engine.current_node().unwrap().id, "after");
    }

    #[test]
    fn auto_continue_disabled_by_config() {
        let graph = DialogueGraph::from_nodes(auto_graph()).unwrap();
        let mut engine = DialogueEngine::new(graph, MemoryFlags::new(), ManualClock::new())
            .with_config(EngineConfig::default().with_auto_continue(false));

        engine.start("auto").unwrap();
        assert!(engine.pending_timer().is_none());
        engine.update(Duration::from_secs(10)).unwrap();
        assert_eq!(engine.current_line_index(), Some(0));
    }

    #[test]
    fn delay_scale_shortens_wait() {
        let graph = DialogueGraph::from_nodes(auto_graph()).unwrap();
        let mut engine = DialogueEngine::new(graph, MemoryFlags::new(), ManualClock::new())
            .with_config(EngineConfig::default().with_delay_scale(0.25));

        engine.start("auto").unwrap();
        engine.update(Duration::from_millis(500)).unwrap();
        assert_eq!(engine.current_line_index(), Some(1));
    }

    #[test]
    fn auto_continue_on_last_line_presents_choices() {
        let nodes = vec![
            DialogueNode::new("q")
                .with_line(line("Well?").auto_continue_after(1.0))
                .with_choice(Choice::new("Yes", "end")),
            DialogueNode::new("end").with_line(line("Good.")),
        ];
        let (mut engine, log) = engine(nodes);

        engine.start("q").unwrap();
        engine.update(Duration::from_secs(1)).unwrap();

        assert_eq!(engine.phase(), Phase::ChoicesPresented);
        assert_eq!(count(&log, EventKind::ChoicesPresented), 1);
    }

    #[test]
    fn engine_over_borrowed_collaborators() {
        let graph = DialogueGraph::from_nodes(welcome_graph()).unwrap();
        let mut flags = MemoryFlags::new();
        {
            let mut engine = DialogueEngine::new(&graph, &mut flags, ManualClock::new());
            engine.start("pathA").unwrap();
            engine.flags_mut().set_flag("visited", true);
            engine.advance().unwrap();
        }
        assert!(flags.get_flag("visited"));
    }
}
