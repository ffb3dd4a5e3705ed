//! Dialogue flow engine: a state machine over authored dialogue graphs.
//!
//! [`DialogueEngine`] walks the nodes of a [`df_core::GraphStore`], emits
//! presentation-neutral [`DialogueEvent`]s for each step, gates choices
//! behind flags from a host-supplied [`FlagStore`], and schedules
//! auto-continue timers against a host-supplied [`Scheduler`]. It renders
//! nothing and owns no assets; the host decides how events are shown.

/// Host clock abstraction and a manually driven tick source.
pub mod clock;
/// Engine configuration.
pub mod config;
/// The dialogue state machine.
pub mod engine;
/// Error types for the engine.
pub mod error;
/// Engine lifecycle events.
pub mod event;
/// Story flag storage.
pub mod flags;
/// Ordered publish/subscribe for engine events.
pub mod notifier;

/// Re-exports of [`clock::ManualClock`], [`clock::Scheduler`], and [`clock::TimerHandle`].
pub use clock::{ManualClock, Scheduler, TimerHandle};
/// Re-export of [`config::EngineConfig`].
pub use config::EngineConfig;
/// Re-exports of [`engine::DialogueEngine`] and [`engine::Phase`].
pub use engine::{DialogueEngine, Phase};
/// Re-exports of [`error::EngineError`] and [`error::EngineResult`].
pub use error::{EngineError, EngineResult};
/// Re-exports of [`event::DialogueEvent`] and [`event::EventKind`].
pub use event::{DialogueEvent, EventKind};
/// Re-exports of [`flags::FlagStore`] and [`flags::MemoryFlags`].
pub use flags::{FlagStore, MemoryFlags};
/// Re-exports of notifier types.
pub use notifier::{EventNotifier, HandlerError, HandlerResult, SubscriptionId};
