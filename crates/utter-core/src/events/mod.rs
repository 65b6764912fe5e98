//! Caller-facing speech events and the subscription hub.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "progress", "id": 3141592653, "location": 6, "length": 8 }
//! ```

mod hub;

use serde::{Deserialize, Serialize};

pub use hub::{EventHub, Subscription};

/// Event emitted by the speech controller.
///
/// `id` is [`UtteranceId::event_id`](crate::domain::UtteranceId::event_id) of
/// the utterance concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    /// Audio started for an utterance.
    Start { id: u32 },
    /// An utterance finished playing.
    Finish { id: u32 },
    /// Playback paused mid-utterance.
    Pause { id: u32 },
    /// A paused utterance started playing again.
    Resume { id: u32 },
    /// An utterance was stopped explicitly.
    Stopped { id: u32 },
    /// Synthesis failed for an utterance; the queue moved on.
    Error { id: u32 },
    /// The engine is about to speak `length` chars at absolute `location`.
    Progress { id: u32, location: usize, length: usize },
}

impl SpeechEvent {
    /// The channel this event is delivered on.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Finish { .. } => EventKind::Finish,
            Self::Pause { .. } => EventKind::Pause,
            Self::Resume { .. } => EventKind::Resume,
            Self::Stopped { .. } => EventKind::Stopped,
            Self::Error { .. } => EventKind::Error,
            Self::Progress { .. } => EventKind::Progress,
        }
    }

    /// The event id of the utterance concerned.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match *self {
            Self::Start { id }
            | Self::Finish { id }
            | Self::Pause { id }
            | Self::Resume { id }
            | Self::Stopped { id }
            | Self::Error { id }
            | Self::Progress { id, .. } => id,
        }
    }
}

/// Named event channels subscribers can listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Start,
    Finish,
    Pause,
    Resume,
    Stopped,
    Error,
    Progress,
}

impl EventKind {
    /// Every channel, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Start,
        Self::Finish,
        Self::Pause,
        Self::Resume,
        Self::Stopped,
        Self::Error,
        Self::Progress,
    ];

    /// Listener-facing channel name (e.g. `"onStart"`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "onStart",
            Self::Finish => "onFinish",
            Self::Pause => "onPause",
            Self::Resume => "onResume",
            Self::Stopped => "onStopped",
            Self::Error => "onError",
            Self::Progress => "onProgress",
        }
    }
}
