//! Speech engine port: the contract a platform synthesis engine fulfils.
//!
//! # Callback discipline
//!
//! Engines report utterance lifecycle through the [`CallbackSender`] they
//! receive in [`SpeechEngine::initialize`]. For any single utterance id the
//! callbacks are delivered in order and at most one terminal callback
//! (`Done`, `Error`, `Stopped`) is sent. Engines must never invoke the
//! callback channel expecting a synchronous reaction: `speak` and `stop` are
//! called while the controller holds its queue lock, and callbacks are
//! processed later on the controller's own task.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{UtteranceId, VoiceDescriptor, VoiceOptions};
use crate::error::EngineError;

/// Sending half of the engine → controller callback channel.
pub type CallbackSender = mpsc::UnboundedSender<EngineCallback>;

/// Receiving half of the engine → controller callback channel.
pub type CallbackReceiver = mpsc::UnboundedReceiver<EngineCallback>;

/// Replace policy for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitMode {
    /// Append behind anything already submitted.
    #[default]
    Queue,
    /// Interrupt whatever is playing, then start this utterance.
    Flush,
}

/// Static capabilities of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Whether the engine reports progress and can be stopped mid-utterance
    /// and resumed from a char offset. Without it, pause/resume are refused.
    pub supports_pause: bool,
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self {
            supports_pause: true,
        }
    }
}

/// A lifecycle report for one dispatched utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCallback {
    /// The utterance this report is about.
    pub id: UtteranceId,
    /// What happened.
    pub kind: CallbackKind,
}

/// Kinds of engine callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackKind {
    /// Audio started for the submitted segment.
    Started,
    /// The engine is about to speak `char_length` chars starting at
    /// `char_start`, relative to the submitted segment.
    Progress {
        char_start: usize,
        char_length: usize,
    },
    /// The segment finished playing.
    Done,
    /// Synthesis failed.
    Error(String),
    /// Playback was stopped before completion.
    Stopped { interrupted: bool },
}

impl CallbackKind {
    /// Whether this callback ends the utterance's current segment.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_) | Self::Stopped { .. })
    }
}

impl EngineCallback {
    #[must_use]
    pub const fn started(id: UtteranceId) -> Self {
        Self {
            id,
            kind: CallbackKind::Started,
        }
    }

    #[must_use]
    pub const fn progress(id: UtteranceId, char_start: usize, char_length: usize) -> Self {
        Self {
            id,
            kind: CallbackKind::Progress {
                char_start,
                char_length,
            },
        }
    }

    #[must_use]
    pub const fn done(id: UtteranceId) -> Self {
        Self {
            id,
            kind: CallbackKind::Done,
        }
    }

    pub fn error(id: UtteranceId, message: impl Into<String>) -> Self {
        Self {
            id,
            kind: CallbackKind::Error(message.into()),
        }
    }

    #[must_use]
    pub const fn stopped(id: UtteranceId, interrupted: bool) -> Self {
        Self {
            id,
            kind: CallbackKind::Stopped { interrupted },
        }
    }
}

/// Backend-agnostic speech synthesis engine.
///
/// Implementations must be `Send + Sync`: the controller calls them from the
/// caller's context and from its callback task.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Bring the engine up and hand it the callback channel.
    ///
    /// Called once per initialization attempt. A failed attempt may be
    /// followed by another call later.
    async fn initialize(&self, callbacks: CallbackSender) -> Result<(), EngineError>;

    /// Submit a text segment for synthesis. Fire-and-forget: completion is
    /// reported through the callback channel.
    fn speak(
        &self,
        text: &str,
        options: &VoiceOptions,
        id: UtteranceId,
        mode: SubmitMode,
    ) -> Result<(), EngineError>;

    /// Stop the active utterance and drop anything queued. Best effort.
    fn stop(&self);

    /// Make `options` the engine's defaults for later submissions.
    fn apply_defaults(&self, options: &VoiceOptions);

    /// Voices installed on the engine.
    fn voices(&self) -> Result<Vec<VoiceDescriptor>, EngineError>;

    /// Static capabilities.
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::default()
    }
}
