//! Utterance identity, status, and copy-out snapshots of the speech queue.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::options::VoiceOptions;

/// Opaque identifier correlating engine callbacks with queue entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(Uuid);

impl UtteranceId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Numeric id carried by caller-facing events.
    ///
    /// Folds the 128-bit UUID down to 32 bits. Stable for a given utterance,
    /// not unique across process restarts.
    #[must_use]
    pub const fn event_id(&self) -> u32 {
        let (hi, lo) = self.0.as_u64_pair();
        let folded = hi ^ lo;
        #[allow(clippy::cast_possible_truncation)]
        let id = (folded ^ (folded >> 32)) as u32;
        id
    }
}

impl Default for UtteranceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a single queued utterance.
///
/// ```text
///   Pending → Speaking → Completed
///                │  ▲      (or Error)
///                ▼  │
///               Paused
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtteranceStatus {
    /// Enqueued, waiting for (or submitted and awaiting) its start callback.
    Pending,
    /// The engine reported that audio started.
    Speaking,
    /// Stopped mid-utterance by a pause request; `position` is preserved.
    Paused,
    /// Finished, or interrupted by an explicit stop.
    Completed,
    /// The engine reported a synthesis failure.
    Error,
}

impl UtteranceStatus {
    /// Whether the status is final for this utterance.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether the dispatcher may hand the utterance to the engine.
    #[must_use]
    pub const fn is_dispatchable(self) -> bool {
        matches!(self, Self::Pending | Self::Paused)
    }
}

/// Copy of one queue entry, detached from the controller's lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceSnapshot {
    /// Internal identifier.
    pub id: UtteranceId,
    /// Numeric id used on the event channel.
    pub event_id: u32,
    /// The text as enqueued.
    pub text: String,
    /// Per-utterance option overrides.
    pub options: VoiceOptions,
    /// Current status.
    pub status: UtteranceStatus,
    /// Char offset where the current playback segment begins.
    pub offset: usize,
    /// Last spoken char offset reported by the engine.
    pub position: usize,
}

/// Copy of the whole queue for inspection and UI display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    /// Entries in speaking order, including finished ones not yet cleared.
    pub items: Vec<UtteranceSnapshot>,
    /// Index of the active entry; `None` when idle.
    pub cursor: Option<usize>,
    /// Whether playback is paused.
    pub paused: bool,
}

impl QueueSnapshot {
    /// Check if the queue is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the total number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Get an entry by its id.
    pub fn get(&self, id: UtteranceId) -> Option<&UtteranceSnapshot> {
        self.items.iter().find(|item| item.id == id)
    }

    /// The entry under the cursor, if any.
    pub fn current(&self) -> Option<&UtteranceSnapshot> {
        self.cursor.and_then(|index| self.items.get(index))
    }
}
