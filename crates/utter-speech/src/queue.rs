//! Utterance queue: the state machine behind `speak`, `pause`, `resume`, `stop`.
//!
//! Per-utterance transitions:
//!
//! ```text
//!   Pending ──onStarted──► Speaking ──onDone──────────────► Completed
//!                             │      ──onError─────────────► Error
//!                             │      ──onStopped (stop)────► Completed
//!                             └──────onStopped (pause)─────► Paused
//!   Paused ──resume (flush tail from `position`)──► Speaking
//! ```
//!
//! All state sits behind one mutex. Each public method locks it once and
//! passes the `&mut QueueState` down to the private helpers, so advancing to
//! the next utterance after a terminal callback happens inside the same
//! critical section without re-locking.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use utter_core::{
    CallbackKind, EngineCallback, QueueSnapshot, SpeechEngine, SpeechEvent, SubmitMode,
    UtteranceId, UtteranceSnapshot, UtteranceStatus, VoiceOptions,
};

use crate::resolver;

/// One queued utterance. Never leaves the lock; callers get snapshots.
#[derive(Debug)]
struct UtteranceItem {
    id: UtteranceId,
    text: String,
    /// Length of `text` in chars; all offsets are char offsets.
    char_len: usize,
    options: VoiceOptions,
    /// Last spoken char offset reported by the engine.
    position: usize,
    /// Char offset where the dispatched segment begins.
    offset: usize,
    status: UtteranceStatus,
}

impl UtteranceItem {
    fn new(text: String, options: VoiceOptions) -> Self {
        Self {
            id: UtteranceId::new(),
            char_len: text.chars().count(),
            text,
            options,
            position: 0,
            offset: 0,
            status: UtteranceStatus::Pending,
        }
    }

    /// The part of `text` still to be spoken when resuming.
    fn tail(&self) -> &str {
        self.text
            .char_indices()
            .nth(self.offset)
            .map_or("", |(byte, _)| &self.text[byte..])
    }

    fn snapshot(&self) -> UtteranceSnapshot {
        UtteranceSnapshot {
            id: self.id,
            event_id: self.id.event_id(),
            text: self.text.clone(),
            options: self.options.clone(),
            status: self.status,
            offset: self.offset,
            position: self.position,
        }
    }
}

#[derive(Debug)]
struct QueueState {
    items: Vec<UtteranceItem>,
    /// Index of the utterance speaking or about to speak. `None` when idle.
    cursor: Option<usize>,
    /// Playback is paused; nothing is dispatched until `resume`.
    paused: bool,
    /// A pause was requested; the next `Stopped` for the cursor item parks it.
    pause_requested: bool,
    /// The next `Started` belongs to a resumed utterance.
    resuming: bool,
    global: VoiceOptions,
}

impl QueueState {
    fn index_of(&self, id: UtteranceId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
        self.paused = false;
        self.pause_requested = false;
        self.resuming = false;
    }
}

/// Owner of the utterance queue, cursor, and global options.
pub(crate) struct SpeechQueue {
    state: Mutex<QueueState>,
    engine: Arc<dyn SpeechEngine>,
    events: mpsc::UnboundedSender<SpeechEvent>,
    supports_pause: bool,
}

impl SpeechQueue {
    pub(crate) fn new(
        engine: Arc<dyn SpeechEngine>,
        events: mpsc::UnboundedSender<SpeechEvent>,
        global: VoiceOptions,
    ) -> Self {
        let supports_pause = engine.capabilities().supports_pause;
        Self {
            state: Mutex::new(QueueState {
                items: Vec::new(),
                cursor: None,
                paused: false,
                pause_requested: false,
                resuming: false,
                global,
            }),
            engine,
            events,
            supports_pause,
        }
    }

    // ── Caller operations ──────────────────────────────────────────

    /// Append an utterance; dispatch it at once if nothing is active.
    pub(crate) fn enqueue(&self, text: String, options: VoiceOptions) -> UtteranceId {
        let mut state = self.lock();
        let item = UtteranceItem::new(text, options);
        let id = item.id;
        state.items.push(item);
        let index = state.items.len() - 1;
        debug!(%id, index, "Enqueued utterance");

        if state.cursor.is_none() && !state.paused && !state.pause_requested {
            state.cursor = Some(index);
            self.process_next(&mut state);
        }
        id
    }

    /// Request a pause of the utterance under the cursor.
    ///
    /// Returns `false` (and does nothing) if the engine cannot pause, nothing
    /// is speaking, or a pause is already requested or in effect.
    ///
    /// The cursor item must have reported `Started`. A submitted item that
    /// has not started gets no `Stopped` from the engine once its queued
    /// job is dropped, so the request would never resolve.
    pub(crate) fn pause(&self) -> bool {
        if !self.supports_pause {
            debug!("Pause refused: engine cannot pause mid-utterance");
            return false;
        }

        let mut state = self.lock();
        if state.items.is_empty() || state.paused || state.pause_requested {
            return false;
        }
        let speaking = state
            .cursor
            .and_then(|index| state.items.get(index))
            .is_some_and(|item| item.status == UtteranceStatus::Speaking);
        if !speaking {
            return false;
        }

        state.pause_requested = true;
        self.engine.stop();
        debug!(cursor = ?state.cursor, "Pause requested");
        true
    }

    /// Resume the paused utterance from its last spoken position.
    ///
    /// Returns whether a resumable utterance was found.
    pub(crate) fn resume(&self) -> bool {
        if !self.supports_pause {
            debug!("Resume refused: engine cannot pause mid-utterance");
            return false;
        }

        let mut state = self.lock();
        let Some(cursor) = state.cursor else {
            return false;
        };
        if !state.paused || state.items.is_empty() {
            return false;
        }

        let at_cursor = |status| state.items.get(cursor).is_some_and(|item| item.status == status);
        let target = if at_cursor(UtteranceStatus::Paused) {
            Some(cursor)
        } else {
            state
                .items
                .iter()
                .position(|item| item.status == UtteranceStatus::Paused)
                .or_else(|| at_cursor(UtteranceStatus::Pending).then_some(cursor))
        };

        let Some(index) = target else {
            debug!(cursor, "Nothing to resume; returning to idle");
            state.paused = false;
            state.cursor = None;
            return false;
        };

        state.cursor = Some(index);
        state.paused = false;
        state.resuming = true;
        debug!(index, "Resuming");
        self.process_next(&mut state);
        true
    }

    /// Stop everything and clear the queue.
    pub(crate) fn stop(&self) {
        let mut state = self.lock();
        let active = state.cursor.is_some() || state.paused || state.pause_requested;
        if !active {
            state.clear();
            return;
        }

        self.engine.stop();
        let interrupted = state
            .cursor
            .and_then(|index| state.items.get(index))
            .filter(|item| !item.status.is_terminal())
            .map(|item| item.id);
        if let Some(id) = interrupted {
            self.emit(SpeechEvent::Stopped { id: id.event_id() });
        }

        info!(dropped = state.items.len(), "Stopped; clearing queue");
        state.clear();
    }

    /// Speaking or paused.
    pub(crate) fn is_speaking(&self) -> bool {
        let state = self.lock();
        state.cursor.is_some() || state.paused
    }

    // ── Global options ─────────────────────────────────────────────

    /// Merge validated options into the globals and push them to the engine.
    pub(crate) fn merge_global(&self, options: &VoiceOptions) {
        let mut state = self.lock();
        state.global = state.global.overlaid_with(options);
        self.engine.apply_defaults(&state.global);
    }

    /// Replace the globals wholesale and push them to the engine.
    pub(crate) fn replace_global(&self, options: VoiceOptions) {
        let mut state = self.lock();
        state.global = options;
        self.engine.apply_defaults(&state.global);
    }

    /// Push the current globals to the engine.
    pub(crate) fn apply_global(&self) {
        let state = self.lock();
        self.engine.apply_defaults(&state.global);
    }

    pub(crate) fn global(&self) -> VoiceOptions {
        self.lock().global.clone()
    }

    pub(crate) fn snapshot(&self) -> QueueSnapshot {
        let state = self.lock();
        QueueSnapshot {
            items: state.items.iter().map(UtteranceItem::snapshot).collect(),
            cursor: state.cursor,
            paused: state.paused,
        }
    }

    // ── Engine callbacks ───────────────────────────────────────────

    /// Apply one engine callback. Runs on the controller's callback task.
    pub(crate) fn handle_callback(&self, callback: EngineCallback) {
        let mut state = self.lock();
        let Some(index) = state.index_of(callback.id) else {
            debug!(id = %callback.id, kind = ?callback.kind, "Ignoring callback for unknown utterance");
            return;
        };
        if state.items[index].status.is_terminal() {
            warn!(id = %callback.id, kind = ?callback.kind, "Ignoring callback for finished utterance");
            return;
        }

        match callback.kind {
            CallbackKind::Started => self.on_started(&mut state, index),
            CallbackKind::Progress {
                char_start,
                char_length,
            } => self.on_progress(&mut state, index, char_start, char_length),
            CallbackKind::Done => self.on_finished(&mut state, index, UtteranceStatus::Completed),
            CallbackKind::Error(message) => {
                warn!(id = %callback.id, %message, "Synthesis failed");
                self.on_finished(&mut state, index, UtteranceStatus::Error);
            }
            CallbackKind::Stopped { interrupted } => self.on_stopped(&mut state, index, interrupted),
        }
    }

    fn on_started(&self, state: &mut QueueState, index: usize) {
        let item = &mut state.items[index];
        item.status = UtteranceStatus::Speaking;
        let id = item.id.event_id();

        if state.resuming {
            state.resuming = false;
            self.emit(SpeechEvent::Resume { id });
        } else {
            self.emit(SpeechEvent::Start { id });
        }
    }

    fn on_progress(&self, state: &mut QueueState, index: usize, start: usize, length: usize) {
        let item = &mut state.items[index];
        if !matches!(item.status, UtteranceStatus::Speaking | UtteranceStatus::Pending) {
            return;
        }
        item.position = (item.offset + start).min(item.char_len);
        trace!(id = %item.id, position = item.position, length, "Progress");
        self.emit(SpeechEvent::Progress {
            id: item.id.event_id(),
            location: item.position,
            length,
        });
    }

    /// `Done` and `Error`: mark terminal, emit, and advance.
    fn on_finished(&self, state: &mut QueueState, index: usize, status: UtteranceStatus) {
        let item = &mut state.items[index];
        item.status = status;
        let id = item.id.event_id();
        if status == UtteranceStatus::Completed {
            item.position = item.char_len;
            self.emit(SpeechEvent::Finish { id });
        } else {
            self.emit(SpeechEvent::Error { id });
        }

        if state.cursor != Some(index) || state.paused {
            return;
        }

        let next = index + 1;
        if state.pause_requested {
            // The pause landed on an utterance boundary: hold before `next`.
            state.pause_requested = false;
            state.resuming = false;
            if next < state.items.len() {
                state.paused = true;
                state.cursor = Some(next);
                self.emit(SpeechEvent::Pause { id });
            } else {
                state.cursor = None;
            }
            return;
        }

        state.cursor = Some(next);
        self.process_next(state);
    }

    fn on_stopped(&self, state: &mut QueueState, index: usize, interrupted: bool) {
        let is_current = state.cursor == Some(index);
        let item = &mut state.items[index];
        let id = item.id.event_id();

        if state.pause_requested && is_current {
            item.status = UtteranceStatus::Paused;
            state.pause_requested = false;
            state.paused = true;
            debug!(id = %item.id, position = item.position, "Paused");
            self.emit(SpeechEvent::Pause { id });
        } else {
            item.status = UtteranceStatus::Completed;
            debug!(id = %item.id, interrupted, "Stopped");
            self.emit(SpeechEvent::Stopped { id });
            if is_current && !state.paused {
                state.cursor = Some(index + 1);
                self.process_next(state);
            }
        }
    }

    // ── Dispatch ───────────────────────────────────────────────────

    /// Hand the utterance under the cursor to the engine.
    ///
    /// Skips entries that are neither `Pending` nor `Paused`. A `Paused`
    /// entry is resumed by flushing the tail of its text from `position`;
    /// anything else is queued whole. Submission failures mark the entry
    /// `Error` and move on.
    fn process_next(&self, state: &mut QueueState) {
        loop {
            let Some(index) = state.cursor else {
                return;
            };
            let Some(item) = state.items.get(index) else {
                debug!("Queue drained");
                state.cursor = None;
                state.resuming = false;
                return;
            };
            if !item.status.is_dispatchable() {
                debug!(index, status = ?item.status, "Skipping non-dispatchable utterance");
                state.cursor = Some(index + 1);
                continue;
            }

            let is_last = index + 1 == state.items.len();
            let effective = resolver::resolve(&state.global, &item.options);
            let item = &mut state.items[index];

            let mode = if item.status == UtteranceStatus::Paused {
                item.offset = item.position;
                SubmitMode::Flush
            } else {
                item.offset = 0;
                SubmitMode::Queue
            };
            let segment = if mode == SubmitMode::Flush {
                item.tail()
            } else {
                item.text.as_str()
            };

            debug!(id = %item.id, index, offset = item.offset, ?mode, "Dispatching utterance");
            match self.engine.speak(segment, &effective, item.id, mode) {
                Ok(()) => {
                    if is_last {
                        self.engine.apply_defaults(&state.global);
                    }
                    return;
                }
                Err(e) => {
                    warn!(id = %item.id, error = %e, "Engine rejected utterance; skipping");
                    item.status = UtteranceStatus::Error;
                    let id = item.id.event_id();
                    state.resuming = false;
                    self.emit(SpeechEvent::Error { id });
                    state.cursor = Some(index + 1);
                }
            }
        }
    }

    /// Queue an event for the bridge task. Called with the lock held so the
    /// channel order matches the order of transitions.
    fn emit(&self, event: SpeechEvent) {
        if self.events.send(event).is_err() {
            warn!("Speech event receiver dropped");
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
