//! `SpeechController`: the caller-facing facade.
//!
//! Wires a [`SpeechEngine`] to the lifecycle gate, the utterance queue, and
//! the event hub:
//!
//! ```text
//!   caller ──► LifecycleManager::ensure_ready ──► SpeechQueue ──► engine.speak
//!                                                     ▲              │
//!   EventHub ◄── event bridge ◄── events channel ◄────┤              │
//!                                                     └── callback pump ◄─┘
//! ```
//!
//! Two background tasks run for the controller's lifetime: the callback pump
//! feeds engine callbacks into the queue, and the event bridge forwards the
//! queue's events to subscribers. Subscriber code therefore never runs under
//! the queue lock. Both tasks are aborted when the controller is dropped.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use utter_core::{
    CallbackReceiver, EventHub, EventKind, QueueSnapshot, SpeechEngine, SpeechError, SpeechEvent,
    Subscription, UtteranceId, VoiceDescriptor, VoiceOptions,
};

use crate::config::ControllerConfig;
use crate::lifecycle::{LifecycleManager, LifecycleState};
use crate::queue::SpeechQueue;
use crate::{resolver, voices};

/// Speech utterance queue controller.
pub struct SpeechController {
    queue: Arc<SpeechQueue>,
    lifecycle: Arc<LifecycleManager>,
    engine: Arc<dyn SpeechEngine>,
    hub: EventHub,
    config: ControllerConfig,
    tasks: Vec<JoinHandle<()>>,
}

impl SpeechController {
    /// Create a controller around `engine`.
    ///
    /// The engine is not initialized until the first operation (or
    /// [`warm_up`](Self::warm_up)). Must be called from within a Tokio
    /// runtime: the callback pump and event bridge are spawned here.
    pub fn new(engine: Arc<dyn SpeechEngine>, config: ControllerConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (callback_tx, callback_rx) = mpsc::unbounded_channel();

        let global = resolver::validate(config.defaults.clone());
        let queue = Arc::new(SpeechQueue::new(Arc::clone(&engine), event_tx, global));

        let ready_queue = Arc::clone(&queue);
        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::clone(&engine),
            callback_tx,
            move || ready_queue.apply_global(),
        ));

        let hub = EventHub::new();
        let tasks = vec![
            spawn_callback_pump(callback_rx, Arc::clone(&queue)),
            spawn_event_bridge(event_rx, hub.clone()),
        ];

        debug!(supports_pause = engine.capabilities().supports_pause, "Speech controller created");
        Self {
            queue,
            lifecycle,
            engine,
            hub,
            config,
            tasks,
        }
    }

    // ── Options ────────────────────────────────────────────────────

    /// Merge `options` into the global defaults.
    ///
    /// Affects future dispatches only; an utterance already speaking keeps
    /// its options.
    pub async fn initialize(&self, options: VoiceOptions) -> Result<(), SpeechError> {
        let options = resolver::validate(options);
        let queue = Arc::clone(&self.queue);
        self.lifecycle
            .ensure_ready("initialize", move || {
                queue.merge_global(&options);
                Ok(())
            })
            .await
    }

    /// [`initialize`](Self::initialize) from a loosely-typed JSON object.
    pub async fn initialize_json(&self, raw: &Value) -> Result<(), SpeechError> {
        self.initialize(resolver::validate_json(raw)).await
    }

    /// Restore the global options to the configured defaults.
    pub async fn reset(&self) -> Result<(), SpeechError> {
        let defaults = resolver::validate(self.config.defaults.clone());
        let queue = Arc::clone(&self.queue);
        self.lifecycle
            .ensure_ready("reset", move || {
                info!("Resetting global voice options");
                queue.replace_global(defaults);
                Ok(())
            })
            .await
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Installed voices, optionally filtered by language-tag prefix.
    pub async fn get_available_voices(
        &self,
        language: Option<&str>,
    ) -> Result<Vec<VoiceDescriptor>, SpeechError> {
        let engine = Arc::clone(&self.engine);
        let filter = language.map(str::to_owned);
        let fallback = self.config.voice_filter_fallback;
        self.lifecycle
            .ensure_ready("get_available_voices", move || {
                let all = engine.voices()?;
                Ok(voices::filter_by_language(all, filter.as_deref(), fallback))
            })
            .await
    }

    /// Whether an utterance is speaking or paused.
    pub async fn is_speaking(&self) -> Result<bool, SpeechError> {
        let queue = Arc::clone(&self.queue);
        self.lifecycle
            .ensure_ready("is_speaking", move || Ok(queue.is_speaking()))
            .await
    }

    // ── Playback control ───────────────────────────────────────────

    /// Stop speaking and clear the queue. Succeeds even when idle.
    pub async fn stop(&self) -> Result<(), SpeechError> {
        let queue = Arc::clone(&self.queue);
        self.lifecycle
            .ensure_ready("stop", move || {
                queue.stop();
                Ok(())
            })
            .await
    }

    /// Pause mid-utterance. Returns whether the request was accepted.
    ///
    /// Refused until the engine has reported that the current utterance
    /// started.
    pub async fn pause(&self) -> Result<bool, SpeechError> {
        let queue = Arc::clone(&self.queue);
        self.lifecycle
            .ensure_ready("pause", move || Ok(queue.pause()))
            .await
    }

    /// Resume a paused utterance. Returns whether one was found.
    pub async fn resume(&self) -> Result<bool, SpeechError> {
        let queue = Arc::clone(&self.queue);
        self.lifecycle
            .ensure_ready("resume", move || Ok(queue.resume()))
            .await
    }

    /// Queue `text` with the global options.
    ///
    /// Fails with [`SpeechError::MissingText`] before touching the queue if
    /// `text` is `None`.
    pub async fn speak<'a>(
        &self,
        text: impl Into<Option<&'a str>>,
    ) -> Result<UtteranceId, SpeechError> {
        self.speak_with_options(text, VoiceOptions::default()).await
    }

    /// Queue `text` with per-utterance overrides of the global options.
    pub async fn speak_with_options<'a>(
        &self,
        text: impl Into<Option<&'a str>>,
        options: VoiceOptions,
    ) -> Result<UtteranceId, SpeechError> {
        let text = text.into().ok_or(SpeechError::MissingText)?.to_owned();
        let options = resolver::validate(options);
        let queue = Arc::clone(&self.queue);
        self.lifecycle
            .ensure_ready("speak", move || Ok(queue.enqueue(text, options)))
            .await
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Subscribe to one event channel.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&SpeechEvent) + Send + Sync + 'static,
    {
        self.hub.subscribe(kind, handler)
    }

    /// Subscribe to every event channel.
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SpeechEvent) + Send + Sync + 'static,
    {
        self.hub.subscribe_all(handler)
    }

    /// The hub events are delivered through.
    pub const fn events(&self) -> &EventHub {
        &self.hub
    }

    // ── Inspection ─────────────────────────────────────────────────

    /// Copy of the queue, cursor, and pause flag.
    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    /// Current global options.
    pub fn global_options(&self) -> VoiceOptions {
        self.queue.global()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Start initializing the engine without queuing an operation.
    ///
    /// Returns `true` if this call started an attempt.
    pub fn warm_up(&self) -> bool {
        self.lifecycle.start()
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

impl Drop for SpeechController {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Feed engine callbacks into the queue until every sender is gone.
fn spawn_callback_pump(mut callbacks: CallbackReceiver, queue: Arc<SpeechQueue>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(callback) = callbacks.recv().await {
            queue.handle_callback(callback);
        }
        debug!("Engine callback channel closed");
    })
}

/// Forward queue events to the hub, in the order the queue produced them.
fn spawn_event_bridge(mut events: mpsc::UnboundedReceiver<SpeechEvent>, hub: EventHub) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            hub.emit(&event);
        }
    })
}
