//! End-to-end scenarios for `SpeechController`.
//!
//! A scripted engine records every submission and lets each test deliver
//! engine callbacks by hand, so the queue can be driven through exact
//! interleavings without timers or audio.
//!
//! # What is tested
//!
//! - FIFO playback and event order across several utterances
//! - Pause mid-utterance, then resume from the last reported position
//! - Pause and stop while an utterance is submitted but not yet started
//! - `stop` on an idle controller is silent
//! - `speak(None)` fails before touching the queue
//! - Initialization failure rejects every parked operation
//! - Parked operations run in arrival order once the engine is ready
//! - Option overrides and global re-application after the last dispatch
//! - Offset/position invariants under concurrent callers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use utter_core::{
    CallbackSender, EngineCallback, EngineError, SpeechEngine, SubmitMode, UtteranceId,
    VoiceDescriptor, VoiceQuality,
};
use utter_speech::{
    ControllerConfig, EventKind, LifecycleState, SpeechController, SpeechError, SpeechEvent,
    VoiceOptions,
};

// ── Scripted engine ────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Submission {
    text: String,
    options: VoiceOptions,
    id: UtteranceId,
    mode: SubmitMode,
}

#[derive(Default)]
struct ScriptedEngine {
    callbacks: Mutex<Option<CallbackSender>>,
    submissions: Mutex<Vec<Submission>>,
    applied: Mutex<Vec<VoiceOptions>>,
    stops: AtomicUsize,
    init_calls: AtomicUsize,
    fail_init: bool,
    gate: Option<Arc<Notify>>,
}

impl ScriptedEngine {
    fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn fire(&self, callback: EngineCallback) {
        self.callbacks
            .lock()
            .unwrap()
            .as_ref()
            .expect("engine not initialized")
            .send(callback)
            .unwrap();
    }

    fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    fn last_submission(&self) -> Submission {
        self.submissions
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("nothing submitted")
    }
}

#[async_trait]
impl SpeechEngine for ScriptedEngine {
    async fn initialize(&self, callbacks: CallbackSender) -> Result<(), EngineError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_init {
            return Err(EngineError::InitFailed("no synthesizer".into()));
        }
        *self.callbacks.lock().unwrap() = Some(callbacks);
        Ok(())
    }

    fn speak(
        &self,
        text: &str,
        options: &VoiceOptions,
        id: UtteranceId,
        mode: SubmitMode,
    ) -> Result<(), EngineError> {
        self.submissions.lock().unwrap().push(Submission {
            text: text.to_owned(),
            options: options.clone(),
            id,
            mode,
        });
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_defaults(&self, options: &VoiceOptions) {
        self.applied.lock().unwrap().push(options.clone());
    }

    fn voices(&self) -> Result<Vec<VoiceDescriptor>, EngineError> {
        Ok(vec![
            VoiceDescriptor::new("Samantha", "samantha", "en-US", VoiceQuality::Enhanced),
            VoiceDescriptor::new("Daniel", "daniel", "en-GB", VoiceQuality::Default),
            VoiceDescriptor::new("Amelie", "amelie", "fr-CA", VoiceQuality::Default),
        ])
    }
}

// ── Helpers ────────────────────────────────────────────────────────

struct Fixture {
    engine: Arc<ScriptedEngine>,
    controller: Arc<SpeechController>,
    events: Arc<Mutex<Vec<SpeechEvent>>>,
    _subscription: utter_speech::Subscription,
}

impl Fixture {
    fn new(engine: ScriptedEngine) -> Self {
        Self::with_config(engine, ControllerConfig::default())
    }

    fn with_config(engine: ScriptedEngine, config: ControllerConfig) -> Self {
        let engine = Arc::new(engine);
        let controller = Arc::new(SpeechController::new(
            Arc::clone(&engine) as Arc<dyn SpeechEngine>,
            config,
        ));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = controller.subscribe_all(move |e| sink.lock().unwrap().push(e.clone()));
        Self {
            engine,
            controller,
            events,
            _subscription: subscription,
        }
    }

    fn events(&self) -> Vec<SpeechEvent> {
        self.events.lock().unwrap().clone()
    }

    fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.kind().name()).collect()
    }

    /// Deliver a callback and wait until its event has reached subscribers.
    async fn fire(&self, callback: EngineCallback) {
        let before = self.events.lock().unwrap().len();
        self.engine.fire(callback);
        wait_until(|| self.events.lock().unwrap().len() > before).await;
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn two_utterances_play_in_fifo_order() {
    let fx = Fixture::new(ScriptedEngine::default());
    let first = fx.controller.speak("Hello world").await.unwrap();
    let second = fx.controller.speak("Goodbye").await.unwrap();

    assert_eq!(fx.engine.submission_count(), 1, "second waits its turn");
    assert_eq!(fx.engine.last_submission().text, "Hello world");

    fx.fire(EngineCallback::started(first)).await;
    fx.fire(EngineCallback::progress(first, 0, 5)).await;
    fx.fire(EngineCallback::progress(first, 6, 5)).await;
    fx.fire(EngineCallback::done(first)).await;

    let next = fx.engine.last_submission();
    assert_eq!((next.id, next.text.as_str()), (second, "Goodbye"));
    assert_eq!(next.mode, SubmitMode::Queue);

    fx.fire(EngineCallback::started(second)).await;
    fx.fire(EngineCallback::done(second)).await;

    assert_eq!(
        fx.kinds(),
        ["onStart", "onProgress", "onProgress", "onFinish", "onStart", "onFinish"]
    );
    let ids: Vec<_> = fx.events().iter().map(SpeechEvent::id).collect();
    assert_eq!(ids[..4], [first.event_id(); 4]);
    assert_eq!(ids[4..], [second.event_id(); 2]);
    assert!(!fx.controller.is_speaking().await.unwrap());
}

#[tokio::test]
async fn pause_then_resume_speaks_only_the_remainder() {
    let fx = Fixture::new(ScriptedEngine::default());
    let id = fx.controller.speak("Long sentence here").await.unwrap();
    let later = fx.controller.speak("Afterwards").await.unwrap();

    fx.fire(EngineCallback::started(id)).await;
    fx.fire(EngineCallback::progress(id, 6, 7)).await;

    assert!(fx.controller.pause().await.unwrap());
    assert_eq!(fx.engine.stops.load(Ordering::SeqCst), 1);
    fx.fire(EngineCallback::stopped(id, true)).await;
    assert!(fx.controller.is_speaking().await.unwrap(), "paused counts as speaking");

    assert!(fx.controller.resume().await.unwrap());
    let resumed = fx.engine.last_submission();
    assert_eq!(resumed.id, id);
    assert_eq!(resumed.text, "entence here");
    assert_eq!(resumed.mode, SubmitMode::Flush);
    assert!(
        fx.engine.submissions().iter().all(|s| s.id != later),
        "later utterance must not start early"
    );

    fx.fire(EngineCallback::started(id)).await;
    fx.fire(EngineCallback::progress(id, 8, 4)).await;

    let snapshot = fx.controller.queue_snapshot();
    let item = snapshot.get(id).unwrap();
    assert_eq!((item.offset, item.position), (6, 14));
    assert_eq!(
        fx.events().last(),
        Some(&SpeechEvent::Progress {
            id: id.event_id(),
            location: 14,
            length: 4
        })
    );

    fx.fire(EngineCallback::done(id)).await;
    assert_eq!(fx.engine.last_submission().id, later);
    assert_eq!(
        fx.kinds(),
        ["onStart", "onProgress", "onPause", "onResume", "onProgress", "onFinish"]
    );
}

#[tokio::test]
async fn pause_before_first_start_is_refused_and_playback_continues() {
    let fx = Fixture::new(ScriptedEngine::default());
    let id = fx.controller.speak("one two three").await.unwrap();

    assert!(!fx.controller.pause().await.unwrap(), "nothing is audible yet");
    assert_eq!(fx.engine.stops.load(Ordering::SeqCst), 0);
    assert!(!fx.controller.resume().await.unwrap());

    fx.fire(EngineCallback::started(id)).await;
    fx.fire(EngineCallback::done(id)).await;
    assert!(!fx.controller.is_speaking().await.unwrap());

    let later = fx.controller.speak("later").await.unwrap();
    assert_eq!(fx.engine.last_submission().id, later);
    fx.fire(EngineCallback::started(later)).await;
    assert!(fx.controller.pause().await.unwrap());
    fx.fire(EngineCallback::stopped(later, true)).await;
    assert!(fx.controller.resume().await.unwrap());
    assert_eq!(fx.kinds(), ["onStart", "onFinish", "onStart", "onPause"]);
}

#[tokio::test]
async fn pause_between_utterances_waits_for_the_next_start() {
    let fx = Fixture::new(ScriptedEngine::default());
    let first = fx.controller.speak("first").await.unwrap();
    let second = fx.controller.speak("second one").await.unwrap();

    fx.fire(EngineCallback::started(first)).await;
    fx.fire(EngineCallback::done(first)).await;
    assert_eq!(fx.engine.last_submission().id, second);

    assert!(!fx.controller.pause().await.unwrap(), "second has not started");
    assert_eq!(fx.engine.stops.load(Ordering::SeqCst), 0);

    fx.fire(EngineCallback::started(second)).await;
    fx.fire(EngineCallback::progress(second, 7, 3)).await;
    assert!(fx.controller.pause().await.unwrap());
    fx.fire(EngineCallback::stopped(second, true)).await;

    assert!(fx.controller.resume().await.unwrap());
    let resumed = fx.engine.last_submission();
    assert_eq!((resumed.id, resumed.text.as_str()), (second, "one"));
    assert_eq!(resumed.mode, SubmitMode::Flush);

    fx.fire(EngineCallback::started(second)).await;
    fx.fire(EngineCallback::done(second)).await;
    assert!(!fx.controller.is_speaking().await.unwrap());
}

#[tokio::test]
async fn stop_before_start_accepts_new_work() {
    let fx = Fixture::new(ScriptedEngine::default());
    let id = fx.controller.speak("never heard").await.unwrap();

    fx.controller.stop().await.unwrap();
    wait_until(|| fx.events().len() == 1).await;
    assert_eq!(fx.events()[0], SpeechEvent::Stopped { id: id.event_id() });
    assert!(fx.controller.queue_snapshot().is_empty());

    // A late start for the dropped utterance changes nothing.
    fx.engine.fire(EngineCallback::started(id));

    let fresh = fx.controller.speak("fresh").await.unwrap();
    assert_eq!(fx.engine.last_submission().id, fresh);
    fx.fire(EngineCallback::started(fresh)).await;
    assert_eq!(fx.events().last(), Some(&SpeechEvent::Start { id: fresh.event_id() }));
    assert_eq!(fx.events().len(), 2);
}

#[tokio::test]
async fn stop_clears_queue_and_reports_current_item() {
    let fx = Fixture::new(ScriptedEngine::default());
    let id = fx.controller.speak("one").await.unwrap();
    fx.controller.speak("two").await.unwrap();
    fx.fire(EngineCallback::started(id)).await;

    fx.controller.stop().await.unwrap();
    wait_until(|| fx.events().len() == 2).await;
    assert_eq!(fx.events()[1], SpeechEvent::Stopped { id: id.event_id() });
    assert!(fx.controller.queue_snapshot().is_empty());
    assert!(!fx.controller.is_speaking().await.unwrap());

    // Next speak starts from a clean slate.
    let fresh = fx.controller.speak("three").await.unwrap();
    assert_eq!(fx.engine.last_submission().id, fresh);
}

#[tokio::test]
async fn stop_on_empty_queue_emits_nothing() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.controller.stop().await.unwrap();
    fx.controller.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(fx.events().is_empty());
    assert_eq!(fx.engine.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn speak_without_text_fails_before_queueing() {
    let fx = Fixture::new(ScriptedEngine::default());
    let err = fx.controller.speak(None::<&str>).await.unwrap_err();
    assert_eq!(err.code(), "speech_error");
    assert_eq!(err.to_string(), "Text cannot be null");

    let err = fx
        .controller
        .speak_with_options(None::<&str>, VoiceOptions::default().with_rate(1.2))
        .await
        .unwrap_err();
    assert_eq!(err, SpeechError::MissingText);

    assert!(fx.controller.queue_snapshot().is_empty());
    assert_eq!(fx.engine.init_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_initialization_rejects_every_parked_operation() {
    let fx = Fixture::new(ScriptedEngine::failing());
    let (speak, pause, voices) = tokio::join!(
        fx.controller.speak("hi"),
        fx.controller.pause(),
        fx.controller.get_available_voices(None),
    );
    for err in [speak.unwrap_err(), pause.unwrap_err(), voices.unwrap_err()] {
        assert_eq!(err, SpeechError::InitializationFailed);
        assert_eq!(err.to_string(), "Failed to initialize TTS engine");
    }
    assert_eq!(fx.engine.init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.controller.lifecycle_state(), LifecycleState::Failed);
    assert_eq!(fx.engine.submission_count(), 0);

    // The next operation retries.
    assert!(fx.controller.stop().await.is_err());
    assert_eq!(fx.engine.init_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn operations_parked_during_initialization_run_in_order() {
    let gate = Arc::new(Notify::new());
    let fx = Fixture::new(ScriptedEngine::gated(Arc::clone(&gate)));

    let (a, b, initialized, ()) = tokio::join!(
        fx.controller.speak("first"),
        fx.controller.speak("second"),
        fx.controller.initialize(VoiceOptions::default().with_pitch(1.5)),
        async {
            wait_until(|| fx.controller.lifecycle_state() == LifecycleState::Initializing).await;
            gate.notify_one();
        },
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    initialized.unwrap();

    assert_eq!(fx.engine.init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.controller.lifecycle_state(), LifecycleState::Ready);

    let snapshot = fx.controller.queue_snapshot();
    let order: Vec<_> = snapshot.items.iter().map(|item| item.id).collect();
    assert_eq!(order, [a, b]);
    assert_eq!(fx.engine.last_submission().id, a);
    assert_eq!(fx.controller.global_options().pitch, Some(1.5));
}

#[tokio::test]
async fn per_utterance_options_override_globals() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.controller
        .initialize(VoiceOptions::default().with_language("en-GB").with_rate(0.8))
        .await
        .unwrap();

    let id = fx
        .controller
        .speak_with_options("Cheerio", VoiceOptions::default().with_rate(9.0).with_voice("daniel"))
        .await
        .unwrap();

    let submitted = fx.engine.last_submission();
    assert_eq!(submitted.id, id);
    assert_eq!(submitted.options.rate, Some(2.0), "override is clamped");
    assert_eq!(submitted.options.language.as_deref(), Some("en-GB"));
    assert_eq!(submitted.options.voice.as_deref(), Some("daniel"));

    // Dispatching the last queued item re-applies the globals.
    let applied = fx.engine.applied.lock().unwrap().clone();
    let last = applied.last().unwrap();
    assert_eq!(last.rate, Some(0.8));
    assert_eq!(last.voice, None);
}

#[tokio::test]
async fn voices_are_filtered_by_language_prefix() {
    let fx = Fixture::new(ScriptedEngine::default());
    let all = fx.controller.get_available_voices(None).await.unwrap();
    assert_eq!(all.len(), 3);

    let en = fx.controller.get_available_voices(Some("en")).await.unwrap();
    assert_eq!(en.len(), 2);
    assert!(en.iter().all(|v| v.language.starts_with("en")));

    assert!(fx.controller.get_available_voices(Some("CA")).await.unwrap().is_empty());
}

#[tokio::test]
async fn voice_filter_fallback_widens_to_substring() {
    let fx = Fixture::with_config(
        ScriptedEngine::default(),
        ControllerConfig::default().with_voice_filter_fallback(true),
    );
    let ca = fx.controller.get_available_voices(Some("CA")).await.unwrap();
    assert_eq!(ca.len(), 1);
    assert_eq!(ca[0].identifier, "amelie");
}

#[tokio::test]
async fn removed_subscription_stops_receiving() {
    let fx = Fixture::new(ScriptedEngine::default());
    let starts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&starts);
    let sub = fx.controller.subscribe(EventKind::Start, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let a = fx.controller.speak("a").await.unwrap();
    fx.fire(EngineCallback::started(a)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 1);

    sub.remove();
    sub.remove();
    fx.fire(EngineCallback::done(a)).await;
    let b = fx.controller.speak("b").await.unwrap();
    fx.fire(EngineCallback::started(b)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn offsets_hold_under_concurrent_callers() {
    let fx = Fixture::new(ScriptedEngine::default());
    fx.controller.speak("warm up the engine please").await.unwrap();

    let speakers: Vec<_> = (0..8)
        .map(|n| {
            let controller = Arc::clone(&fx.controller);
            tokio::spawn(async move {
                controller
                    .speak_with_options(
                        format!("utterance number {n} with several words").as_str(),
                        VoiceOptions::default().with_rate(1.1),
                    )
                    .await
                    .unwrap();
            })
        })
        .collect();

    for step in 0..20 {
        let current = fx.controller.queue_snapshot().current().cloned();
        if let Some(item) = current {
            fx.engine.fire(EngineCallback::started(item.id));
            fx.engine.fire(EngineCallback::progress(item.id, step % 7, 2));
            if step % 3 == 0 {
                fx.engine.fire(EngineCallback::done(item.id));
                wait_until(|| {
                    fx.controller
                        .queue_snapshot()
                        .get(item.id)
                        .is_some_and(|u| u.status.is_terminal())
                })
                .await;
            } else if fx.controller.pause().await.unwrap() {
                fx.engine.fire(EngineCallback::stopped(item.id, true));
                wait_until(|| fx.controller.queue_snapshot().paused).await;
                fx.controller.resume().await.unwrap();
            }
        }

        for item in fx.controller.queue_snapshot().items {
            let len = item.text.chars().count();
            assert!(
                item.offset <= item.position && item.position <= len,
                "invariant broken for {:?}: offset {} position {} len {}",
                item.text,
                item.offset,
                item.position,
                len
            );
        }
        tokio::task::yield_now().await;
    }

    for handle in speakers {
        handle.await.unwrap();
    }
}
