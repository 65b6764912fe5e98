//! Simulated speech engine: timed callbacks, no audio.
//!
//! Speaks one utterance at a time. Each whitespace-delimited word produces a
//! `Progress` callback followed by a per-word delay scaled by the utterance
//! rate, then `Done`. `stop` cancels the active utterance and drops anything
//! still queued.
//!
//! Useful for demos and for exercising the controller end to end in tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utter_core::{
    CallbackSender, EngineCallback, EngineCapabilities, EngineError, SpeechEngine, SubmitMode,
    UtteranceId, VoiceDescriptor, VoiceOptions, VoiceQuality, find_voice,
};

/// Default time spent "speaking" one word at rate 1.0.
pub const DEFAULT_WORD_DELAY: Duration = Duration::from_millis(180);

/// Configuration for [`SimulatedEngine`].
#[derive(Debug, Clone)]
pub struct SimulatedEngineConfig {
    /// Time per word at rate 1.0.
    pub word_delay: Duration,
    /// Whether the engine reports mid-utterance pause support.
    pub supports_pause: bool,
    /// Make `initialize` fail.
    pub fail_initialization: bool,
    /// Installed voices.
    pub voices: Vec<VoiceDescriptor>,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            word_delay: DEFAULT_WORD_DELAY,
            supports_pause: true,
            fail_initialization: false,
            voices: default_voices(),
        }
    }
}

impl SimulatedEngineConfig {
    #[must_use]
    pub const fn with_word_delay(mut self, word_delay: Duration) -> Self {
        self.word_delay = word_delay;
        self
    }

    #[must_use]
    pub const fn with_pause_support(mut self, supports_pause: bool) -> Self {
        self.supports_pause = supports_pause;
        self
    }

    #[must_use]
    pub const fn failing_initialization(mut self) -> Self {
        self.fail_initialization = true;
        self
    }
}

/// The built-in voice catalogue.
pub fn default_voices() -> Vec<VoiceDescriptor> {
    vec![
        VoiceDescriptor::new("Samantha", "sim.en-US.samantha", "en-US", VoiceQuality::Enhanced),
        VoiceDescriptor::new("Alex", "sim.en-US.alex", "en-US", VoiceQuality::Default),
        VoiceDescriptor::new("Daniel", "sim.en-GB.daniel", "en-GB", VoiceQuality::Default),
        VoiceDescriptor::new("Karen", "sim.en-AU.karen", "en-AU", VoiceQuality::Enhanced),
        VoiceDescriptor::new("Amélie", "sim.fr-FR.amelie", "fr-FR", VoiceQuality::Enhanced),
        VoiceDescriptor::new("Thomas", "sim.fr-FR.thomas", "fr-FR", VoiceQuality::Default),
        VoiceDescriptor::new("Anna", "sim.de-DE.anna", "de-DE", VoiceQuality::Default),
        VoiceDescriptor::new("Markus", "sim.de-DE.markus", "de-DE", VoiceQuality::Enhanced),
    ]
}

/// One submitted utterance, stamped with the stop generation it belongs to.
#[derive(Debug)]
struct Job {
    id: UtteranceId,
    text: String,
    word_delay: Duration,
    generation: u64,
}

/// Playback state shared between the engine handle and its worker task.
#[derive(Debug, Default)]
struct Playback {
    /// Bumped by every `stop`; jobs from an older generation are dropped.
    generation: u64,
    /// Token of the utterance being spoken.
    current: Option<CancellationToken>,
}

#[derive(Debug, Default)]
struct Shared {
    playback: Mutex<Playback>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Playback> {
        self.playback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Cancel the active utterance and invalidate queued ones.
    fn stop(&self) {
        let mut playback = self.lock();
        playback.generation += 1;
        if let Some(token) = playback.current.take() {
            token.cancel();
        }
    }

    /// Install a token for `generation`, or `None` if a stop superseded it.
    fn begin(&self, generation: u64) -> Option<CancellationToken> {
        let mut playback = self.lock();
        if playback.generation != generation {
            return None;
        }
        let token = CancellationToken::new();
        playback.current = Some(token.clone());
        Some(token)
    }

    fn finish(&self) {
        self.lock().current = None;
    }
}

/// A [`SpeechEngine`] that fakes synthesis with timers.
pub struct SimulatedEngine {
    config: SimulatedEngineConfig,
    shared: Arc<Shared>,
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    defaults: Mutex<VoiceOptions>,
}

impl SimulatedEngine {
    pub fn new(config: SimulatedEngineConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
            jobs: Mutex::new(None),
            defaults: Mutex::new(VoiceOptions::default()),
        }
    }

    /// Options most recently applied with `apply_defaults`.
    pub fn defaults(&self) -> VoiceOptions {
        self.defaults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn word_delay_for(&self, options: &VoiceOptions) -> Duration {
        let rate = options
            .rate
            .or_else(|| self.defaults().rate)
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(1.0);
        self.config.word_delay.div_f32(rate)
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimulatedEngineConfig::default())
    }
}

#[async_trait]
impl SpeechEngine for SimulatedEngine {
    async fn initialize(&self, callbacks: CallbackSender) -> Result<(), EngineError> {
        if self.config.fail_initialization {
            warn!("Simulated engine configured to fail initialization");
            return Err(EngineError::InitFailed(
                "simulated engine refused to start".into(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(Arc::clone(&self.shared), rx, callbacks));
        // Replacing the sender retires any previous worker.
        *self.jobs.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);

        info!(voices = self.config.voices.len(), "Simulated engine ready");
        Ok(())
    }

    fn speak(
        &self,
        text: &str,
        options: &VoiceOptions,
        id: UtteranceId,
        mode: SubmitMode,
    ) -> Result<(), EngineError> {
        if mode == SubmitMode::Flush {
            self.shared.stop();
        }

        let voice = options
            .voice
            .as_deref()
            .and_then(|key| find_voice(&self.config.voices, key));
        debug!(
            %id,
            ?mode,
            voice = voice.map(|v| v.name.as_str()),
            language = options.language.as_deref(),
            "Simulated engine accepted utterance"
        );

        let job = Job {
            id,
            text: text.to_owned(),
            word_delay: self.word_delay_for(options),
            generation: self.shared.generation(),
        };
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.as_ref()
            .ok_or(EngineError::Unavailable)?
            .send(job)
            .map_err(|_| EngineError::Unavailable)
    }

    fn stop(&self) {
        debug!("Simulated engine stop");
        self.shared.stop();
    }

    fn apply_defaults(&self, options: &VoiceOptions) {
        *self.defaults.lock().unwrap_or_else(PoisonError::into_inner) = options.clone();
    }

    fn voices(&self) -> Result<Vec<VoiceDescriptor>, EngineError> {
        Ok(self.config.voices.clone())
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_pause: self.config.supports_pause,
        }
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    callbacks: CallbackSender,
) {
    while let Some(job) = jobs.recv().await {
        let Some(token) = shared.begin(job.generation) else {
            debug!(id = %job.id, "Dropping utterance queued before stop");
            continue;
        };
        let delivered = speak_job(&job, &token, &callbacks).await;
        shared.finish();
        if !delivered {
            debug!("Callback receiver closed; simulated engine worker exiting");
            return;
        }
    }
}

/// Play one job. Returns `false` once the callback receiver is gone.
async fn speak_job(job: &Job, token: &CancellationToken, callbacks: &CallbackSender) -> bool {
    if callbacks.send(EngineCallback::started(job.id)).is_err() {
        return false;
    }

    for (start, length) in word_spans(&job.text) {
        if callbacks
            .send(EngineCallback::progress(job.id, start, length))
            .is_err()
        {
            return false;
        }
        tokio::select! {
            () = token.cancelled() => {
                return callbacks.send(EngineCallback::stopped(job.id, true)).is_ok();
            }
            () = tokio::time::sleep(job.word_delay) => {}
        }
    }

    if token.is_cancelled() {
        return callbacks.send(EngineCallback::stopped(job.id, true)).is_ok();
    }
    callbacks.send(EngineCallback::done(job.id)).is_ok()
}

/// `(char_start, char_length)` of every whitespace-delimited word.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut word_start = None;
    let mut count = 0;
    for (index, c) in text.chars().enumerate() {
        count = index + 1;
        if c.is_whitespace() {
            if let Some(start) = word_start.take() {
                spans.push((start, index - start));
            }
        } else if word_start.is_none() {
            word_start = Some(index);
        }
    }
    if let Some(start) = word_start {
        spans.push((start, count - start));
    }
    spans
}
