//! Engine lifecycle: initialization sequencing and deferred operations.
//!
//! ```text
//!   Uninitialized ──► Initializing ──► Ready
//!         ▲                 │
//!         │                 ▼
//!         └───────────── Failed   (next operation retries)
//! ```
//!
//! Every caller operation passes through [`LifecycleManager::ensure_ready`].
//! Operations that arrive before the engine is ready are parked as
//! [`PendingOperation`]s and drained in arrival order by the transition out
//! of `Initializing`.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use utter_core::{CallbackSender, EngineError, SpeechEngine, SpeechError};

/// Initialization state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No initialization attempted yet.
    Uninitialized,
    /// An attempt is in flight; new operations are parked.
    Initializing,
    /// The engine is up; operations run immediately.
    Ready,
    /// The last attempt failed; the next operation triggers a retry.
    Failed,
}

/// A parked caller operation together with its completion handle.
///
/// Type-erased so operations with different result types share one FIFO.
trait PendingOperation: Send {
    /// Run the operation and resolve its completion handle.
    fn run(self: Box<Self>);

    /// Resolve the completion handle with `error` without running anything.
    fn reject(self: Box<Self>, error: SpeechError);
}

type Operation<T> = Box<dyn FnOnce() -> Result<T, SpeechError> + Send>;

struct Deferred<T> {
    label: &'static str,
    operation: Operation<T>,
    reply: oneshot::Sender<Result<T, SpeechError>>,
}

impl<T: Send + 'static> PendingOperation for Deferred<T> {
    fn run(self: Box<Self>) {
        let result = run_guarded(self.label, self.operation);
        if self.reply.send(result).is_err() {
            debug!(operation = self.label, "Caller dropped before deferred operation resolved");
        }
    }

    fn reject(self: Box<Self>, error: SpeechError) {
        if self.reply.send(Err(error)).is_err() {
            debug!(operation = self.label, "Caller dropped before deferred operation was rejected");
        }
    }
}

/// Called after a successful initialization, before the pending drain.
type ReadyHook = Box<dyn Fn() + Send + Sync>;

struct Inner {
    state: LifecycleState,
    pending: VecDeque<Box<dyn PendingOperation>>,
}

/// Gates caller operations on engine initialization.
pub struct LifecycleManager {
    inner: Mutex<Inner>,
    engine: Arc<dyn SpeechEngine>,
    callbacks: CallbackSender,
    on_ready: ReadyHook,
}

impl LifecycleManager {
    /// Create a manager for `engine`.
    ///
    /// `callbacks` is handed to the engine on every initialization attempt.
    /// `on_ready` runs once per successful attempt, before parked operations
    /// are drained (the controller uses it to push global options).
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        callbacks: CallbackSender,
        on_ready: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LifecycleState::Uninitialized,
                pending: VecDeque::new(),
            }),
            engine,
            callbacks,
            on_ready: Box::new(on_ready),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    /// Number of operations parked behind an in-flight initialization.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Start initializing if nothing is in flight and the engine isn't ready.
    ///
    /// Returns `true` if this call started a new attempt. Must be called from
    /// within a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut inner = self.lock();
        if matches!(inner.state, LifecycleState::Initializing | LifecycleState::Ready) {
            return false;
        }
        inner.state = LifecycleState::Initializing;
        drop(inner);

        self.spawn_initialization();
        true
    }

    /// Run `operation` once the engine is ready.
    ///
    /// - `Ready`: runs immediately on the caller's task.
    /// - `Initializing`: parks the operation.
    /// - `Uninitialized` / `Failed`: parks the operation and starts an attempt.
    ///
    /// Panics inside `operation` are caught and reported as
    /// [`SpeechError::OperationFailed`].
    pub async fn ensure_ready<T, F>(self: &Arc<Self>, label: &'static str, operation: F) -> Result<T, SpeechError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, SpeechError> + Send + 'static,
    {
        let (completion, trigger) = {
            let mut inner = self.lock();
            let previous = inner.state;
            if previous == LifecycleState::Ready {
                drop(inner);
                return run_guarded(label, operation);
            }

            let (reply, completion) = oneshot::channel();
            inner.pending.push_back(Box::new(Deferred {
                label,
                operation: Box::new(operation),
                reply,
            }));
            debug!(operation = label, state = ?previous, "Parking operation until engine is ready");

            let trigger = previous != LifecycleState::Initializing;
            if trigger {
                inner.state = LifecycleState::Initializing;
            }
            drop(inner);
            (completion, trigger)
        };

        if trigger {
            self.spawn_initialization();
        }

        completion.await.unwrap_or(Err(SpeechError::Cancelled))
    }

    fn spawn_initialization(self: &Arc<Self>) {
        info!("Initializing speech engine");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.engine.initialize(this.callbacks.clone()).await;
            this.complete(result);
        });
    }

    /// Transition out of `Initializing` and drain parked operations.
    fn complete(&self, result: Result<(), EngineError>) {
        match result {
            Ok(()) => {
                info!("Speech engine ready");
                (self.on_ready)();
                self.drain_ready();
            }
            Err(e) => {
                warn!(error = %e, "Speech engine failed to initialize");
                let failed = {
                    let mut inner = self.lock();
                    inner.state = LifecycleState::Failed;
                    std::mem::take(&mut inner.pending)
                };
                for operation in failed {
                    operation.reject(SpeechError::InitializationFailed);
                }
            }
        }
    }

    /// Run parked operations in FIFO order until none remain, then flip to
    /// `Ready`. Operations parked while the drain runs join the same queue,
    /// so arrival order is preserved.
    fn drain_ready(&self) {
        loop {
            let batch = {
                let mut inner = self.lock();
                if inner.pending.is_empty() {
                    inner.state = LifecycleState::Ready;
                    return;
                }
                std::mem::take(&mut inner.pending)
            };
            debug!(count = batch.len(), "Draining parked operations");
            for operation in batch {
                operation.run();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run `operation`, converting a panic into [`SpeechError::OperationFailed`].
fn run_guarded<T>(
    label: &'static str,
    operation: impl FnOnce() -> Result<T, SpeechError>,
) -> Result<T, SpeechError> {
    match panic::catch_unwind(AssertUnwindSafe(operation)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            debug!(operation = label, error = %e, "Operation rejected");
            Err(e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(operation = label, %message, "Operation faulted");
            Err(SpeechError::OperationFailed(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "operation panicked".to_owned())
}
