//! Error types shared by engines and the speech controller.

use thiserror::Error;

/// Failures reported by a [`SpeechEngine`](crate::ports::SpeechEngine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The platform engine could not be brought up.
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),

    /// The engine refused an utterance submission.
    #[error("Engine rejected utterance: {0}")]
    SubmitFailed(String),

    /// The engine has not been initialized or has shut down.
    #[error("Speech engine is not available")]
    Unavailable,

    /// Voice enumeration failed.
    #[error("Failed to list voices: {0}")]
    VoicesUnavailable(String),
}

/// Caller-facing rejection of a speech operation.
///
/// Every variant belongs to the single `speech_error` kind (see
/// [`SpeechError::code`]); the variant only refines the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// `speak` was called without any text.
    #[error("Text cannot be null")]
    MissingText,

    /// The engine failed to initialize; every operation queued against
    /// that attempt is rejected with this error.
    #[error("Failed to initialize TTS engine")]
    InitializationFailed,

    /// An engine call failed synchronously.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An operation faulted; carries the original message.
    #[error("{0}")]
    OperationFailed(String),

    /// The operation was dropped before it could resolve (controller shut down).
    #[error("Speech operation cancelled")]
    Cancelled,
}

impl SpeechError {
    /// Kind code reported to callers for every rejection.
    pub const CODE: &'static str = "speech_error";

    /// The error kind code. Always [`SpeechError::CODE`].
    #[must_use]
    pub const fn code(&self) -> &'static str {
        Self::CODE
    }
}
