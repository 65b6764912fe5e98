#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    QueueSnapshot, UtteranceId, UtteranceSnapshot, UtteranceStatus, VoiceDescriptor,
    VoiceOptions, VoiceQuality, find_voice,
};
pub use error::{EngineError, SpeechError};
pub use events::{EventHub, EventKind, SpeechEvent, Subscription};
pub use ports::{
    CallbackKind, CallbackReceiver, CallbackSender, EngineCallback, EngineCapabilities,
    SpeechEngine, SubmitMode,
};
