#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod highlight;
pub mod lifecycle;
mod queue;
pub mod resolver;
pub mod voices;

// Re-export key types for convenience
pub use backend::simulated::{SimulatedEngine, SimulatedEngineConfig};
pub use config::ControllerConfig;
pub use controller::SpeechController;
pub use lifecycle::LifecycleState;
pub use utter_core::{
    EventHub, EventKind, QueueSnapshot, SpeechEngine, SpeechError, SpeechEvent, Subscription,
    UtteranceId, UtteranceStatus, VoiceDescriptor, VoiceOptions, VoiceQuality,
};
