//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the speech controller expects from the
//! platform. They contain no implementation details and use only domain
//! types.

mod engine;

pub use engine::{
    CallbackKind, CallbackReceiver, CallbackSender, EngineCallback, EngineCapabilities,
    SpeechEngine, SubmitMode,
};
