//! Domain types for queued speech.
//!
//! These types are "UI safe": `Clone + Debug + Serialize` with no engine or
//! runtime dependencies, so snapshots can be handed to any frontend.

mod options;
mod utterance;
mod voice;

pub use options::VoiceOptions;
pub use utterance::{QueueSnapshot, UtteranceId, UtteranceSnapshot, UtteranceStatus};
pub use voice::{VoiceDescriptor, VoiceQuality, find_voice};
