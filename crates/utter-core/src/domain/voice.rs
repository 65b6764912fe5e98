//! Voice descriptors reported by engines.

use serde::{Deserialize, Serialize};

/// Quality tier of an installed voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoiceQuality {
    #[default]
    Default,
    Enhanced,
}

/// A voice installed on the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDescriptor {
    /// Human-readable name.
    pub name: String,
    /// Engine-specific identifier (used in [`VoiceOptions::voice`](super::VoiceOptions)).
    pub identifier: String,
    /// Language tag (e.g. `"en-US"`).
    pub language: String,
    /// Quality tier.
    pub quality: VoiceQuality,
}

impl VoiceDescriptor {
    /// Convenience constructor.
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        language: impl Into<String>,
        quality: VoiceQuality,
    ) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            language: language.into(),
            quality,
        }
    }
}

/// Find the first voice whose identifier or name equals `key` exactly.
///
/// Matching is case-sensitive. `None` means "apply no voice override".
pub fn find_voice<'a>(voices: &'a [VoiceDescriptor], key: &str) -> Option<&'a VoiceDescriptor> {
    voices
        .iter()
        .find(|voice| voice.identifier == key || voice.name == key)
}
