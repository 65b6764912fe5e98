//! Voice option set shared by global defaults and per-utterance overrides.

use serde::{Deserialize, Serialize};

/// A (possibly partial) set of voice options.
///
/// Every field is optional: an unset field on a per-utterance set falls
/// through to the global defaults. Values are expected to have passed through
/// the option resolver before reaching an engine; this type itself does no
/// clamping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOptions {
    /// BCP-47-ish language tag (e.g. `"en-US"`, `"fr"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Pitch multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,

    /// Speech rate multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,

    /// Output volume, 0.0 to 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,

    /// Voice name or identifier. Resolved by the engine; an unknown voice is
    /// ignored rather than treated as an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl VoiceOptions {
    /// Whether no option is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.pitch.is_none()
            && self.rate.is_none()
            && self.volume.is_none()
            && self.voice.is_none()
    }

    /// Set the language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the pitch multiplier.
    #[must_use]
    pub const fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Set the speech rate.
    #[must_use]
    pub const fn with_rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Set the voice name or identifier.
    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Overlay `overrides` onto `self` key by key.
    ///
    /// Keys set in `overrides` win; unset keys keep the value from `self`.
    #[must_use]
    pub fn overlaid_with(&self, overrides: &Self) -> Self {
        Self {
            language: overrides.language.clone().or_else(|| self.language.clone()),
            pitch: overrides.pitch.or(self.pitch),
            rate: overrides.rate.or(self.rate),
            volume: overrides.volume.or(self.volume),
            voice: overrides.voice.clone().or_else(|| self.voice.clone()),
        }
    }
}
