//! Controller configuration and system locale detection.

use serde::{Deserialize, Serialize};
use utter_core::VoiceOptions;

use crate::resolver;

/// Locale used when the environment names none (or only `C`/`POSIX`).
pub const FALLBACK_LOCALE: &str = "en-US";

/// Settings for a [`SpeechController`](crate::SpeechController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Seed for the global options. `reset()` restores these.
    pub defaults: VoiceOptions,

    /// When a language-filtered voice listing finds no prefix match, retry
    /// with a substring match.
    pub voice_filter_fallback: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            defaults: resolver::engine_defaults(),
            voice_filter_fallback: false,
        }
    }
}

impl ControllerConfig {
    /// Replace the default option set (validated on use).
    #[must_use]
    pub fn with_defaults(mut self, defaults: VoiceOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Enable or disable the substring fallback for voice filtering.
    #[must_use]
    pub const fn with_voice_filter_fallback(mut self, enabled: bool) -> Self {
        self.voice_filter_fallback = enabled;
        self
    }
}

/// The system locale as a language tag (`en_US.UTF-8` → `en-US`).
///
/// Checks `LC_ALL`, `LC_MESSAGES`, then `LANG`; the first variable holding
/// a usable tag wins. Falls back to [`FALLBACK_LOCALE`].
#[must_use]
pub fn system_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| locale_tag(&value))
        .unwrap_or_else(|| FALLBACK_LOCALE.to_string())
}

/// Normalise a POSIX locale string into a language tag.
fn locale_tag(value: &str) -> Option<String> {
    let base = value
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .replace('_', "-");

    if base.eq_ignore_ascii_case("C") || base.eq_ignore_ascii_case("POSIX") {
        return None;
    }
    resolver::is_valid_language_tag(&base).then_some(base)
}
