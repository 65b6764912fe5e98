//! Option resolution: validation, clamping, and merging of voice options.
//!
//! Invalid input never fails: unknown keys and values of the wrong type are
//! dropped, numbers are clamped into range, and a bad language tag is
//! discarded so the global (or system) language applies instead.

use std::ops::RangeInclusive;

use serde_json::Value;
use utter_core::VoiceOptions;

use crate::config;

/// Accepted pitch multipliers.
pub const PITCH_RANGE: RangeInclusive<f32> = 0.1..=2.0;

/// Accepted speech rates.
pub const RATE_RANGE: RangeInclusive<f32> = 0.1..=2.0;

/// Accepted volumes.
pub const VOLUME_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Neutral engine defaults: system locale, unit pitch/rate/volume, no voice.
#[must_use]
pub fn engine_defaults() -> VoiceOptions {
    VoiceOptions {
        language: Some(config::system_locale()),
        pitch: Some(1.0),
        rate: Some(1.0),
        volume: Some(1.0),
        voice: None,
    }
}

/// Build validated options from loosely-typed input (e.g. a JSON payload).
///
/// Recognised keys are `language`, `pitch`, `rate`, `volume`, and `voice`.
/// Anything else, including a non-object value, is ignored.
#[must_use]
pub fn validate_json(raw: &Value) -> VoiceOptions {
    let Some(map) = raw.as_object() else {
        return VoiceOptions::default();
    };

    #[allow(clippy::cast_possible_truncation)]
    let number = |key: &str| map.get(key).and_then(Value::as_f64).map(|n| n as f32);
    let string = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_owned);

    validate(VoiceOptions {
        language: string("language"),
        pitch: number("pitch"),
        rate: number("rate"),
        volume: number("volume"),
        voice: string("voice"),
    })
}

/// Clamp numeric options into range and drop unusable values.
#[must_use]
pub fn validate(options: VoiceOptions) -> VoiceOptions {
    VoiceOptions {
        language: options
            .language
            .map(|tag| tag.trim().to_owned())
            .filter(|tag| is_valid_language_tag(tag)),
        pitch: options.pitch.and_then(|p| clamp(p, &PITCH_RANGE)),
        rate: options.rate.and_then(|r| clamp(r, &RATE_RANGE)),
        volume: options.volume.and_then(|v| clamp(v, &VOLUME_RANGE)),
        voice: options.voice.filter(|v| !v.is_empty()),
    }
}

/// Effective options for one dispatch: `local` overrides `global` key by key.
///
/// The result always carries a language; if neither set has one the system
/// locale is used.
#[must_use]
pub fn resolve(global: &VoiceOptions, local: &VoiceOptions) -> VoiceOptions {
    let mut effective = global.overlaid_with(local);
    if effective.language.is_none() {
        effective.language = Some(config::system_locale());
    }
    effective
}

/// Loose language tag check: a 2–3 letter primary subtag followed by
/// 1–8 char alphanumeric subtags, separated by `-` or `_`.
#[must_use]
pub fn is_valid_language_tag(tag: &str) -> bool {
    let mut parts = tag.split(['-', '_']);
    let primary_ok = parts
        .next()
        .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));

    primary_ok && parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Clamp into `range`; NaN is treated as unset.
fn clamp(value: f32, range: &RangeInclusive<f32>) -> Option<f32> {
    (!value.is_nan()).then(|| value.clamp(*range.start(), *range.end()))
}
