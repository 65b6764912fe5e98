//! Voice catalogue filtering.

use utter_core::VoiceDescriptor;

/// Filter voices by language tag.
///
/// An absent or blank filter returns every voice. Otherwise a voice matches
/// when its language tag starts with the filter, ignoring case. With
/// `substring_fallback`, an empty prefix result widens to voices whose tag
/// merely contains the filter.
pub fn filter_by_language(
    voices: Vec<VoiceDescriptor>,
    filter: Option<&str>,
    substring_fallback: bool,
) -> Vec<VoiceDescriptor> {
    let Some(needle) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return voices;
    };
    let needle = needle.to_lowercase();

    let by_prefix: Vec<_> = voices
        .iter()
        .filter(|v| v.language.to_lowercase().starts_with(&needle))
        .cloned()
        .collect();

    if by_prefix.is_empty() && substring_fallback {
        return voices
            .into_iter()
            .filter(|v| v.language.to_lowercase().contains(&needle))
            .collect();
    }
    by_prefix
}
