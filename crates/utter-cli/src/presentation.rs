//! Terminal formatting for events and voices.

use utter_core::{SpeechEvent, VoiceDescriptor, VoiceQuality};
use utter_speech::highlight::{self, TextSegment};

/// One line describing `event`. With the utterance `text`, progress events
/// show the spoken word in brackets.
pub fn format_event(event: &SpeechEvent, text: Option<&str>) -> String {
    let label = match event {
        SpeechEvent::Start { .. } => "start",
        SpeechEvent::Finish { .. } => "finish",
        SpeechEvent::Pause { .. } => "pause",
        SpeechEvent::Resume { .. } => "resume",
        SpeechEvent::Stopped { .. } => "stopped",
        SpeechEvent::Error { .. } => "error",
        SpeechEvent::Progress { .. } => "progress",
    };
    let mut line = format!("[{:>10}] {label:<8}", event.id());

    if let (Some(range), Some(text)) = (highlight::range_for(event), text) {
        line.push_str("  ");
        line.push_str(&bracketed(&highlight::segments(text, &[range])));
    }
    line
}

fn bracketed(parts: &[TextSegment]) -> String {
    parts
        .iter()
        .map(|part| {
            if part.highlighted {
                format!("[{}]", part.text)
            } else {
                part.text.clone()
            }
        })
        .collect()
}

/// A fixed-width voice table.
pub fn format_voices(voices: &[VoiceDescriptor]) -> String {
    let name_width = voices.iter().map(|v| v.name.chars().count()).max().unwrap_or(4).max(4);
    let id_width = voices
        .iter()
        .map(|v| v.identifier.len())
        .max()
        .unwrap_or(10)
        .max(10);

    let mut out = format!(
        "{:<name_width$}  {:<id_width$}  {:<8}  QUALITY\n",
        "NAME", "IDENTIFIER", "LANGUAGE"
    );
    for voice in voices {
        let quality = match voice.quality {
            VoiceQuality::Default => "default",
            VoiceQuality::Enhanced => "enhanced",
        };
        // Pad by chars so accented names line up.
        let pad = name_width - voice.name.chars().count();
        out.push_str(&format!(
            "{}{}  {:<id_width$}  {:<8}  {quality}\n",
            voice.name,
            " ".repeat(pad),
            voice.identifier,
            voice.language,
        ));
    }
    out
}
