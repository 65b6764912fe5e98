//! Root CLI structure and global options.

use clap::Parser;
use utter_core::VoiceOptions;

use crate::commands::Commands;

/// Queue text for speech and watch the queue work.
#[derive(Parser, Debug)]
#[command(name = "utter")]
#[command(about = "Drive a speech utterance queue from the terminal")]
#[command(version)]
pub struct Cli {
    /// Speech rate multiplier (0.1 to 2.0)
    #[arg(long, env = "UTTER_RATE", global = true)]
    pub rate: Option<f32>,

    /// Pitch multiplier (0.1 to 2.0)
    #[arg(long, env = "UTTER_PITCH", global = true)]
    pub pitch: Option<f32>,

    /// Volume (0.0 to 1.0)
    #[arg(long, env = "UTTER_VOLUME", global = true)]
    pub volume: Option<f32>,

    /// Language tag, e.g. en-US (defaults to the system locale)
    #[arg(long, env = "UTTER_LANGUAGE", global = true)]
    pub language: Option<String>,

    /// Voice name or identifier
    #[arg(long, env = "UTTER_VOICE", global = true)]
    pub voice: Option<String>,

    /// Simulated time per word at rate 1.0, in milliseconds
    #[arg(long = "word-delay-ms", env = "UTTER_WORD_DELAY_MS", default_value_t = 180, global = true)]
    pub word_delay_ms: u64,

    /// Widen voice language filters to substring matches when no prefix matches
    #[arg(long = "voice-fallback", global = true)]
    pub voice_fallback: bool,

    /// Simulate an engine that cannot pause mid-utterance
    #[arg(long = "no-pause", global = true)]
    pub no_pause: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Voice options given on the command line or through the environment.
    pub fn voice_options(&self) -> VoiceOptions {
        VoiceOptions {
            language: self.language.clone(),
            pitch: self.pitch,
            rate: self.rate,
            volume: self.volume,
            voice: self.voice.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_voice_flags() {
        let cli = Cli::parse_from([
            "utter",
            "--rate",
            "1.5",
            "--language",
            "fr-FR",
            "--no-pause",
            "voices",
        ]);
        let options = cli.voice_options();
        assert_eq!(options.rate, Some(1.5));
        assert_eq!(options.language.as_deref(), Some("fr-FR"));
        assert_eq!(options.pitch, None);
        assert!(cli.no_pause);
        assert!(matches!(cli.command, Some(Commands::Voices { .. })));
    }

    #[test]
    fn speak_collects_texts() {
        let cli = Cli::parse_from(["utter", "speak", "--pause-at", "300", "one", "two"]);
        let Some(Commands::Speak { texts, pause_at, .. }) = cli.command else {
            panic!("expected speak");
        };
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(pause_at, Some(300));
    }
}
