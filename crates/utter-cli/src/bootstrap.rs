//! CLI bootstrap: the composition root.
//!
//! The only place where the engine and controller are wired together.
//! Handlers receive the composed [`CliContext`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, ensure};
use tracing_subscriber::EnvFilter;
use utter_speech::resolver;
use utter_speech::{ControllerConfig, SimulatedEngine, SimulatedEngineConfig, SpeechController};

use crate::parser::Cli;

/// Composed application context for command handlers.
pub struct CliContext {
    pub controller: Arc<SpeechController>,
}

/// Install the `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the engine and controller from the parsed command line.
///
/// Must be called from within the Tokio runtime.
pub fn bootstrap(cli: &Cli) -> Result<CliContext> {
    if let Some(language) = &cli.language {
        ensure!(
            resolver::is_valid_language_tag(language),
            "invalid language tag: {language}"
        );
    }

    let engine_config = SimulatedEngineConfig::default()
        .with_word_delay(Duration::from_millis(cli.word_delay_ms))
        .with_pause_support(!cli.no_pause);

    let overrides = resolver::validate(cli.voice_options());
    let config = ControllerConfig::default()
        .with_defaults(resolver::engine_defaults().overlaid_with(&overrides))
        .with_voice_filter_fallback(cli.voice_fallback);
    tracing::debug!(?config, "Controller configuration");

    let controller = SpeechController::new(Arc::new(SimulatedEngine::new(engine_config)), config);
    Ok(CliContext {
        controller: Arc::new(controller),
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn rejects_invalid_language_tag() {
        let cli = Cli::parse_from(["utter", "--language", "english!", "voices"]);
        let err = tokio_test::block_on(async { bootstrap(&cli).err() })
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert_eq!(err, "invalid language tag: english!");
    }

    #[test]
    fn cli_flags_overlay_engine_defaults() {
        let cli = Cli::parse_from(["utter", "--rate", "9", "--voice-fallback", "voices"]);
        tokio_test::block_on(async {
            let ctx = bootstrap(&cli).unwrap();
            let global = ctx.controller.global_options();
            assert_eq!(global.rate, Some(2.0), "rate is clamped");
            assert_eq!(global.pitch, Some(1.0));
            assert_eq!(global.volume, Some(1.0));
            assert!(ctx.controller.config().voice_filter_fallback);
        });
    }
}
