//! Subcommands.

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue one or more utterances and print events until they finish
    Speak {
        /// Texts to speak, in order
        #[arg(required = true)]
        texts: Vec<String>,

        /// Pause this many milliseconds after starting, then resume
        #[arg(long = "pause-at")]
        pause_at: Option<u64>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List available voices
    Voices {
        /// Language tag prefix, e.g. "en" or "fr-FR"
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Interactive session: say, pause, resume, stop, status
    Repl,
}
