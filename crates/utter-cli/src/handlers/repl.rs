//! `utter repl`: an interactive session against one controller.
//!
//! Lines are read by `rustyline` on a blocking thread and handed to the async
//! loop over a channel, so events keep printing while the prompt waits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::debug;
use utter_speech::SpeechEvent;

use crate::bootstrap::CliContext;
use crate::presentation::{format_event, format_voices};

const PROMPT: &str = "utter> ";

const HELP: &str = "\
Commands:
  say <text>        queue text
  pause             pause the current utterance
  resume            resume a paused utterance
  stop              stop and clear the queue
  status            show the queue
  voices [lang]     list voices, optionally by language prefix
  set <json>        merge options, e.g. set {\"rate\": 1.5}
  reset             restore default options
  help              show this help
  quit              leave";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Say(String),
    Pause,
    Resume,
    Stop,
    Status,
    Voices(Option<String>),
    Set(serde_json::Value),
    Reset,
    Help,
    Quit,
    Empty,
}

/// Parse one input line.
pub fn parse_line(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match word.to_ascii_lowercase().as_str() {
        "" => ReplCommand::Empty,
        "say" if rest.is_empty() => return Err("say needs some text".into()),
        "say" => ReplCommand::Say(rest.to_owned()),
        "pause" => ReplCommand::Pause,
        "resume" => ReplCommand::Resume,
        "stop" => ReplCommand::Stop,
        "status" => ReplCommand::Status,
        "voices" => ReplCommand::Voices((!rest.is_empty()).then(|| rest.to_owned())),
        "set" => ReplCommand::Set(
            serde_json::from_str(rest).map_err(|e| format!("set expects a JSON object: {e}"))?,
        ),
        "reset" => ReplCommand::Reset,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command {other:?} (try help)")),
    };
    Ok(command)
}

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let texts: Arc<Mutex<HashMap<u32, String>>> = Arc::default();
    let event_texts = Arc::clone(&texts);
    let _subscription = ctx.controller.subscribe_all(move |event: &SpeechEvent| {
        let texts = event_texts.lock().unwrap_or_else(PoisonError::into_inner);
        let text = texts.get(&event.id()).map(String::as_str);
        println!("{}", format_event(event, text));
    });

    let mut lines = spawn_reader();
    println!("{HELP}");

    while let Some(line) = lines.recv().await {
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        debug!(?command, "REPL command");

        let controller = &ctx.controller;
        match command {
            ReplCommand::Empty => {}
            ReplCommand::Say(text) => {
                let id = controller.speak(text.as_str()).await?;
                texts
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(id.event_id(), text);
                println!("queued #{}", id.event_id());
            }
            ReplCommand::Pause => println!("pause accepted: {}", controller.pause().await?),
            ReplCommand::Resume => println!("resumed: {}", controller.resume().await?),
            ReplCommand::Stop => {
                controller.stop().await?;
                texts.lock().unwrap_or_else(PoisonError::into_inner).clear();
            }
            ReplCommand::Status => {
                let snapshot = controller.queue_snapshot();
                println!(
                    "speaking: {}  paused: {}  cursor: {:?}",
                    controller.is_speaking().await?,
                    snapshot.paused,
                    snapshot.cursor
                );
                for item in &snapshot.items {
                    println!(
                        "  #{:<10} {:<9} {:>3}/{:<3} {:?}",
                        item.event_id,
                        format!("{:?}", item.status).to_lowercase(),
                        item.position,
                        item.text.chars().count(),
                        item.text
                    );
                }
            }
            ReplCommand::Voices(language) => {
                let voices = controller.get_available_voices(language.as_deref()).await?;
                print!("{}", format_voices(&voices));
            }
            ReplCommand::Set(raw) => {
                controller.initialize_json(&raw).await?;
                println!("options: {}", serde_json::to_string(&controller.global_options())?);
            }
            ReplCommand::Reset => {
                controller.reset().await?;
                println!("options: {}", serde_json::to_string(&controller.global_options())?);
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => break,
        }
    }

    ctx.controller.stop().await?;
    Ok(())
}

/// Read lines on a detached thread until EOF or Ctrl-C.
///
/// A plain thread rather than `spawn_blocking`: the runtime waits for
/// blocking tasks on shutdown, and this one sits in `readline` after `quit`.
fn spawn_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                eprintln!("cannot open terminal for input: {e}");
                return;
            }
        };
        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("input error: {e}");
                    break;
                }
            }
        }
    });
    rx
}
