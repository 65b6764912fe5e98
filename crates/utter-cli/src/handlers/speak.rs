//! `utter speak`: queue texts and stream events until every one is done.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, trace, warn};
use utter_speech::{SpeechController, SpeechEvent};

use crate::bootstrap::CliContext;
use crate::presentation::format_event;

/// How long a `--pause-at` pause lasts before resuming.
const PAUSE_LENGTH: Duration = Duration::from_millis(800);

pub async fn execute(
    ctx: &CliContext,
    texts: &[String],
    pause_at: Option<Duration>,
    json: bool,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = ctx.controller.subscribe_all(move |event| {
        if tx.send(event.clone()).is_err() {
            trace!(id = event.id(), "Event printer gone; dropping event");
        }
    });

    let mut outstanding = HashMap::new();
    for text in texts {
        let id = ctx
            .controller
            .speak(text.as_str())
            .await
            .with_context(|| format!("failed to queue {text:?}"))?;
        outstanding.insert(id.event_id(), text.clone());
    }
    let texts_by_id = outstanding.clone();

    let pauser = pause_at.map(|delay| tokio::spawn(pause_then_resume(Arc::clone(&ctx.controller), delay)));

    while !outstanding.is_empty() {
        let Some(event) = rx.recv().await else {
            break;
        };
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            let text = texts_by_id.get(&event.id()).map(String::as_str);
            println!("{}", format_event(&event, text));
        }
        if matches!(
            event,
            SpeechEvent::Finish { .. } | SpeechEvent::Error { .. } | SpeechEvent::Stopped { .. }
        ) {
            outstanding.remove(&event.id());
        }
    }

    if let Some(pauser) = pauser {
        pauser.abort();
    }
    Ok(())
}

async fn pause_then_resume(controller: Arc<SpeechController>, delay: Duration) {
    tokio::time::sleep(delay).await;
    match controller.pause().await {
        Ok(true) => {
            info!(pause_ms = PAUSE_LENGTH.as_millis(), "Paused");
            tokio::time::sleep(PAUSE_LENGTH).await;
            if let Err(e) = controller.resume().await {
                warn!(error = %e, "Resume failed");
            }
        }
        Ok(false) => info!("Nothing audible to pause (not started, finished, or engine cannot pause)"),
        Err(e) => warn!(error = %e, "Pause failed"),
    }
}
