//! Speech engine backends implementing [`SpeechEngine`](utter_core::SpeechEngine).
//!
//! The controller only ever talks to `Arc<dyn SpeechEngine>`, so platform
//! engines can be swapped without touching the queue logic.
//!
//! | Module          | Audio | Pause |
//! |-----------------|-------|-------|
//! | [`simulated`]   |       | configurable |

pub mod simulated;
