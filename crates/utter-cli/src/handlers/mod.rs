//! Command handlers.
//!
//! Each handler is `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`:
//! parse CLI-specific input, call the controller, format output.

pub mod repl;
pub mod speak;
pub mod voices;
