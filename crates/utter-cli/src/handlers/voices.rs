use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::presentation::format_voices;

/// List voices, optionally filtered by language prefix.
pub async fn execute(ctx: &CliContext, language: Option<&str>) -> Result<()> {
    let voices = ctx.controller.get_available_voices(language).await?;
    if voices.is_empty() {
        println!("No voices match {:?}", language.unwrap_or_default());
        return Ok(());
    }
    print!("{}", format_voices(&voices));
    Ok(())
}
