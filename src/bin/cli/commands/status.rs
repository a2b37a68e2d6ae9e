use anyhow::{Context, Result};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let status = app
        .backend
        .get_practice_status()
        .await
        .context("Failed to load practice status")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Plain => {
            println!("{}", paint("Practice", Color::BOLD, use_color));
            println!("  New words:     {}", status.new_count);
            println!("  To practice:   {}", status.practice_count);
            println!("  Due soon:      {}", status.due_soon_count);
            println!("  Score:         {}", status.score);
        }
    }

    Ok(())
}
