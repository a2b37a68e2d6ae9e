mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "recall-cli", about = "Vocabulary review from the terminal", version)]
struct Cli {
    /// Config file (default: recall.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show practice counters and score
    Status,

    /// Show the stored forgetting curve of a saved word
    Curve {
        /// Saved word id
        word_id: i64,
    },

    /// Estimate retention for a question record saved as JSON
    Estimate {
        /// Path to the record ("-" reads stdin)
        record: String,
        /// Point in time to estimate at (default: now)
        #[arg(long)]
        at: Option<String>,
        /// Number of curve samples
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Practice interactively
    Practice {
        /// Language being learned
        #[arg(long)]
        learning: Option<String>,
        /// Learner's native language
        #[arg(long)]
        native: Option<String>,
        /// Also stream video questions for this word
        #[arg(long)]
        videos: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.config.as_deref(), cli.base_url.as_deref())?;

    match cli.command {
        Command::Status => {
            commands::status::run(&app, &cli.format, use_color).await?;
        }
        Command::Curve { word_id } => {
            commands::curve::run(&app, word_id, &cli.format, use_color).await?;
        }
        Command::Estimate { record, at, samples } => {
            commands::estimate::run(&app, &record, at.as_deref(), samples, &cli.format, use_color)?;
        }
        Command::Practice { learning, native, videos } => {
            commands::practice::run(
                &app,
                learning.as_deref(),
                native.as_deref(),
                videos.as_deref(),
                use_color,
            )
            .await?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
