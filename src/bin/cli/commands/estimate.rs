use anyhow::{bail, Context, Result};
use chrono::Utc;

use recall_lib::backend::QuestionRecord;
use recall_lib::retention::{
    decay_rate_for, parse_timestamp, projected_review_time, ForgettingCurve, REVIEW_THRESHOLD,
};

use crate::app::App;
use crate::commands::curve::print_curve;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(
    app: &App,
    source: &str,
    at: Option<&str>,
    samples: Option<usize>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let raw = if source == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };
    let record: QuestionRecord = serde_json::from_str(&raw).context("Not a question record")?;
    let item = record.into_item().context("Invalid question record")?;

    let at = match at {
        Some(raw) => match parse_timestamp(raw) {
            Some(at) => at,
            None => bail!("Unrecognised date '{}'", raw),
        },
        None => Utc::now(),
    };

    let retention = item.retention_at(at);
    let next_review = projected_review_time(&item.history, REVIEW_THRESHOLD);
    let samples = samples.unwrap_or(app.config.curve_sample_count);
    let curve = item
        .learned_at
        .or_else(|| item.history.first().map(|e| e.reviewed_at))
        .map(|created| ForgettingCurve::estimate(&item.history, created, samples));

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "word": item.word,
                "at": at,
                "reviews": item.history.len(),
                "retention": retention,
                "decayRate": decay_rate_for(item.history.len()),
                "nextReview": next_review,
                "curve": curve,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{} ({} reviews)", item.word, item.history.len());
            match retention {
                Some(r) => println!("  Retention:   {}", terminal::retention_bar(r, 20, use_color)),
                None => println!("  Retention:   unknown (no learn date or reviews)"),
            }
            println!("  Decay rate:  {:.2}/day", decay_rate_for(item.history.len()));
            if let Some(next) = next_review {
                println!("  Next review: {}", terminal::short_date(next));
            }
            if let Some(curve) = &curve {
                println!();
                print_curve(curve, use_color);
            }
        }
    }

    Ok(())
}
