use anyhow::{Context, Result};

use recall_lib::retention::{ForgettingCurve, MarkerKind};

use crate::app::App;
use crate::render::terminal::{self, paint, Color};
use crate::OutputFormat;

const BAR_WIDTH: usize = 30;

pub async fn run(app: &App, word_id: i64, format: &OutputFormat, use_color: bool) -> Result<()> {
    let record = app
        .backend
        .get_forgetting_curve(word_id)
        .await
        .with_context(|| format!("Failed to load forgetting curve for word {}", word_id))?;
    let curve = ForgettingCurve::from_record(&record);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&curve)?);
        }
        OutputFormat::Plain => print_curve(&curve, use_color),
    }

    Ok(())
}

/// Plain rendering shared with `estimate`
pub fn print_curve(curve: &ForgettingCurve, use_color: bool) {
    if curve.samples.is_empty() {
        println!("(no curve data)");
        return;
    }

    for sample in &curve.samples {
        let date = terminal::short_date(sample.at);
        let bar = terminal::retention_bar(sample.retention, BAR_WIDTH, use_color);
        let line = format!("{}  {}", date, bar);
        if sample.is_projection {
            println!("{}", paint(&line, Color::DIM, use_color));
        } else {
            println!("{}", line);
        }
    }

    if !curve.markers.is_empty() {
        println!();
        for marker in &curve.markers {
            let label = match (marker.kind, marker.success) {
                (MarkerKind::Creation, _) => paint("learned", Color::CYAN, use_color),
                (MarkerKind::Review, Some(true)) => paint("review ✓", Color::GREEN, use_color),
                (MarkerKind::Review, Some(false)) => paint("review ✗", Color::RED, use_color),
                (MarkerKind::Review, None) => "review".to_string(),
                (MarkerKind::NextReview, _) => paint("next review", Color::YELLOW, use_color),
            };
            println!("{}  {}", terminal::short_date(marker.at), label);
        }
    }

    if curve.dropped > 0 {
        println!();
        println!("({} malformed entries skipped)", curve.dropped);
    }
}
