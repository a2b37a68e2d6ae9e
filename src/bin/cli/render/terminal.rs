use chrono::{DateTime, Utc};

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
}

/// Wrap text in a color when color output is on
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Color for a retention level: green when safe, yellow near review, red when fading
pub fn retention_color(retention: f64) -> &'static str {
    if retention >= 0.7 {
        Color::GREEN
    } else if retention >= 0.5 {
        Color::YELLOW
    } else {
        Color::RED
    }
}

/// Horizontal bar like `[#######...] 70%`
pub fn retention_bar(retention: f64, width: usize, use_color: bool) -> String {
    let retention = retention.clamp(0.0, 1.0);
    let filled = (retention * width as f64).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(width - filled));
    format!(
        "[{}] {:>3.0}%",
        paint(&bar, retention_color(retention), use_color),
        retention * 100.0
    )
}

pub fn short_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_bar() {
        assert_eq!(retention_bar(0.5, 10, false), "[#####.....]  50%");
        assert_eq!(retention_bar(1.0, 4, false), "[####] 100%");
        assert_eq!(retention_bar(1.7, 4, false), "[####] 100%");
    }
}
