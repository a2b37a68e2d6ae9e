//! Review session configuration
//!
//! Loaded from a TOML file; every key is optional:
//!
//! ```toml
//! learning_lang = "en"
//! native_lang = "zh"
//! low_water_mark = 1
//! batch_size = 10
//!
//! [reveal_delays]
//! multiple_choice_ms = 800
//!
//! [backend]
//! base_url = "https://api.example.com/v3"
//! timeout_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::models::QuestionType;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for a review session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_learning_lang")]
    pub learning_lang: String,
    #[serde(default = "default_native_lang")]
    pub native_lang: String,
    /// Refill once the queue holds this many items or fewer
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,
    /// Questions requested per refill
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Video questions requested per word
    #[serde(default = "default_video_question_limit")]
    pub video_question_limit: usize,
    /// How long an error notice stays visible
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
    /// Evenly spaced points on a locally estimated curve
    #[serde(default = "default_curve_sample_count")]
    pub curve_sample_count: usize,
    #[serde(default)]
    pub reveal_delays: RevealDelays,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_learning_lang() -> String {
    "en".to_string()
}

fn default_native_lang() -> String {
    "zh".to_string()
}

fn default_low_water_mark() -> usize {
    1
}

fn default_batch_size() -> usize {
    10
}

fn default_video_question_limit() -> usize {
    5
}

fn default_notice_ttl_secs() -> u64 {
    4
}

fn default_curve_sample_count() -> usize {
    30
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            learning_lang: default_learning_lang(),
            native_lang: default_native_lang(),
            low_water_mark: default_low_water_mark(),
            batch_size: default_batch_size(),
            video_question_limit: default_video_question_limit(),
            notice_ttl_secs: default_notice_ttl_secs(),
            curve_sample_count: default_curve_sample_count(),
            reveal_delays: RevealDelays::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl ReviewConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.learning_lang.trim().is_empty() || self.native_lang.trim().is_empty() {
            return Err(ConfigError::Invalid("languages must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}

/// Time the correct answer stays revealed before the submission is sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealDelays {
    #[serde(default)]
    pub recognition_ms: u64,
    #[serde(default = "default_multiple_choice_ms")]
    pub multiple_choice_ms: u64,
    #[serde(default = "default_fill_blank_ms")]
    pub fill_blank_ms: u64,
    #[serde(default)]
    pub pronounce_sentence_ms: u64,
    #[serde(default = "default_video_ms")]
    pub video_ms: u64,
}

fn default_multiple_choice_ms() -> u64 {
    800
}

fn default_fill_blank_ms() -> u64 {
    1200
}

fn default_video_ms() -> u64 {
    1500
}

impl Default for RevealDelays {
    fn default() -> Self {
        Self {
            recognition_ms: 0,
            multiple_choice_ms: default_multiple_choice_ms(),
            fill_blank_ms: default_fill_blank_ms(),
            pronounce_sentence_ms: 0,
            video_ms: default_video_ms(),
        }
    }
}

impl RevealDelays {
    /// No delay for any question type
    pub fn immediate() -> Self {
        Self {
            recognition_ms: 0,
            multiple_choice_ms: 0,
            fill_blank_ms: 0,
            pronounce_sentence_ms: 0,
            video_ms: 0,
        }
    }

    pub fn for_type(&self, question_type: QuestionType) -> Duration {
        let ms = match question_type {
            QuestionType::Recognition => self.recognition_ms,
            QuestionType::McDefinition | QuestionType::McWord => self.multiple_choice_ms,
            QuestionType::FillBlank => self.fill_blank_ms,
            QuestionType::PronounceSentence => self.pronounce_sentence_ms,
            QuestionType::VideoMc => self.video_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Connection settings for [`crate::backend::HttpBackend`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as the `user_id` query parameter when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ReviewConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.low_water_mark, 1);
        assert_eq!(config.backend.timeout_secs, 30);
    }

    #[test]
    fn test_partial_sections() {
        let config = ReviewConfig::from_toml_str(
            r#"
            learning_lang = "de"
            batch_size = 25

            [reveal_delays]
            multiple_choice_ms = 300

            [backend]
            base_url = "https://api.example.com/v3"
            user_id = "u-1"
            "#,
        )
        .unwrap();

        assert_eq!(config.learning_lang, "de");
        assert_eq!(config.native_lang, "zh");
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.reveal_delays.multiple_choice_ms, 300);
        assert_eq!(config.reveal_delays.fill_blank_ms, 1200);
        assert_eq!(config.backend.user_id.as_deref(), Some("u-1"));
        assert_eq!(config.backend.connect_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ReviewConfig::from_toml_str("batch_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ReviewConfig::from_toml_str("learning_lang = \" \""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ReviewConfig::from_toml_str("batch_size = \"many\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_reveal_delay_per_type() {
        let delays = RevealDelays::default();
        assert_eq!(delays.for_type(QuestionType::McWord), Duration::from_millis(800));
        assert_eq!(delays.for_type(QuestionType::McDefinition), Duration::from_millis(800));
        assert_eq!(delays.for_type(QuestionType::VideoMc), Duration::from_millis(1500));
        assert_eq!(delays.for_type(QuestionType::Recognition), Duration::ZERO);

        let immediate = RevealDelays::immediate();
        for qt in QuestionType::ALL {
            assert_eq!(immediate.for_type(qt), Duration::ZERO);
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.toml");

        let missing = ReviewConfig::load(&path).unwrap();
        assert_eq!(missing, ReviewConfig::default());

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "native_lang = \"ja\"").unwrap();
        let loaded = ReviewConfig::load(&path).unwrap();
        assert_eq!(loaded.native_lang, "ja");
    }
}
