use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use recall_lib::backend::{Backend, HttpBackend, RemoteMediaPreparer};
use recall_lib::config::ReviewConfig;
use recall_lib::session::SessionController;

const DEFAULT_CONFIG: &str = "recall.toml";

/// Shared application state for CLI commands
pub struct App {
    pub config: ReviewConfig,
    pub backend: Arc<dyn Backend>,
}

impl App {
    /// Load config (defaults if the file is missing) and connect the backend
    pub fn new(config_path: Option<&Path>, base_url: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
        let mut config = ReviewConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        if let Some(url) = base_url {
            config.backend.base_url = url.to_string();
        }

        let backend = HttpBackend::new(&config.backend).context("Failed to set up backend client")?;

        Ok(Self {
            config,
            backend: Arc::new(backend),
        })
    }

    /// A practice session against the configured backend
    pub fn session(&self) -> SessionController {
        SessionController::new(
            Arc::clone(&self.backend),
            Arc::new(RemoteMediaPreparer),
            self.config.clone(),
        )
    }
}
