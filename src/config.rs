use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::engine::EngineError;
use crate::model::Settings;
use crate::ports::ConfigurationProvider;

/// Reads the global policy from a JSON file on every load.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn parse_settings(raw: &str) -> Result<Settings, EngineError> {
    serde_json::from_str(raw).map_err(|e| EngineError::ConfigUnavailable(e.to_string()))
}

#[async_trait]
impl ConfigurationProvider for FileConfigProvider {
    async fn load_settings(&self) -> Result<Settings, EngineError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| EngineError::ConfigUnavailable(format!("{}: {e}", self.path.display())))?;
        parse_settings(&raw)
    }
}

/// Load settings, degrading to `None` on failure.
///
/// `None` means: 07:00-21:00 display window, every day labelled free and no
/// local validation. The store still has the final say on commits.
pub async fn resolve_settings(provider: &dyn ConfigurationProvider) -> Option<Settings> {
    match provider.load_settings().await {
        Ok(settings) => {
            info!("settings loaded (timezone {})", settings.timezone);
            Some(settings)
        }
        Err(e) => {
            warn!("{e}; using fallback opening hours");
            metrics::counter!(crate::observability::CONFIG_FALLBACKS_TOTAL).increment(1);
            None
        }
    }
}
