use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::client::DEFAULT_API_URL;
use crate::prompt::DEFAULT_MODEL;
use crate::store::DEFAULT_STORE_PATH;

pub const SETTINGS_FILE: &str = "articles.toml";

/// Runtime settings: defaults, then `articles.toml`, then `ARTICLES_*` env.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub store_path: String,
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_with(Path::new(""), None)
    }

    /// Settings file from `dir`, environment from `env` (the process
    /// environment when `None`).
    ///
    /// The file is looked up by its exact name: a bare `articles` stem would
    /// also match the `articles.json` collection sitting next to it.
    pub fn load_with(dir: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let file = dir.join(SETTINGS_FILE);
        Self::from_builder(
            Config::builder()
                .add_source(File::new(&file.to_string_lossy(), FileFormat::Toml).required(false))
                .add_source(Environment::with_prefix("ARTICLES").try_parsing(true).source(env)),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        builder
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("model", DEFAULT_MODEL)?
            .set_default("store_path", DEFAULT_STORE_PATH)?
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    /// Explicit key first, then the legacy variable the old scripts used.
    pub fn resolve_api_key(&self, legacy: Option<String>) -> Result<String> {
        self.api_key
            .clone()
            .or(legacy)
            .filter(|k| !k.trim().is_empty())
            .context("No API key: set ARTICLES_API_KEY or OPENAI_API_KEY")
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
