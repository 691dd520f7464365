use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::engine::DEFAULT_CACHE_CAPACITY;
use crate::error::Result;
use crate::render::{DEFAULT_BATCH_SIZE, DEFAULT_SCROLL_THRESHOLD};

/// Looked up in the working directory when no config file is given.
pub const DEFAULT_CONFIG_FILE: &str = "apidex.toml";
pub const ENV_PREFIX: &str = "APIDEX";

/// Runtime settings, layered as defaults < config file < `APIDEX_*` environment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    pub batch_size: usize,
    pub debounce_ms: u64,
    pub scroll_threshold: f64,
    pub query_cache_capacity: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset: None,
            batch_size: DEFAULT_BATCH_SIZE,
            debounce_ms: 300,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            query_cache_capacity: DEFAULT_CACHE_CAPACITY,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    /// Builds the settings. An explicitly named file must exist, the default one may not.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let builder = Config::builder()
            .set_default("batch_size", defaults.batch_size as u64)?
            .set_default("debounce_ms", defaults.debounce_ms)?
            .set_default("scroll_threshold", defaults.scroll_threshold)?
            .set_default("query_cache_capacity", defaults.query_cache_capacity as u64)?
            .set_default("log_filter", defaults.log_filter)?;
        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("apidex-settings-{}.toml", std::process::id()));
        fs::write(&path, "batch_size = 20\ndataset = \"dump.json\"\n").unwrap();
        let settings = Settings::load(Some(path.as_path())).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(settings.batch_size, 20);
        assert_eq!(settings.dataset, Some(PathBuf::from("dump.json")));
        assert_eq!(settings.debounce(), Duration::from_millis(300));
        assert_eq!(settings.query_cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/apidex.toml"))).unwrap_err();
        assert!(matches!(err, crate::error::ApidexError::Config(_)));
    }
}
