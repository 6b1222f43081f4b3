//! Ingester configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Top-level ingester configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngesterConfig {
    /// Directory NetCDF files are written to by `convert`
    pub output_dir: PathBuf,

    /// Replace existing output files instead of failing
    pub overwrite: bool,

    /// Worker threads for parallel granule processing (0 = one per core)
    pub jobs: usize,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown log format: {}", other),
        }
    }
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            overwrite: false,
            jobs: 0,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl IngesterConfig {
    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: IngesterConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded ingester config");
        Ok(config)
    }

    /// Load configuration from `LIMB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from a YAML file when one is given, otherwise from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml(path),
            None => Self::from_env(),
        }
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("LIMB_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("LIMB_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("LIMB_LOG_FORMAT") {
            config.logging.format = format.parse()?;
        }
        if let Some(jobs) = lookup("LIMB_JOBS") {
            config.jobs = jobs
                .parse()
                .with_context(|| format!("LIMB_JOBS is not a number: {}", jobs))?;
        }
        if let Some(overwrite) = lookup("LIMB_OVERWRITE") {
            config.overwrite = matches!(overwrite.to_lowercase().as_str(), "true" | "1" | "yes");
        }

        Ok(config)
    }
}
