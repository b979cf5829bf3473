//! Configuration system for DataFlux.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides. Settings are
//! read from `~/.config/dataflux/config.toml` and/or `.dataflux/config.toml`
//! in the workspace directory.
//!
//! Pipeline files are a separate, explicit input: a TOML document naming a
//! source, an ordered list of steps and an optional output path.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::error::ConfigError;
use crate::loader::{self, SourceDescriptor};
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::preprocess::StepConfig;

/// Top-level settings for loaders and writers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFluxConfig {
    #[serde(default)]
    pub csv: CsvSettings,
    #[serde(default)]
    pub object_store: ObjectStoreSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

/// Defaults for delimited-text parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvSettings {
    /// Field delimiter; must be a single-byte character.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Field contents treated as missing values.
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
    /// Trim surrounding whitespace from fields.
    #[serde(default = "default_true")]
    pub trim: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            null_values: default_null_values(),
            trim: true,
        }
    }
}

/// Settings for reading objects from S3-compatible storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreSettings {
    /// Endpoint for path-style requests (e.g. a MinIO server). When unset,
    /// AWS virtual-hosted URLs are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Region used when a source does not name one.
    #[serde(default = "default_region")]
    pub region: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for writing processed datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_null_values() -> Vec<String> {
    ["", "NA", "N/A", "NaN", "null", "NULL", "None"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "dataflux", "dataflux")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".dataflux").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `DATAFLUX_`)
/// 3. Workspace-local config (`.dataflux/config.toml`)
/// 4. User config (`~/.config/dataflux/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&DataFluxConfig>,
) -> Result<DataFluxConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(DataFluxConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // DATAFLUX_CSV__DELIMITER, DATAFLUX_OBJECT_STORE__REGION, ...
    figment = figment.merge(Env::prefixed("DATAFLUX_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: DataFluxConfig = figment.extract()?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from an explicit file on top of the defaults.
pub fn load_config_file(path: &Path) -> Result<DataFluxConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let config: DataFluxConfig = Figment::from(Serialized::defaults(DataFluxConfig::default()))
        .merge(Toml::file(path))
        .extract()?;
    validate(&config)?;
    Ok(config)
}

/// Check whether any DataFlux configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

fn validate(config: &DataFluxConfig) -> Result<(), ConfigError> {
    for (field, c) in [
        ("csv.delimiter", config.csv.delimiter),
        ("output.delimiter", config.output.delimiter),
    ] {
        if !c.is_ascii() {
            return Err(ConfigError::Invalid {
                message: format!("{field} must be a single-byte character, got '{c}'"),
            });
        }
    }
    Ok(())
}

/// A pipeline definition: where to read from, which steps to run, where to write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFile {
    pub source: SourceDescriptor,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputTarget>,
}

/// Destination of a processed dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTarget {
    pub path: PathBuf,
}

impl PipelineFile {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a pipeline file. Relative paths inside it are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let mut file = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            file.source.resolve_relative(base);
            if let Some(output) = file.output.as_mut() {
                if output.path.is_relative() {
                    output.path = base.join(&output.path);
                }
            }
        }
        Ok(file)
    }

    /// Build the pipeline described by the step list.
    pub fn pipeline(&self) -> crate::Result<Pipeline> {
        Ok(PipelineBuilder::from_configs(&self.steps)?.build())
    }

    /// Load the source and run every step over it.
    pub fn execute(&self, config: &DataFluxConfig) -> crate::Result<Dataset> {
        let dataset = loader::load_source(&self.source, config, None)?;
        let mut pipeline = self.pipeline()?;
        tracing::info!(steps = ?pipeline.step_names(), "Starting run");
        Ok(pipeline.run(dataset)?)
    }
}
