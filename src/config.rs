// ABOUTME: Configuration management for planflow
// ABOUTME: Loads YAML configuration, merges PLANFLOW_* environment overrides and sets up logging

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::synthesis::DEFAULT_SYNTHESIS_TASK_ID;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a dispatched task may run before it is failed as timed out
    #[serde(with = "humantime_serde")]
    pub harvest_window: Duration,

    /// Unlimited when absent
    pub max_concurrent_tasks: Option<usize>,

    pub synthesis_task_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            harvest_window: Duration::from_secs(60),
            max_concurrent_tasks: None,
            synthesis_task_id: DEFAULT_SYNTHESIS_TASK_ID.to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./instance/sessions"),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./instance"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::from_yaml(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?
        } else {
            Config::default()
        };

        config.merge_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        let possible_paths = [
            PathBuf::from("planflow.yaml"),
            PathBuf::from("planflow.yml"),
            PathBuf::from(".planflow.yaml"),
            PathBuf::from(".planflow.yml"),
        ];

        for path in possible_paths {
            if path.exists() {
                return path;
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".planflow").join("config.yaml");
            if home_config.exists() {
                return home_config;
            }
        }

        // Default path (may not exist)
        PathBuf::from("planflow.yaml")
    }

    /// Apply PLANFLOW_* overrides read through `lookup`
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(window) = lookup("PLANFLOW_HARVEST_WINDOW") {
            self.engine.harvest_window = humantime_serde::re::humantime::parse_duration(&window)
                .with_context(|| format!("Invalid PLANFLOW_HARVEST_WINDOW '{}'", window))?;
        }
        if let Some(max_tasks) = lookup("PLANFLOW_MAX_CONCURRENT") {
            self.engine.max_concurrent_tasks = Some(
                max_tasks
                    .parse()
                    .with_context(|| format!("Invalid PLANFLOW_MAX_CONCURRENT '{}'", max_tasks))?,
            );
        }
        if let Some(task_id) = lookup("PLANFLOW_SYNTHESIS_TASK_ID") {
            self.engine.synthesis_task_id = task_id;
        }

        if let Some(dir) = lookup("PLANFLOW_STATE_DIR") {
            self.store.state_dir = PathBuf::from(dir);
        }
        if let Some(root) = lookup("PLANFLOW_ARTIFACT_ROOT") {
            self.artifacts.root = PathBuf::from(root);
        }

        if let Some(level) = lookup("PLANFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PLANFLOW_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.engine.harvest_window.is_zero(),
            "engine.harvest_window must be greater than zero"
        );
        ensure!(
            self.engine.max_concurrent_tasks != Some(0),
            "engine.max_concurrent_tasks must be at least 1 when set"
        );
        ensure!(
            !self.engine.synthesis_task_id.trim().is_empty(),
            "engine.synthesis_task_id must not be empty"
        );
        Ok(())
    }
}

/// Install a global tracing subscriber; `RUST_LOG` takes precedence over the configured level
pub fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let installed = match logging.format.as_str() {
        "compact" => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!("Logging initialized with level: {}", logging.level);
    Ok(())
}
