use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const GLOBAL_STATE_DIR: &str = ".clipwright";
pub const SETTINGS_FILE_NAME: &str = "config.yaml";

const DEFAULT_STEP_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_PLANNER_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_PLANNER_MODEL: &str = "gpt-4o-mini";
const DEFAULT_PLANNER_API_KEY_ENV: &str = "CLIPWRIGHT_PLANNER_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to resolve home directory for config path")]
    HomeDirectoryUnavailable,
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(serde_yaml::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSettings {
    #[serde(default = "default_planner_api_base")]
    pub api_base: String,
    #[serde(default = "default_planner_model")]
    pub model: String,
    /// Name of the environment variable holding the API key. The key itself
    /// never lands in the settings file.
    #[serde(default = "default_planner_api_key_env")]
    pub api_key_env: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            api_base: default_planner_api_base(),
            model: default_planner_model(),
            api_key_env: default_planner_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Root for sessions, logs, and other runtime state.
    pub state_root: PathBuf,
    /// Root under which output files get web-relative public paths.
    #[serde(default)]
    pub public_root: Option<PathBuf>,
    #[serde(default = "default_step_timeout_seconds")]
    pub step_timeout_seconds: u64,
    #[serde(default)]
    pub planner: PlannerSettings,
    /// Tool id -> binary path overrides; env vars still win.
    #[serde(default)]
    pub tool_binaries: BTreeMap<String, String>,
}

impl Settings {
    pub fn with_state_root(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
            public_root: None,
            step_timeout_seconds: default_step_timeout_seconds(),
            planner: PlannerSettings::default(),
            tool_binaries: BTreeMap::new(),
        }
    }
}

pub fn default_settings_path() -> Result<PathBuf, ConfigError> {
    if let Some(explicit) = std::env::var_os("CLIPWRIGHT_CONFIG") {
        return Ok(PathBuf::from(explicit));
    }
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home)
        .join(GLOBAL_STATE_DIR)
        .join(SETTINGS_FILE_NAME))
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: path.display().to_string(),
        source: err,
    })?;
    serde_yaml::from_str(&raw).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        source: err,
    })
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let body = serde_yaml::to_string(settings).map_err(ConfigError::Serialize)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| ConfigError::Write {
            path: parent.display().to_string(),
            source: err,
        })?;
    }
    fs::write(path, body).map_err(|err| ConfigError::Write {
        path: path.display().to_string(),
        source: err,
    })
}

pub fn validate_settings(settings: &Settings, registry: &ToolRegistry) -> Result<(), ConfigError> {
    if settings.state_root.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "state_root must not be empty".to_string(),
        ));
    }
    if settings.step_timeout_seconds == 0 {
        return Err(ConfigError::Invalid(
            "step_timeout_seconds must be greater than zero".to_string(),
        ));
    }
    for tool_id in settings.tool_binaries.keys() {
        if !registry.has_command(tool_id) {
            return Err(ConfigError::Invalid(format!(
                "tool_binaries references unknown tool `{tool_id}`"
            )));
        }
    }
    if settings.planner.api_base.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "planner.api_base must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn default_step_timeout_seconds() -> u64 {
    DEFAULT_STEP_TIMEOUT_SECONDS
}

fn default_planner_api_base() -> String {
    DEFAULT_PLANNER_API_BASE.to_string()
}

fn default_planner_model() -> String {
    DEFAULT_PLANNER_MODEL.to_string()
}

fn default_planner_api_key_env() -> String {
    DEFAULT_PLANNER_API_KEY_ENV.to_string()
}
