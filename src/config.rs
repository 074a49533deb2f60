use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::release::ActionKind;
use crate::error::{AppError, AppResult};

pub const DEFAULT_TRACKER_URL: &str = "https://api.github.com";
pub const DEFAULT_MILESTONE_LABEL_PREFIX: &str = "Milestone-";
pub const DEFAULT_TYPE_LABEL_PREFIX: &str = "Type-";
pub const DEFAULT_OUTPUT_PATH: &str = "target/generated-changes/changes.xml";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const CONFIG_DIR_NAME: &str = "changes-report";
const CONFIG_FILE_NAME: &str = "config.json";

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| {
            AppError::Configuration("unable to locate the user configuration directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

/// Settings persisted by `config init` / `config map-type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_label_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_label_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Tracker issue type -> changelog action kind.
    #[serde(default)]
    pub issue_types: BTreeMap<String, String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// Values supplied on the command line or through `CHANGES_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub tracker_url: Option<String>,
    pub tracker_username: Option<String>,
    pub tracker_token: Option<String>,
    pub project: Option<String>,
    pub output: Option<PathBuf>,
    pub issue_types: Vec<(String, String)>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tracker_url: String,
    pub tracker_username: Option<String>,
    pub tracker_token: Option<String>,
    pub project: String,
    pub milestone_label_prefix: String,
    pub type_label_prefix: String,
    pub issue_types: BTreeMap<String, ActionKind>,
    pub request_timeout: Duration,
    pub output_path: PathBuf,
}

impl AppConfig {
    pub fn load(workspace_hint: &Path, overrides: ConfigOverrides) -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Self::resolve(workspace_hint, stored, overrides)
    }

    /// Layers overrides on top of the stored config on top of defaults.
    pub fn resolve(
        workspace_hint: &Path,
        stored: StoredConfig,
        overrides: ConfigOverrides,
    ) -> AppResult<Self> {
        let project = overrides
            .project
            .or(stored.project)
            .map(|project| project.trim().to_string())
            .filter(|project| !project.is_empty())
            .ok_or_else(|| AppError::Configuration("no project identifier configured".to_string()))?;

        let mut raw_types = stored.issue_types;
        raw_types.extend(overrides.issue_types);
        if raw_types.is_empty() {
            return Err(AppError::Configuration(
                "no issue type mapping configured; map tracker types to add, fix, remove or update"
                    .to_string(),
            ));
        }
        let issue_types = raw_types
            .into_iter()
            .map(|(tracker_type, kind)| {
                ActionKind::from_str(&kind)
                    .map(|kind| (tracker_type.clone(), kind))
                    .ok_or_else(|| {
                        AppError::Configuration(format!(
                            "issue type '{tracker_type}' maps to unknown action kind '{kind}'"
                        ))
                    })
            })
            .collect::<AppResult<BTreeMap<_, _>>>()?;

        let output_path = overrides
            .output
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));
        let output_path = if output_path.is_absolute() {
            output_path
        } else {
            workspace_hint.join(output_path)
        };

        let timeout_secs = overrides
            .timeout_secs
            .or(stored.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            tracker_url: overrides
                .tracker_url
                .or(stored.tracker_url)
                .unwrap_or_else(|| DEFAULT_TRACKER_URL.to_string()),
            tracker_username: overrides.tracker_username.or(stored.tracker_username),
            tracker_token: overrides.tracker_token.or(stored.tracker_token),
            project,
            milestone_label_prefix: stored
                .milestone_label_prefix
                .unwrap_or_else(|| DEFAULT_MILESTONE_LABEL_PREFIX.to_string()),
            type_label_prefix: stored
                .type_label_prefix
                .unwrap_or_else(|| DEFAULT_TYPE_LABEL_PREFIX.to_string()),
            issue_types,
            request_timeout: Duration::from_secs(timeout_secs),
            output_path,
        })
    }
}
