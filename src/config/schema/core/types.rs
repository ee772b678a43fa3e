use super::super::{
    ExecutorConfig, GatewayConfig, JudgeConfig, ObservabilityConfig, SchedulerConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub(super) const DATABASE_FILE_NAME: &str = "promptwatch.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Explicit database location; defaults to `<workspace>/promptwatch.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub judge: JudgeConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Shared bearer secret for internal triggers (scheduler, executor, judge)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_component_backoff_secs")]
    pub component_initial_backoff_secs: u64,
    #[serde(default = "default_component_backoff_max_secs")]
    pub component_max_backoff_secs: u64,
    /// Restart attempts before a supervised component is abandoned (0 = unlimited)
    #[serde(default)]
    pub component_max_restarts: u32,
}

fn default_component_backoff_secs() -> u64 {
    2
}

fn default_component_backoff_max_secs() -> u64 {
    60
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            component_initial_backoff_secs: default_component_backoff_secs(),
            component_max_backoff_secs: default_component_backoff_max_secs(),
            component_max_restarts: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            directories::UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let promptwatch_dir = home.join(".promptwatch");

        Self {
            workspace_dir: promptwatch_dir.join("workspace"),
            config_path: promptwatch_dir.join("config.toml"),
            database_path: None,
            secrets: SecretsConfig::default(),
            gateway: GatewayConfig::default(),
            scheduler: SchedulerConfig::default(),
            executor: ExecutorConfig::default(),
            judge: JudgeConfig::default(),
            reliability: ReliabilityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.workspace_dir.join(DATABASE_FILE_NAME))
    }
}
