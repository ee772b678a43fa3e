use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ObservabilityConfig {
    /// Resolve the configured level, falling back to INFO on unknown names.
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level
            .trim()
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}
