mod core;
mod gateway;
mod observability;
mod scheduler;

pub use self::core::{Config, ReliabilityConfig, SecretsConfig};
pub use gateway::GatewayConfig;
pub use observability::ObservabilityConfig;
pub use scheduler::{
    DEFAULT_STALE_LOCK_TIMEOUT_MINUTES, ExecutorConfig, JudgeConfig, MIN_POLL_SECS,
    SchedulerConfig,
};
