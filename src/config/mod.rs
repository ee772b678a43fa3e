pub mod schema;

pub use schema::{
    Config, ExecutorConfig, GatewayConfig, JudgeConfig, ObservabilityConfig, ReliabilityConfig,
    SchedulerConfig, SecretsConfig,
};
