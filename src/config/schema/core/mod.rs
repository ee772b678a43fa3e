mod env_overrides;
mod loader;
mod types;
mod validation;

#[cfg(test)]
mod test_env;

pub use types::{Config, ReliabilityConfig, SecretsConfig};
