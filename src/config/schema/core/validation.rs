use super::Config;
use crate::error::ConfigError;

impl Config {
    /// Structural checks that hold for every command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.stale_lock_timeout_minutes == 0 {
            return Err(ConfigError::Validation(
                "scheduler.stale_lock_timeout_minutes must be positive".into(),
            ));
        }
        if self.scheduler.backoff_cap_minutes == 0 {
            return Err(ConfigError::Validation(
                "scheduler.backoff_cap_minutes must be positive".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.judge.temperature) {
            return Err(ConfigError::Validation(format!(
                "judge.temperature must be within 0.0..=2.0, got {}",
                self.judge.temperature
            )));
        }
        if let Some(raw) = self.scheduler.executor_url.as_deref() {
            let parsed = url::Url::parse(raw).map_err(|e| {
                ConfigError::Validation(format!("scheduler.executor_url is not a URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!(
                    "scheduler.executor_url must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }
        url::Url::parse(&self.executor.openrouter_base_url).map_err(|e| {
            ConfigError::Validation(format!("executor.openrouter_base_url is not a URL: {e}"))
        })?;
        Ok(())
    }

    /// Secrets required before any command that talks to the store's jobs
    /// or to upstream models. Missing values are fatal at startup.
    pub fn validate_for_service(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self
            .secrets
            .internal_token
            .as_deref()
            .is_none_or(|t| t.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "secrets.internal_token is required (or set PROMPTWATCH_INTERNAL_TOKEN)".into(),
            ));
        }
        if self
            .secrets
            .openrouter_api_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "secrets.openrouter_api_key is required (or set OPENROUTER_API_KEY)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_ready() -> Config {
        let mut config = Config::default();
        config.secrets.internal_token = Some("internal".into());
        config.secrets.openrouter_api_key = Some("sk-or-test".into());
        config
    }

    #[test]
    fn defaults_pass_structural_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn missing_internal_token_is_fatal() {
        let mut config = service_ready();
        config.secrets.internal_token = None;
        let err = config.validate_for_service().unwrap_err();
        assert!(err.to_string().contains("internal_token"));
    }

    #[test]
    fn blank_api_key_is_fatal() {
        let mut config = service_ready();
        config.secrets.openrouter_api_key = Some("  ".into());
        let err = config.validate_for_service().unwrap_err();
        assert!(err.to_string().contains("openrouter_api_key"));
    }

    #[test]
    fn executor_url_must_be_http() {
        let mut config = service_ready();
        config.scheduler.executor_url = Some("ftp://example.com/executor".into());
        assert!(config.validate().is_err());

        config.scheduler.executor_url = Some("https://example.com/executor".into());
        assert!(config.validate_for_service().is_ok());
    }

    #[test]
    fn zero_stale_timeout_is_rejected() {
        let mut config = service_ready();
        config.scheduler.stale_lock_timeout_minutes = 0;
        assert!(config.validate().is_err());
    }
}
