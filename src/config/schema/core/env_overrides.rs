use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(workspace) = std::env::var("PROMPTWATCH_WORKSPACE")
            && !workspace.is_empty()
        {
            self.workspace_dir = PathBuf::from(workspace);
        }

        if let Ok(database) = std::env::var("PROMPTWATCH_DATABASE")
            && !database.is_empty()
        {
            self.database_path = Some(PathBuf::from(database));
        }

        if let Ok(token) = std::env::var("PROMPTWATCH_INTERNAL_TOKEN")
            && !token.is_empty()
        {
            self.secrets.internal_token = Some(token);
        }

        if let Ok(key) = std::env::var("OPENROUTER_API_KEY")
            && !key.is_empty()
        {
            self.secrets.openrouter_api_key = Some(key);
        }

        if let Ok(minutes_str) = std::env::var("PROMPT_STALE_LOCK_TIMEOUT_MINUTES")
            && let Ok(minutes) = minutes_str.trim().parse::<u64>()
            && minutes > 0
        {
            self.scheduler.stale_lock_timeout_minutes = minutes;
        }

        if let Ok(port_str) =
            std::env::var("PROMPTWATCH_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) =
            std::env::var("PROMPTWATCH_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(url) = std::env::var("PROMPTWATCH_EXECUTOR_URL")
            && !url.is_empty()
        {
            self.scheduler.executor_url = Some(url);
        }

        if let Ok(level) = std::env::var("PROMPTWATCH_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }
    }
}
