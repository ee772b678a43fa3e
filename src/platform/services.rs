use super::cron::{Dispatcher, DispatcherSettings, JobStore, SqliteJobStore};
use super::executor::{Executor, ExecutorDispatch, ExecutorSettings};
use super::judge::{Judge, JudgeSettings};
use crate::config::Config;
use crate::llm::{OpenRouterProvider, Provider};
use crate::transport::HttpExecutorClient;
use crate::transport::gateway::AppState;
use anyhow::Result;
use std::sync::Arc;

/// Every long-lived component wired from one config.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<SqliteJobStore>,
    pub executor: Executor,
    pub judge: Judge,
    pub dispatcher: Arc<Dispatcher>,
    internal_token: Option<Arc<str>>,
}

impl Services {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteJobStore::open(&config.resolved_database_path()).await?);
        let provider: Arc<dyn Provider> = Arc::new(OpenRouterProvider::new(
            config.secrets.openrouter_api_key.as_deref(),
            &config.executor.openrouter_base_url,
            config.executor.model_timeout_secs,
        ));
        Ok(Self::assemble(config, store, provider))
    }

    pub(crate) fn assemble(
        config: &Config,
        store: Arc<SqliteJobStore>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let shared: Arc<dyn JobStore> = store.clone();
        let judge = Judge::new(
            Arc::clone(&shared),
            Arc::clone(&provider),
            JudgeSettings::from_config(&config.judge),
        );
        let executor = Executor::new(
            Arc::clone(&shared),
            provider,
            judge.clone(),
            ExecutorSettings::from_config(config),
        );

        let internal_token = config
            .secrets
            .internal_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let target: Arc<dyn ExecutorDispatch> = match config.scheduler.executor_url.as_deref() {
            Some(url) => {
                tracing::info!("Dispatching due jobs to remote executor at {url}");
                Arc::new(HttpExecutorClient::new(
                    url,
                    internal_token.unwrap_or_default(),
                    config.scheduler.dispatch_timeout_secs,
                ))
            }
            None => Arc::new(executor.clone()),
        };
        let dispatcher = Arc::new(Dispatcher::new(
            shared,
            target,
            DispatcherSettings::from_config(config),
        ));

        Self {
            store,
            executor,
            judge,
            dispatcher,
            internal_token: internal_token.map(Arc::from),
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            executor: self.executor.clone(),
            judge: self.judge.clone(),
            internal_token: self.internal_token.clone(),
        }
    }

    /// Wait for detached executor and judge work to finish.
    pub async fn drain(&self) {
        self.executor.wait_idle().await;
        self.judge.wait_idle().await;
    }
}
