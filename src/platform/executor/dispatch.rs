use super::{ExecuteAck, Executor};
use crate::error::is_retryable_status;
use std::future::Future;
use std::pin::Pin;

pub type DispatchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExecuteAck, DispatchFailure>> + Send + 'a>>;

/// Why a dispatch did not produce an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// Transport error, 5xx or 429: try again next cycle.
    Retryable {
        status: Option<u16>,
        message: String,
    },
    /// Any other rejection: the schedule advances anyway.
    Terminal { status: u16, message: String },
}

impl DispatchFailure {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_retryable_status(status) {
            Self::Retryable {
                status: Some(status),
                message,
            }
        } else {
            Self::Terminal { status, message }
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Retryable {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Retryable { status, .. } => *status,
            Self::Terminal { status, .. } => Some(*status),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Retryable { message, .. } | Self::Terminal { message, .. } => message,
        }
    }
}

impl std::fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status() {
            Some(status) => write!(f, "executor returned {status}: {}", self.message()),
            None => write!(f, "executor unreachable: {}", self.message()),
        }
    }
}

/// How the dispatcher reaches an executor: in process, or over HTTP.
pub trait ExecutorDispatch: Send + Sync {
    fn dispatch<'a>(&'a self, job_id: &'a str) -> DispatchFuture<'a>;
}

impl ExecutorDispatch for Executor {
    fn dispatch<'a>(&'a self, job_id: &'a str) -> DispatchFuture<'a> {
        Box::pin(async move {
            self.execute(job_id)
                .await
                .map_err(|error| DispatchFailure::from_status(error.status_code(), error.to_string()))
        })
    }
}
