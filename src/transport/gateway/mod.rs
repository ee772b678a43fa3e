//! Axum HTTP surface for the external trigger and operators.
//!
//! - `GET  /health`: component health, unauthenticated
//! - `POST /scheduler`: one dispatcher cycle
//! - `POST /executor`: execute one job (`{job_id}`)
//! - `POST /judge`: grade one run (`{run_id}`)
//!
//! Every POST route requires `Authorization: Bearer <internal token>`.
//! Bodies are capped at 64KB and requests time out after 30s.

mod auth;
mod handlers;
mod server;

pub use server::{build_app, run_gateway, run_gateway_with_listener};

use crate::platform::cron::Dispatcher;
use crate::platform::executor::Executor;
use crate::platform::judge::Judge;
use std::sync::Arc;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub executor: Executor,
    pub judge: Judge,
    /// Shared secret expected in the bearer header; `None` rejects every
    /// authenticated route.
    pub internal_token: Option<Arc<str>>,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct ExecuteBody {
    pub job_id: String,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct JudgeBody {
    pub run_id: String,
}
