//! Process-wide component health registry.
//!
//! Long-running pieces (gateway, dispatcher ticker) and one-shot work
//! (executor and judge background tasks) report here; `/health` and the
//! `status` command render the snapshot.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentStatus {
    Starting,
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub updated_at: String,
    pub last_ok: Option<String>,
    pub last_error: Option<String>,
    pub ok_count: u64,
    pub error_count: u64,
    pub restart_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// "ok" when no component is currently in error, "degraded" otherwise
    pub status: &'static str,
    pub pid: u32,
    pub updated_at: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, ComponentHealth>,
}

struct HealthRegistry {
    started_at: Instant,
    components: RwLock<BTreeMap<String, ComponentHealth>>,
}

static REGISTRY: OnceLock<HealthRegistry> = OnceLock::new();

fn registry() -> &'static HealthRegistry {
    REGISTRY.get_or_init(|| HealthRegistry {
        started_at: Instant::now(),
        components: RwLock::new(BTreeMap::new()),
    })
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn upsert_component<F>(component: &str, update: F)
where
    F: FnOnce(&mut ComponentHealth),
{
    if let Ok(mut map) = registry().components.write() {
        let now = now_rfc3339();
        let entry = map
            .entry(component.to_string())
            .or_insert_with(|| ComponentHealth {
                status: ComponentStatus::Starting,
                updated_at: now.clone(),
                last_ok: None,
                last_error: None,
                ok_count: 0,
                error_count: 0,
                restart_count: 0,
            });
        update(entry);
        entry.updated_at = now;
    }
}

pub fn mark_component_starting(component: &str) {
    upsert_component(component, |entry| {
        entry.status = ComponentStatus::Starting;
    });
}

pub fn mark_component_ok(component: &str) {
    upsert_component(component, |entry| {
        entry.status = ComponentStatus::Ok;
        entry.last_ok = Some(now_rfc3339());
        entry.last_error = None;
        entry.ok_count = entry.ok_count.saturating_add(1);
    });
}

#[allow(clippy::needless_pass_by_value)]
pub fn mark_component_error(component: &str, error: impl ToString) {
    let err = error.to_string();
    upsert_component(component, move |entry| {
        entry.status = ComponentStatus::Error;
        entry.last_error = Some(err);
        entry.error_count = entry.error_count.saturating_add(1);
    });
}

pub fn bump_component_restart(component: &str) {
    upsert_component(component, |entry| {
        entry.restart_count = entry.restart_count.saturating_add(1);
    });
}

pub fn snapshot() -> HealthSnapshot {
    let components = registry()
        .components
        .read()
        .map_or_else(|_| BTreeMap::new(), |map| map.clone());
    let degraded = components
        .values()
        .any(|c| c.status == ComponentStatus::Error);

    HealthSnapshot {
        status: if degraded { "degraded" } else { "ok" },
        pid: std::process::id(),
        updated_at: now_rfc3339(),
        uptime_seconds: registry().started_at.elapsed().as_secs(),
        components,
    }
}

pub fn snapshot_json() -> serde_json::Value {
    serde_json::to_value(snapshot()).unwrap_or_else(|_| {
        serde_json::json!({
            "status": "error",
            "message": "failed to serialize health snapshot"
        })
    })
}
