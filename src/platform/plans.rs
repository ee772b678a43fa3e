//! Subscription tiers and the model/schedule allowances they unlock.

use crate::platform::cron::{ScheduleKind, classify};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl PlanTier {
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Pro, PlanTier::Enterprise];

    /// Stored tier strings are user-controlled; anything unknown is free.
    pub fn from_db(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }

    pub fn as_db(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn monthly_credits(self) -> i64 {
        match self {
            Self::Free => 2,
            Self::Pro => 10,
            Self::Enterprise => 1000,
        }
    }

    pub fn search_context_size(self) -> SearchContextSize {
        match self {
            Self::Free => SearchContextSize::Medium,
            Self::Pro | Self::Enterprise => SearchContextSize::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchContextSize {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy)]
pub struct ModelFamily {
    pub id: &'static str,
    pub name: &'static str,
    pub free: &'static str,
    pub pro: &'static str,
    pub enterprise: &'static str,
    /// Upstream routing order; empty lets the router choose.
    pub preferred_providers: &'static [&'static str],
}

impl ModelFamily {
    pub fn model_for(&self, tier: PlanTier) -> &'static str {
        match tier {
            PlanTier::Free => self.free,
            PlanTier::Pro => self.pro,
            PlanTier::Enterprise => self.enterprise,
        }
    }

    fn offers(&self, model: &str) -> bool {
        self.free == model || self.pro == model || self.enterprise == model
    }
}

pub const MODEL_FAMILIES: &[ModelFamily] = &[
    ModelFamily {
        id: "anthropic",
        name: "Anthropic",
        free: "anthropic/claude-haiku-4.5",
        pro: "anthropic/claude-sonnet-4.6",
        enterprise: "anthropic/claude-sonnet-4.6",
        preferred_providers: &["Anthropic"],
    },
    ModelFamily {
        id: "openai",
        name: "OpenAI",
        free: "openai/gpt-5-nano",
        pro: "openai/gpt-5.2",
        enterprise: "openai/gpt-5.2",
        preferred_providers: &["OpenAI"],
    },
    ModelFamily {
        id: "google",
        name: "Google",
        free: "google/gemini-3-flash-preview",
        pro: "google/gemini-3.1-pro-preview",
        enterprise: "google/gemini-3.1-pro-preview",
        preferred_providers: &[],
    },
    ModelFamily {
        id: "xai",
        name: "xAI",
        free: "x-ai/grok-4.1-fast",
        pro: "x-ai/grok-4",
        enterprise: "x-ai/grok-4",
        preferred_providers: &[],
    },
    ModelFamily {
        id: "mistral",
        name: "Mistral",
        free: "mistralai/ministral-8b-2512",
        pro: "mistralai/ministral-14b-2512",
        enterprise: "mistralai/ministral-14b-2512",
        preferred_providers: &[],
    },
    ModelFamily {
        id: "qwen",
        name: "Qwen",
        free: "qwen/qwen3.5-flash-02-23",
        pro: "qwen/qwen3-max-thinking",
        enterprise: "qwen/qwen3-max-thinking",
        preferred_providers: &[],
    },
    ModelFamily {
        id: "deepseek",
        name: "DeepSeek",
        free: "deepseek/deepseek-v3.2",
        pro: "deepseek/deepseek-v3.2",
        enterprise: "deepseek/deepseek-v3.2",
        preferred_providers: &[],
    },
    ModelFamily {
        id: "xiaomi",
        name: "Xiaomi",
        free: "xiaomi/mimo-v2-flash",
        pro: "xiaomi/mimo-v2-flash",
        enterprise: "xiaomi/mimo-v2-flash",
        preferred_providers: &[],
    },
    ModelFamily {
        id: "perplexity",
        name: "Perplexity",
        free: "perplexity/sonar",
        pro: "perplexity/sonar-deep-research",
        enterprise: "perplexity/sonar-deep-research",
        preferred_providers: &[],
    },
    ModelFamily {
        id: "llama",
        name: "Meta Llama",
        free: "meta-llama/llama-4-scout",
        pro: "meta-llama/llama-4-maverick",
        enterprise: "meta-llama/llama-4-maverick",
        preferred_providers: &[],
    },
];

pub fn family_for_model(model: &str) -> Option<&'static ModelFamily> {
    MODEL_FAMILIES.iter().find(|family| family.offers(model))
}

/// A model is allowed when some family resolves to it at `tier` or below.
pub fn is_model_allowed(model: &str, tier: PlanTier) -> bool {
    PlanTier::ALL
        .iter()
        .filter(|candidate| **candidate <= tier)
        .any(|candidate| {
            MODEL_FAMILIES
                .iter()
                .any(|family| family.model_for(*candidate) == model)
        })
}

pub fn preferred_providers(model: &str) -> &'static [&'static str] {
    family_for_model(model)
        .map(|family| family.preferred_providers)
        .unwrap_or_default()
}

/// Tiers that may pick a schedule of this kind.
pub fn schedule_tiers(kind: ScheduleKind) -> &'static [PlanTier] {
    match kind {
        ScheduleKind::Manual | ScheduleKind::Monthly => &PlanTier::ALL,
        ScheduleKind::Daily | ScheduleKind::Weekly => &[PlanTier::Pro, PlanTier::Enterprise],
        ScheduleKind::Custom => &[PlanTier::Enterprise],
    }
}

pub fn is_schedule_allowed(expression: &str, tier: PlanTier) -> bool {
    schedule_tiers(classify(expression)).contains(&tier)
}

/// Rough monthly run count used to warn about credit exhaustion.
pub fn estimate_monthly_runs(expression: &str) -> u32 {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return 0;
    }
    if fields.iter().all(|field| *field == "*") {
        return 43_200;
    }
    match classify(expression) {
        ScheduleKind::Manual => 0,
        ScheduleKind::Weekly => 4,
        ScheduleKind::Monthly => 1,
        ScheduleKind::Daily | ScheduleKind::Custom => 30,
    }
}
