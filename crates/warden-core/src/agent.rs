use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::SecurityPolicy;

/// Which LLM backend an agent talks to. The client implementation behind the
/// tag is installed by the host; the core only routes the tag through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    OpenAi,
    Anthropic,
    Gemini,
    #[default]
    Ollama,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

/// Immutable-per-run view of a configured agent.
///
/// The agent store owns the canonical record; the execution engine consumes
/// a snapshot per session and mutates only its own copy (via `update_self`),
/// never the stored agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: Uuid,
    pub name: String,
    pub provider: ProviderTag,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Tool names this agent may use outside agent mode.
    pub enabled_tools: Vec<String>,
    pub policy: SecurityPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentSnapshot {
    pub fn new(name: impl Into<String>, provider: ProviderTag, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            provider,
            model: model.into(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 4096,
            enabled_tools: vec![],
            policy: SecurityPolicy::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_policy(mut self, policy: SecurityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.enabled_tools = tools.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}
