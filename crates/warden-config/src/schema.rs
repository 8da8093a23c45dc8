use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use warden_core::{ProviderTag, RiskLevel, SecurityPolicy};

/// Root configuration — maps to `warden.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub llm: LlmSettings,
    pub security: SecuritySettings,
    pub audit: AuditSettings,
    pub memory: MemorySettings,
    pub logging: LoggingSettings,
}

// ── LLM ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub default_provider: ProviderTag,
    pub default_model: String,
    /// Base URL for the Ollama-compatible adapter.
    pub ollama_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderTag::Ollama,
            default_model: "llama3.1".into(),
            ollama_url: "http://localhost:11434".into(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

// ── Security ───────────────────────────────────────────────────

/// The default security policy applied to agents that don't carry their own.
/// Mirrors [`SecurityPolicy`] field for field so the TOML reads naturally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub allow_privileged_shell: bool,
    pub require_approval: bool,
    pub command_allowlist: Vec<String>,
    pub command_denylist: Vec<String>,
    pub restricted_paths: Vec<String>,
    pub max_execution_time_secs: u64,
    pub auto_approve_ceiling: RiskLevel,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        let policy = SecurityPolicy::default();
        Self {
            allow_privileged_shell: policy.allow_privileged_shell,
            require_approval: policy.require_approval,
            command_allowlist: policy.command_allowlist,
            command_denylist: policy.command_denylist,
            restricted_paths: policy.restricted_paths,
            max_execution_time_secs: policy.max_execution_time_secs,
            auto_approve_ceiling: policy.auto_approve_ceiling,
        }
    }
}

impl SecuritySettings {
    pub fn to_policy(&self) -> SecurityPolicy {
        SecurityPolicy {
            allow_privileged_shell: self.allow_privileged_shell,
            require_approval: self.require_approval,
            command_allowlist: self.command_allowlist.clone(),
            command_denylist: self.command_denylist.clone(),
            restricted_paths: self.restricted_paths.clone(),
            max_execution_time_secs: self.max_execution_time_secs,
            auto_approve_ceiling: self.auto_approve_ceiling,
        }
    }
}

// ── Audit ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Path to the audit journal database.
    pub db_path: PathBuf,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("audit.db"),
        }
    }
}

// ── Memory ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Path to the memory store file.
    pub file_path: PathBuf,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            file_path: data_dir().join("memory.json"),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Tracing filter, e.g. "info" or "warden_engine=debug,info".
    pub level: String,
    /// "pretty" or "json".
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warden")
}

impl WardenConfig {
    /// Validate the configuration. Returns warnings for values that were
    /// coerced; errors for values that cannot work at all.
    pub fn validate(&mut self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if self.security.max_execution_time_secs == 0 {
            return Err("security.max_execution_time_secs must be at least 1".into());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            let clamped = self.llm.temperature.clamp(0.0, 2.0);
            warnings.push(format!(
                "llm.temperature {} out of [0, 2], clamped to {clamped}",
                self.llm.temperature
            ));
            self.llm.temperature = clamped;
        }
        if self.llm.max_tokens == 0 {
            return Err("llm.max_tokens must be at least 1".into());
        }
        Ok(warnings)
    }
}
