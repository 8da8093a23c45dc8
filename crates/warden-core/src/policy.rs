use serde::{Deserialize, Serialize};

use crate::risk::RiskLevel;

/// Per-agent security policy controlling what the agent may do unattended.
///
/// A denylist match always overrides an allowlist match; an empty allowlist
/// means "any command".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Whether shell commands may start with a privilege-elevation token.
    pub allow_privileged_shell: bool,
    /// When true, every tool call goes to the approval queue regardless of risk.
    pub require_approval: bool,
    /// Command prefixes the agent may run. Empty = any command.
    pub command_allowlist: Vec<String>,
    /// Substrings that block a command or path outright.
    pub command_denylist: Vec<String>,
    /// Path prefixes that escalate a call's risk to at least `high`.
    pub restricted_paths: Vec<String>,
    /// Wall-clock ceiling per tool call, and the approval-wait window.
    pub max_execution_time_secs: u64,
    /// Highest risk level the engine approves without asking a human.
    pub auto_approve_ceiling: RiskLevel,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allow_privileged_shell: false,
            require_approval: false,
            command_allowlist: vec![],
            command_denylist: vec![],
            restricted_paths: vec![
                "/etc".into(),
                "/System".into(),
                "/usr/bin".into(),
                "/usr/sbin".into(),
                "/private/var".into(),
                "~/.ssh".into(),
                "~/.aws".into(),
                "~/.gnupg".into(),
            ],
            max_execution_time_secs: 60,
            auto_approve_ceiling: RiskLevel::Medium,
        }
    }
}

impl SecurityPolicy {
    /// A policy that asks a human for everything.
    pub fn paranoid() -> Self {
        Self {
            require_approval: true,
            auto_approve_ceiling: RiskLevel::Low,
            ..Self::default()
        }
    }

    /// A policy that auto-approves everything the denylist does not block.
    pub fn unattended() -> Self {
        Self {
            require_approval: false,
            auto_approve_ceiling: RiskLevel::Critical,
            ..Self::default()
        }
    }
}
