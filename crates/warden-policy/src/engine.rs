use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use warden_core::{RiskLevel, SecurityPolicy, ToolCall, ToolDescriptor};

/// What the engine decided for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyDecision {
    Allow,
    Ask,
    Block,
}

/// The full verdict: decision, effective risk, and the strings that end up
/// on an approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub decision: PolicyDecision,
    pub risk: RiskLevel,
    /// Tied to the highest-triggering rule.
    pub reasoning: String,
    /// Concrete side effect, e.g. "files will be permanently deleted".
    pub impact: String,
}

/// Shell patterns that are blocked outright, whatever the policy says.
const CATASTROPHIC_PATTERNS: &[&str] = &[
    "rm -rf /",
    "dd if=/dev/zero",
    ":(){ :|:& };:",
    "chmod -R 777",
    "chown -R",
    "mkfs",
    "format",
    "> /dev/sda",
    "mv /* /dev/null",
];

/// Tokens that mark a privilege-elevated shell command.
const PRIVILEGE_TOKENS: &[&str] = &["sudo ", "doas "];

/// Verbs that delete data when they appear in a shell command.
const DELETION_VERBS: &[&str] = &["rm ", "rmdir ", "del ", "unlink "];

/// Verbs that change ownership or permission bits.
const PERMISSION_VERBS: &[&str] = &["chmod ", "chown ", "chgrp "];

/// Pure, deterministic policy evaluation. No I/O, no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one tool call against an agent's policy.
    ///
    /// Rule order is fixed: denylist, privilege check, allowlist gate, risk
    /// classification, auto-approve decision. A denylist match always wins,
    /// regardless of allowlist content.
    pub fn evaluate(
        &self,
        tool: &ToolDescriptor,
        call: &ToolCall,
        policy: &SecurityPolicy,
    ) -> PolicyVerdict {
        let command = call.arg("command").unwrap_or("");
        let path = call
            .arg("path")
            .or_else(|| call.arg("target"))
            .or_else(|| call.arg("destination"))
            .unwrap_or("");

        // 1. Denylist scan — policy substrings plus the fixed catastrophic set.
        for needle in &policy.command_denylist {
            if !needle.is_empty() && (command.contains(needle) || path.contains(needle)) {
                warn!(tool = %tool.name, needle = %needle, "denylist match");
                return self.block(
                    format!("matches denylist entry '{needle}'"),
                    tool,
                    command,
                    path,
                    RiskLevel::Critical,
                );
            }
        }
        for pattern in CATASTROPHIC_PATTERNS {
            if command.contains(pattern) {
                warn!(tool = %tool.name, pattern = %pattern, "catastrophic pattern match");
                return self.block(
                    "matches critical pattern".to_string(),
                    tool,
                    command,
                    path,
                    RiskLevel::Critical,
                );
            }
        }

        // 2. Privilege check.
        let privileged = PRIVILEGE_TOKENS.iter().any(|t| command.starts_with(t));
        if privileged && !policy.allow_privileged_shell {
            return self.block(
                "privileged shell commands are not allowed for this agent".to_string(),
                tool,
                command,
                path,
                RiskLevel::High,
            );
        }

        // 3. Allowlist gate. Empty allowlist means "any command".
        if !command.is_empty()
            && !policy.command_allowlist.is_empty()
            && !policy
                .command_allowlist
                .iter()
                .any(|prefix| command.starts_with(prefix.as_str()))
        {
            return self.block(
                "command does not match the agent's allowlist".to_string(),
                tool,
                command,
                path,
                RiskLevel::High,
            );
        }

        // 4. Risk classification — intrinsic risk is a floor, never lowered.
        let mut risk = tool.risk_level;
        let mut reasoning = format!("intrinsic risk of tool '{}'", tool.name);

        if has_deletion_verb(command) || has_permission_verb(command) {
            if risk < RiskLevel::Medium {
                reasoning = "command contains a deletion or permission-change verb".into();
            }
            risk = risk.at_least(RiskLevel::Medium);
        }
        if let Some(prefix) = restricted_prefix(path, policy) {
            if risk < RiskLevel::High {
                reasoning = format!("path '{path}' touches restricted prefix '{prefix}'");
            }
            risk = risk.at_least(RiskLevel::High);
        }
        if privileged {
            if risk < RiskLevel::High {
                reasoning = "privileged shell command".into();
            }
            risk = risk.at_least(RiskLevel::High);
        }

        // 5. Auto-approve decision.
        let decision = if !policy.require_approval && risk <= policy.auto_approve_ceiling {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Ask
        };
        debug!(tool = %tool.name, ?decision, %risk, "policy verdict");

        PolicyVerdict {
            decision,
            risk,
            impact: estimate_impact(tool, command, path, privileged),
            reasoning,
        }
    }

    fn block(
        &self,
        reasoning: String,
        tool: &ToolDescriptor,
        command: &str,
        path: &str,
        risk: RiskLevel,
    ) -> PolicyVerdict {
        let privileged = PRIVILEGE_TOKENS.iter().any(|t| command.starts_with(t));
        PolicyVerdict {
            decision: PolicyDecision::Block,
            risk,
            impact: estimate_impact(tool, command, path, privileged),
            reasoning,
        }
    }
}

fn has_deletion_verb(command: &str) -> bool {
    DELETION_VERBS.iter().any(|v| command.contains(v))
}

fn has_permission_verb(command: &str) -> bool {
    PERMISSION_VERBS.iter().any(|v| command.contains(v))
}

/// The restricted-path prefix the given path falls under, if any.
/// `~`-prefixed entries are matched against the expanded home directory too.
fn restricted_prefix<'a>(path: &str, policy: &'a SecurityPolicy) -> Option<&'a str> {
    if path.is_empty() {
        return None;
    }
    let home = std::env::var("HOME").unwrap_or_default();
    policy.restricted_paths.iter().map(String::as_str).find(|prefix| {
        if path.starts_with(prefix) {
            return true;
        }
        if let Some(rest) = prefix.strip_prefix('~') {
            if !home.is_empty() && path.starts_with(&format!("{home}{rest}")) {
                return true;
            }
        }
        false
    })
}

fn estimate_impact(tool: &ToolDescriptor, command: &str, path: &str, privileged: bool) -> String {
    if tool.name == "delete_file" || has_deletion_verb(command) {
        return "files will be permanently deleted".into();
    }
    if privileged || has_permission_verb(command) {
        return "system-wide changes may occur".into();
    }
    if !path.is_empty() {
        return format!("Target: {path}");
    }
    if !command.is_empty() {
        return format!("Target: {command}");
    }
    format!("Target: {}", tool.name)
}
