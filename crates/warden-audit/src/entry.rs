use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    SessionStarted,
    SessionEnded,
    CommandExecuted,
    FileAccessed,
    FileModified,
    FileDeleted,
    NetworkRequest,
    SudoExecuted,
    SecurityViolation,
    ApprovalRequested,
    ApprovalGranted,
    ApprovalDenied,
    ApprovalExpired,
    ConfigurationChanged,
    MemoryUpdated,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::SessionEnded => "session_ended",
            Self::CommandExecuted => "command_executed",
            Self::FileAccessed => "file_accessed",
            Self::FileModified => "file_modified",
            Self::FileDeleted => "file_deleted",
            Self::NetworkRequest => "network_request",
            Self::SudoExecuted => "sudo_executed",
            Self::SecurityViolation => "security_violation",
            Self::ApprovalRequested => "approval_requested",
            Self::ApprovalGranted => "approval_granted",
            Self::ApprovalDenied => "approval_denied",
            Self::ApprovalExpired => "approval_expired",
            Self::ConfigurationChanged => "configuration_changed",
            Self::MemoryUpdated => "memory_updated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "session_started" => Some(Self::SessionStarted),
            "session_ended" => Some(Self::SessionEnded),
            "command_executed" => Some(Self::CommandExecuted),
            "file_accessed" => Some(Self::FileAccessed),
            "file_modified" => Some(Self::FileModified),
            "file_deleted" => Some(Self::FileDeleted),
            "network_request" => Some(Self::NetworkRequest),
            "sudo_executed" => Some(Self::SudoExecuted),
            "security_violation" => Some(Self::SecurityViolation),
            "approval_requested" => Some(Self::ApprovalRequested),
            "approval_granted" => Some(Self::ApprovalGranted),
            "approval_denied" => Some(Self::ApprovalDenied),
            "approval_expired" => Some(Self::ApprovalExpired),
            "configuration_changed" => Some(Self::ConfigurationChanged),
            "memory_updated" => Some(Self::MemoryUpdated),
            _ => None,
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious it was. Handler success → info, handler failure → error,
/// policy block → critical, approval timeout → warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// How the action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult {
    Success,
    Failure,
    Blocked,
    Partial,
}

impl ActionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Blocked => "blocked",
            Self::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "blocked" => Some(Self::Blocked),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// One immutable record of a security-relevant event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub kind: AuditEventKind,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub agent_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    /// Operating-system user the process runs as.
    pub user: String,
    pub action: String,
    pub target: Option<String>,
    pub result: ActionResult,
    /// Optional structured detail (arguments, exit codes, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Map<String, serde_json::Value>>,
    pub host: String,
}

impl AuditEntry {
    pub fn new(
        kind: AuditEventKind,
        severity: Severity,
        action: impl Into<String>,
        result: ActionResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            timestamp: Utc::now(),
            agent_id: None,
            session_id: None,
            user: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".into()),
            action: action.into(),
            target: None,
            result,
            detail: None,
            host: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into()),
        }
    }

    pub fn with_agent(mut self, agent_id: Uuid) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: serde_json::Value) -> Self {
        self.detail
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}
