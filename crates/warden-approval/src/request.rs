use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_core::{ApprovalOutcome, RiskLevel, ToolCall};

/// Lifecycle of an approval request. `Pending` is the only non-terminal
/// state; once terminal a request never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
    Modified,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The step-log outcome for a terminal status.
    pub fn outcome(&self) -> Option<ApprovalOutcome> {
        match self {
            Self::Approved => Some(ApprovalOutcome::Approved),
            Self::Modified => Some(ApprovalOutcome::Modified),
            Self::Denied => Some(ApprovalOutcome::Denied),
            Self::Expired => Some(ApprovalOutcome::Expired),
            Self::Pending => None,
        }
    }
}

/// What the human decided, if anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDecision {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    /// Replacement for the call's `command` argument, when the human edits
    /// the action instead of approving it verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_command: Option<String>,
}

/// A parked `ask` decision awaiting a human transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub session_id: Uuid,
    pub agent_id: Uuid,
    pub call: ToolCall,
    pub risk: RiskLevel,
    pub reasoning: String,
    pub impact: String,
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<UserDecision>,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// `timeout_secs` is clamped to at least one second so that
    /// `expires_at > requested_at` always holds.
    pub fn new(
        session_id: Uuid,
        agent_id: Uuid,
        call: ToolCall,
        risk: RiskLevel,
        reasoning: impl Into<String>,
        impact: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let requested_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            agent_id,
            call,
            risk,
            reasoning: reasoning.into(),
            impact: impact.into(),
            status: ApprovalStatus::Pending,
            decision: None,
            requested_at,
            decided_at: None,
            expires_at: requested_at + Duration::seconds(timeout_secs.max(1) as i64),
        }
    }
}
