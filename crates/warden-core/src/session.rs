use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::risk::RiskLevel;
use crate::tool::ToolCall;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// The terminal outcome handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome recorded on an `ApprovalDecision` step. Mirrors the terminal
/// approval states without pulling the queue crate into core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalOutcome {
    Approved,
    Modified,
    Denied,
    Expired,
}

/// One entry in a session's append-only step log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepKind {
    Thinking,
    ModelResponse {
        text: String,
        tool_calls: usize,
    },
    ToolCall {
        call: ToolCall,
        risk: RiskLevel,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        output: String,
    },
    ApprovalRequested {
        request_id: Uuid,
        tool_name: String,
        risk: RiskLevel,
    },
    ApprovalDecision {
        request_id: Uuid,
        outcome: ApprovalOutcome,
    },
    ScreenshotObservation {
        byte_len: usize,
    },
    Error {
        message: String,
    },
}

/// One end-to-end execution of an agent on a user prompt.
///
/// Owned exclusively by the execution engine while it runs; steps are
/// append-only and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub prompt: String,
    pub steps: Vec<ExecutionStep>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl ExecutionSession {
    pub fn new(agent_id: Uuid, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            prompt: prompt.into(),
            steps: vec![],
            status: SessionStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            result: None,
        }
    }

    pub fn push_step(&mut self, kind: StepKind) {
        self.steps.push(ExecutionStep {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
        });
    }

    /// Count steps of a given variant, for assertions and summaries.
    pub fn count_steps(&self, pred: impl Fn(&StepKind) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.kind)).count()
    }

    pub fn finalize(&mut self, status: SessionStatus, result: ExecutionResult) {
        self.status = status;
        self.result = Some(result);
        self.ended_at = Some(Utc::now());
    }
}
