use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::risk::RiskLevel;
use crate::session::{ApprovalOutcome, SessionStatus};

/// Events the execution engine publishes while a session runs.
///
/// UI-facing state (pending approvals, current output, step progress) is
/// exposed as this stream rather than as shared mutable state; subscribers
/// render it however they like.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    SessionStarted {
        session_id: Uuid,
        agent_id: Uuid,
    },
    ModelResponse {
        session_id: Uuid,
        has_tool_calls: bool,
    },
    ToolCallStarted {
        session_id: Uuid,
        tool_call_id: String,
        tool_name: String,
        risk: RiskLevel,
    },
    ToolCallFinished {
        session_id: Uuid,
        tool_call_id: String,
        is_error: bool,
    },
    ApprovalRequested {
        session_id: Uuid,
        request_id: Uuid,
        tool_name: String,
        risk: RiskLevel,
    },
    ApprovalDecided {
        session_id: Uuid,
        request_id: Uuid,
        outcome: ApprovalOutcome,
    },
    ScreenshotCaptured {
        session_id: Uuid,
        byte_len: usize,
    },
    SessionEnded {
        session_id: Uuid,
        status: SessionStatus,
    },
}

/// Broadcast-based pub/sub bus for engine events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<EngineEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: EngineEvent) {
        // Ignore send errors (no subscribers).
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
