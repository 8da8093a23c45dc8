use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use warden_core::{Result, WardenError};

use crate::request::{ApprovalRequest, ApprovalStatus, UserDecision};

struct QueueState {
    requests: HashMap<Uuid, ApprovalRequest>,
    /// Pending ids in submission order. Front = promoted request.
    order: VecDeque<Uuid>,
    notifiers: HashMap<Uuid, watch::Sender<ApprovalStatus>>,
}

/// The approval queue. All mutations go through one serialization point;
/// the execution loop blocks on [`ApprovalQueue::await_decision`] while a
/// human (or the sweeper) drives a request to its single terminal state.
#[derive(Clone)]
pub struct ApprovalQueue {
    state: Arc<Mutex<QueueState>>,
}

impl Default for ApprovalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalQueue {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                requests: HashMap::new(),
                order: VecDeque::new(),
                notifiers: HashMap::new(),
            })),
        }
    }

    /// Park a request. The earliest-submitted pending request is always the
    /// promoted one, so submission order is decision order by default.
    pub async fn submit(&self, request: ApprovalRequest) {
        let mut state = self.state.lock().await;
        let (tx, _) = watch::channel(ApprovalStatus::Pending);
        info!(
            request_id = %request.id,
            tool = %request.call.name,
            risk = %request.risk,
            "approval requested"
        );
        state.notifiers.insert(request.id, tx);
        state.order.push_back(request.id);
        state.requests.insert(request.id, request);
    }

    /// The currently promoted request, if any.
    pub async fn current(&self) -> Option<ApprovalRequest> {
        let state = self.state.lock().await;
        state
            .order
            .front()
            .and_then(|id| state.requests.get(id))
            .cloned()
    }

    /// All pending requests in submission order.
    pub async fn pending(&self) -> Vec<ApprovalRequest> {
        let state = self.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|id| state.requests.get(id))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<ApprovalRequest> {
        self.state.lock().await.requests.get(&id).cloned()
    }

    /// Approve (or, with a modified command, modify) a pending request.
    pub async fn approve(
        &self,
        id: Uuid,
        justification: Option<String>,
        modified_command: Option<String>,
    ) -> Result<ApprovalRequest> {
        let status = if modified_command.is_some() {
            ApprovalStatus::Modified
        } else {
            ApprovalStatus::Approved
        };
        let decision = UserDecision {
            approved: true,
            justification,
            modified_command,
        };
        self.decide(id, status, decision).await
    }

    /// Deny a pending request.
    pub async fn deny(&self, id: Uuid, justification: Option<String>) -> Result<ApprovalRequest> {
        let decision = UserDecision {
            approved: false,
            justification,
            modified_command: None,
        };
        self.decide(id, ApprovalStatus::Denied, decision).await
    }

    async fn decide(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        decision: UserDecision,
    ) -> Result<ApprovalRequest> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let request = state
            .requests
            .get(&id)
            .ok_or_else(|| WardenError::Approval(format!("request {id} not found")))?;
        if request.status.is_terminal() {
            return Err(WardenError::Approval(format!(
                "request {id} already decided ({:?})",
                request.status
            )));
        }
        if now > request.expires_at {
            terminalize(&mut state, id, ApprovalStatus::Expired, None);
            return Err(WardenError::Approval(format!("request {id} has expired")));
        }

        match terminalize(&mut state, id, status, Some(decision)) {
            Some(updated) => {
                info!(request_id = %id, ?status, "approval decided");
                Ok(updated)
            }
            None => Err(WardenError::Approval(format!("request {id} already decided"))),
        }
    }

    /// Demote the promoted request to the back of the queue without deciding.
    pub async fn skip_current(&self) {
        let mut state = self.state.lock().await;
        if let Some(id) = state.order.pop_front() {
            state.order.push_back(id);
        }
    }

    /// Flip every pending request whose deadline has passed to `Expired`.
    /// Returns the expired requests.
    pub async fn expire_pending(&self, now: DateTime<Utc>) -> Vec<ApprovalRequest> {
        let mut state = self.state.lock().await;
        let stale: Vec<Uuid> = state
            .order
            .iter()
            .copied()
            .filter(|id| {
                state
                    .requests
                    .get(id)
                    .map(|r| r.expires_at < now)
                    .unwrap_or(false)
            })
            .collect();

        let mut expired = Vec::new();
        for id in stale {
            if let Some(request) = terminalize(&mut state, id, ApprovalStatus::Expired, None) {
                warn!(request_id = %id, tool = %request.call.name, "approval expired");
                expired.push(request);
            }
        }
        expired
    }

    /// Block until the request reaches a terminal state or its own deadline
    /// passes, then return it. A deadline hit flips the request to `Expired`
    /// even if the sweeper has not run yet.
    pub async fn await_decision(&self, id: Uuid) -> Result<ApprovalRequest> {
        let (mut rx, expires_at) = {
            let state = self.state.lock().await;
            let request = state
                .requests
                .get(&id)
                .ok_or_else(|| WardenError::Approval(format!("request {id} not found")))?;
            if request.status.is_terminal() {
                return Ok(request.clone());
            }
            let rx = state
                .notifiers
                .get(&id)
                .map(|tx| tx.subscribe())
                .ok_or_else(|| WardenError::Approval(format!("request {id} has no notifier")))?;
            (rx, request.expires_at)
        };

        let remaining = (expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let decided = tokio::time::timeout(remaining, async {
            while rx.changed().await.is_ok() {
                if rx.borrow().is_terminal() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        let mut state = self.state.lock().await;
        if !decided {
            // Deadline hit before any terminal transition.
            terminalize(&mut state, id, ApprovalStatus::Expired, None);
        }
        state
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| WardenError::Approval(format!("request {id} vanished")))
    }

    /// Run the expiry sweep on a fixed cadence until the handle is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                queue.expire_pending(Utc::now()).await;
            }
        })
    }
}

/// Apply the single terminal transition: update the request, drop it from
/// the pending order, and wake any waiter. No-op if the request is already
/// terminal.
fn terminalize(
    state: &mut QueueState,
    id: Uuid,
    status: ApprovalStatus,
    decision: Option<UserDecision>,
) -> Option<ApprovalRequest> {
    let request = state.requests.get_mut(&id)?;
    if request.status.is_terminal() {
        return None;
    }
    request.status = status;
    if decision.is_some() {
        request.decision = decision;
        request.decided_at = Some(Utc::now());
    }
    let updated = request.clone();
    state.order.retain(|x| *x != id);
    if let Some(tx) = state.notifiers.remove(&id) {
        let _ = tx.send(status);
    }
    Some(updated)
}
