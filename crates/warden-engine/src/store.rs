use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use warden_core::{ExecutionSession, Result};

/// Where finished (and checkpointed) sessions go.
///
/// Durable conversation storage is a host concern; the engine only needs
/// this contract. The in-memory implementation below backs tests and
/// single-process hosts.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: &ExecutionSession) -> Result<()>;
    fn get(&self, id: Uuid) -> Option<ExecutionSession>;
    fn list_for_agent(&self, agent_id: Uuid) -> Vec<ExecutionSession>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, ExecutionSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &ExecutionSession) -> Result<()> {
        self.sessions.write().insert(session.id, session.clone());
        Ok(())
    }

    fn get(&self, id: Uuid) -> Option<ExecutionSession> {
        self.sessions.read().get(&id).cloned()
    }

    fn list_for_agent(&self, agent_id: Uuid) -> Vec<ExecutionSession> {
        let mut sessions: Vec<ExecutionSession> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.agent_id == agent_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }
}
