use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use warden_core::{Result, ToolCall, ToolDescriptor};

/// The self-modification sentinel. Its descriptor is registered like any
/// other tool so the model can see it, but the execution loop intercepts the
/// name before dispatch — the handler only ever reports misuse.
pub const UPDATE_SELF: &str = "update_self";

/// Anything that can execute one kind of tool call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String>;
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// The complete, typed set of tools the LLM may invoke.
///
/// Written during startup (last registration wins per name, which is how a
/// host installs custom tools), read-only once the first session starts.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A duplicate name replaces the prior descriptor.
    pub fn register(&self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        debug!(tool = %descriptor.name, risk = %descriptor.risk_level, "registering tool");
        self.tools.write().insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools.read().get(name).map(|t| t.descriptor.clone())
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// All descriptors, name-ordered for a stable wire layout.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let tools = self.tools.read();
        let mut all: Vec<ToolDescriptor> =
            tools.values().map(|t| t.descriptor.clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Descriptors restricted to an enabled-name set.
    pub fn descriptors_filtered(&self, enabled: &HashSet<String>) -> Vec<ToolDescriptor> {
        self.descriptors()
            .into_iter()
            .filter(|d| enabled.contains(&d.name))
            .collect()
    }

    /// Run one call within a wall-clock budget.
    ///
    /// The result is always a string: handler errors fold into
    /// `Error: {reason}`, budget overruns into `Error: timeout`, and an
    /// unregistered name into `Tool not found: {name}`.
    pub async fn dispatch(&self, call: &ToolCall, budget: Duration) -> String {
        let handler = {
            let tools = self.tools.read();
            match tools.get(&call.name) {
                Some(tool) => Arc::clone(&tool.handler),
                None => return format!("Tool not found: {}", call.name),
            }
        };

        info!(tool = %call.name, budget_secs = budget.as_secs(), "dispatching tool");
        match tokio::time::timeout(budget, handler.run(&call.arguments)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => format!("Error: {e}"),
            Err(_) => "Error: timeout".to_string(),
        }
    }
}
