//! The `update_self` sentinel.
//!
//! The descriptor is registered so the model can discover the tool, but the
//! execution loop intercepts the name before dispatch and applies the change
//! to its own agent snapshot. The handler below is only reachable if a host
//! dispatches the call directly, which is a misuse.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use crate::registry::{ToolHandler, ToolRegistry, UPDATE_SELF};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            UPDATE_SELF,
            "Update your own configuration: display name, system prompt, \
             model, or sampling temperature. Changes take effect on the next \
             step.",
            ToolCategory::SelfModify,
            RiskLevel::Low,
        )
        .param("name", ParamSpec::string("New display name").optional())
        .param("system_prompt", ParamSpec::string("New system prompt").optional())
        .param("model", ParamSpec::string("New model identifier").optional())
        .param(
            "temperature",
            ParamSpec::number("New sampling temperature, clamped into [0, 2]").optional(),
        ),
        Arc::new(UpdateSelfSentinel),
    );
}

struct UpdateSelfSentinel;

#[async_trait]
impl ToolHandler for UpdateSelfSentinel {
    async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
        Ok("Error: update_self must be handled by the execution loop, not dispatched".into())
    }
}
