use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::risk::RiskLevel;

/// Category tag for a tool, used for audit-event selection and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    FileOps,
    Shell,
    System,
    Network,
    Git,
    TextData,
    Clipboard,
    Media,
    CodeExec,
    ScreenControl,
    Memory,
    SelfModify,
}

/// One parameter in a tool's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// JSON-schema primitive type: "string", "integer", "number", "boolean".
    pub param_type: String,
    pub description: String,
    /// Optional closed set of permitted values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    pub required: bool,
}

impl ParamSpec {
    pub fn new(param_type: &str, description: &str) -> Self {
        Self {
            param_type: param_type.into(),
            description: description.into(),
            allowed: None,
            required: true,
        }
    }

    pub fn string(description: &str) -> Self {
        Self::new("string", description)
    }

    pub fn integer(description: &str) -> Self {
        Self::new("integer", description)
    }

    pub fn number(description: &str) -> Self {
        Self::new("number", description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Declarative description of a side-effecting operation the model may request.
///
/// Names are unique within a registry; the risk level is a lower bound that
/// the policy engine may escalate from the call's arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub risk_level: RiskLevel,
    /// Parameter name → spec, in declaration order.
    pub params: BTreeMap<String, ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(
        name: &str,
        description: &str,
        category: ToolCategory,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            risk_level,
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    /// Render the parameter schema as a JSON-Schema object for the LLM wire.
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<Value> = Vec::new();
        for (name, spec) in &self.params {
            let mut prop = json!({
                "type": spec.param_type,
                "description": spec.description,
            });
            if let Some(allowed) = &spec.allowed {
                prop["enum"] = json!(allowed);
            }
            properties.insert(name.clone(), prop);
            if spec.required {
                required.push(json!(name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A request from the LLM to invoke a tool. Produced by the model, never by
/// the user. Argument values are strings; richer values arrive JSON-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl ToolCall {
    pub fn new(name: &str, arguments: &[(&str, &str)]) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().as_simple()),
            name: name.into(),
            arguments: arguments
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }
}
