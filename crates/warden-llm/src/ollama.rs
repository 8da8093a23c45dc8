//! Ollama-compatible HTTP adapter (`/api/chat`).
//!
//! Works against a local Ollama instance or anything speaking the same
//! protocol. Tool definitions are sent in the OpenAI-style `tools` array
//! Ollama understands; images ride on user messages as base64 payloads.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use warden_core::{ChatMessage, ContentBlock, Result, Role, ToolCall, WardenError};

use crate::client::*;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn build_body(&self, request: &LlmRequest, stream: bool) -> Value {
        let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }

        for msg in &request.messages {
            messages.push(wire_message(msg));
        }

        let mut body = json!({
            "model": &request.model,
            "messages": messages,
            "stream": stream,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.json_schema(),
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }
}

fn wire_message(msg: &ChatMessage) -> Value {
    match msg.role {
        Role::User => {
            let images: Vec<&str> = msg
                .content
                .iter()
                .filter_map(|c| match c {
                    ContentBlock::Image { data, .. } => Some(data.as_str()),
                    _ => None,
                })
                .collect();
            let mut m = json!({ "role": "user", "content": msg.text_content() });
            if !images.is_empty() {
                m["images"] = json!(images);
            }
            m
        }
        Role::Assistant => {
            let mut m = json!({ "role": "assistant", "content": msg.text_content() });
            if !msg.tool_calls.is_empty() {
                let calls: Vec<Value> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments,
                            }
                        })
                    })
                    .collect();
                m["tool_calls"] = json!(calls);
            }
            m
        }
        Role::Tool => {
            // Tool results travel as tool-role messages with plain content.
            let content = msg
                .content
                .iter()
                .filter_map(|c| match c {
                    ContentBlock::ToolResult { content, .. } => Some(content.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            json!({ "role": "tool", "content": content })
        }
    }
}

/// Convert the wire `function.arguments` object into the string→string map
/// tool calls carry. Non-string values stay JSON-encoded.
fn wire_arguments(value: &Value) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();
    if let Some(obj) = value.as_object() {
        for (k, v) in obj {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            args.insert(k.clone(), s);
        }
    }
    args
}

fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .filter_map(|c| {
                    let name = c["function"]["name"].as_str()?;
                    Some(ToolCall {
                        id: format!("call_{}", uuid::Uuid::new_v4().as_simple()),
                        name: name.to_string(),
                        arguments: wire_arguments(&c["function"]["arguments"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn send_message(&self, request: &LlmRequest) -> Result<LlmReply> {
        info!(model = %request.model, tools = request.tools.len(), "ollama chat request");

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.build_body(request, false))
            .send()
            .await
            .map_err(|e| WardenError::Llm(format!("ollama: {e}")))?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(WardenError::Llm(format!("ollama error: {text}")));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| WardenError::Llm(e.to_string()))?;

        let content = data["message"]["content"].as_str().unwrap_or("").to_string();
        let tool_calls = parse_tool_calls(&data["message"]);
        let finish_reason = if tool_calls.is_empty() {
            FinishReason::EndTurn
        } else {
            FinishReason::ToolUse
        };

        Ok(LlmReply {
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
            finish_reason,
            usage: TokenUsage {
                input_tokens: data["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
                output_tokens: data["eval_count"].as_u64().unwrap_or(0) as u32,
            },
        })
    }

    async fn send_message_stream(
        &self,
        request: &LlmRequest,
    ) -> Result<mpsc::Receiver<LlmChunk>> {
        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.build_body(request, true))
            .send()
            .await
            .map_err(|e| WardenError::Llm(format!("ollama: {e}")))?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(WardenError::Llm(format!("ollama error: {text}")));
        }

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut stream = resp.bytes_stream();
            let mut buffer = String::new();
            let mut finish = FinishReason::EndTurn;

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        debug!(error = %e, "ollama stream interrupted");
                        finish = FinishReason::Error;
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // NDJSON: one JSON object per line.
                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let Ok(data) = serde_json::from_str::<Value>(line) else {
                        continue;
                    };
                    if let Some(text) = data["message"]["content"].as_str() {
                        if !text.is_empty()
                            && tx.send(LlmChunk::ContentDelta(text.to_string())).await.is_err()
                        {
                            return;
                        }
                    }
                    for tc in parse_tool_calls(&data["message"]) {
                        finish = FinishReason::ToolUse;
                        if tx.send(LlmChunk::ToolCallDelta(tc)).await.is_err() {
                            return;
                        }
                    }
                    if data["done"].as_bool() == Some(true) {
                        let _ = tx.send(LlmChunk::Done(finish)).await;
                        return;
                    }
                }
            }
            let _ = tx.send(LlmChunk::Done(finish)).await;
        });

        Ok(rx)
    }
}
