use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use warden_approval::{ApprovalQueue, ApprovalRequest, ApprovalStatus};
use warden_audit::{ActionResult, AuditEntry, AuditEventKind, AuditJournal, Severity};
use warden_core::{
    AgentSnapshot, ApprovalOutcome, ChatMessage, EngineEvent, EventBus, ExecutionResult,
    ExecutionSession, Result, Role, SessionStatus, StepKind, ToolCall, ToolCategory,
    ToolDescriptor, WardenError,
};
use warden_llm::{LlmClient, LlmRequest};
use warden_policy::{PolicyDecision, PolicyEngine};
use warden_tools::{ToolRegistry, UPDATE_SELF};

use crate::cancel::CancelToken;
use crate::capture::ScreenCapture;
use crate::store::{MemorySessionStore, SessionStore};

/// Iteration ceiling outside agent mode.
const NORMAL_ITERATION_CEILING: u32 = 10;
/// Iteration ceiling in agent mode, sized for observe-between-steps GUI work.
const AGENT_MODE_ITERATION_CEILING: u32 = 30;
/// Callers may nest agent-to-agent runs this deep, no further.
pub const MAX_DELEGATION_DEPTH: u8 = 20;

/// Pause before the post-action screenshot so the UI can settle.
const SETTLE_DELAY: Duration = Duration::from_millis(900);
/// Screenshots are scaled to at most this many pixels wide.
const CAPTURE_MAX_WIDTH: u32 = 1440;

/// Tools whose dispatch changes what is on screen; any of these triggers the
/// vision feedback step in agent mode.
const SCREEN_MUTATING_TOOLS: &[&str] = &[
    "open_application",
    "click_mouse",
    "scroll_mouse",
    "type_text",
    "press_key",
    "run_applescript_or_platform_script",
    "take_screenshot",
];

const SCREENSHOT_INSTRUCTION: &str = "Here is a screenshot of the screen after your last \
     action. Treat it as the authoritative ground truth for the current state when deciding \
     your next action.";

/// Per-run configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// When true: every registered tool is offered, the iteration ceiling is
    /// raised, and post-action screenshots feed back into the conversation.
    pub agent_mode: bool,
    /// Incremented by callers on agent-to-agent invocations.
    pub delegation_depth: u8,
}

impl RunOptions {
    pub fn agent_mode() -> Self {
        Self {
            agent_mode: true,
            ..Self::default()
        }
    }

    pub fn delegated(depth: u8) -> Self {
        Self {
            agent_mode: false,
            delegation_depth: depth,
        }
    }

    fn ceiling(&self) -> u32 {
        if self.agent_mode {
            AGENT_MODE_ITERATION_CEILING
        } else {
            NORMAL_ITERATION_CEILING
        }
    }
}

/// The execution engine. Collaborators are injected once at startup and
/// shared across concurrent sessions; each `run` owns its session
/// exclusively.
pub struct ExecutionEngine {
    registry: Arc<ToolRegistry>,
    policy: PolicyEngine,
    approvals: ApprovalQueue,
    audit: Arc<AuditJournal>,
    llm: Arc<dyn LlmClient>,
    sessions: Arc<dyn SessionStore>,
    capture: Option<Arc<dyn ScreenCapture>>,
    events: EventBus,
}

impl ExecutionEngine {
    pub fn new(
        registry: Arc<ToolRegistry>,
        approvals: ApprovalQueue,
        audit: Arc<AuditJournal>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            registry,
            policy: PolicyEngine::new(),
            approvals,
            audit,
            llm,
            sessions: Arc::new(MemorySessionStore::new()),
            capture: None,
            events: EventBus::default(),
        }
    }

    pub fn with_capture(mut self, capture: Arc<dyn ScreenCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = store;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn approvals(&self) -> &ApprovalQueue {
        &self.approvals
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Carry one session from prompt to terminal result.
    pub async fn run(
        &self,
        agent: &AgentSnapshot,
        prompt: &str,
        options: RunOptions,
        cancel: CancelToken,
    ) -> Result<ExecutionSession> {
        if options.delegation_depth > MAX_DELEGATION_DEPTH {
            return Err(WardenError::DelegationDepthExceeded {
                depth: options.delegation_depth,
                max: MAX_DELEGATION_DEPTH,
            });
        }

        // The loop owns a mutable copy; update_self edits this, never the
        // stored agent. Tool visibility is recomputed each iteration so a
        // self-update takes effect on the next step, not mid-step.
        let mut snapshot = agent.clone();
        let mut session = ExecutionSession::new(agent.id, prompt);
        let ceiling = options.ceiling();
        let budget = Duration::from_secs(snapshot.policy.max_execution_time_secs.max(1));

        info!(
            session_id = %session.id,
            agent = %snapshot.name,
            agent_mode = options.agent_mode,
            ceiling,
            "session started"
        );
        session.push_step(StepKind::Thinking);
        self.audit.record(
            AuditEntry::new(
                AuditEventKind::SessionStarted,
                Severity::Info,
                format!("agent '{}' started on prompt", snapshot.name),
                ActionResult::Success,
            )
            .with_agent(agent.id)
            .with_session(session.id),
        );
        self.events.publish(EngineEvent::SessionStarted {
            session_id: session.id,
            agent_id: agent.id,
        });

        let mut messages = vec![ChatMessage::text(Role::User, prompt)];
        let mut transcript: Vec<String> = Vec::new();
        let mut final_text: Option<String> = None;
        let mut cancelled = false;
        let mut iteration = 0u32;

        'iterations: while iteration < ceiling {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let request = LlmRequest {
                provider: snapshot.provider,
                model: snapshot.model.clone(),
                messages: messages.clone(),
                system_prompt: snapshot.system_prompt.clone(),
                tools: self.effective_tools(&snapshot, options.agent_mode),
                temperature: snapshot.temperature,
                max_tokens: snapshot.max_tokens,
            };

            let reply = match self.llm.send_message(&request).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "llm transport failure");
                    session.push_step(StepKind::Error {
                        message: e.to_string(),
                    });
                    return self.finalize(
                        session,
                        SessionStatus::Failed,
                        ExecutionResult {
                            success: false,
                            output: transcript.join("\n"),
                            error: Some(e.to_string()),
                        },
                    );
                }
            };
            iteration += 1;

            let text = reply.content.clone().unwrap_or_default();
            if !text.is_empty() {
                transcript.push(text.clone());
            }
            messages.push(ChatMessage::assistant(&text, reply.tool_calls.clone()));
            session.push_step(StepKind::ModelResponse {
                text: text.clone(),
                tool_calls: reply.tool_calls.len(),
            });
            self.events.publish(EngineEvent::ModelResponse {
                session_id: session.id,
                has_tool_calls: !reply.tool_calls.is_empty(),
            });

            if reply.tool_calls.is_empty() {
                final_text = Some(text);
                break;
            }

            let mut screen_mutated = false;
            for call in &reply.tool_calls {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'iterations;
                }

                let Some(descriptor) = self.registry.get(&call.name) else {
                    let not_found = format!("Tool not found: {}", call.name);
                    session.push_step(StepKind::ToolResult {
                        tool_call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        output: not_found.clone(),
                    });
                    messages.push(ChatMessage::tool_result(&call.id, not_found));
                    continue;
                };

                if call.name == UPDATE_SELF {
                    let confirmation = apply_self_update(&mut snapshot, call);
                    self.audit.record(
                        AuditEntry::new(
                            AuditEventKind::ConfigurationChanged,
                            Severity::Info,
                            confirmation.clone(),
                            ActionResult::Success,
                        )
                        .with_agent(agent.id)
                        .with_session(session.id),
                    );
                    session.push_step(StepKind::ToolResult {
                        tool_call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        output: confirmation.clone(),
                    });
                    messages.push(ChatMessage::tool_result(&call.id, confirmation));
                    continue;
                }

                let verdict = self.policy.evaluate(&descriptor, call, &snapshot.policy);
                session.push_step(StepKind::ToolCall {
                    call: call.clone(),
                    risk: verdict.risk,
                });
                self.events.publish(EngineEvent::ToolCallStarted {
                    session_id: session.id,
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    risk: verdict.risk,
                });

                let mut effective_call = call.clone();
                match verdict.decision {
                    PolicyDecision::Block => {
                        warn!(
                            session_id = %session.id,
                            tool = %call.name,
                            reason = %verdict.reasoning,
                            "policy block"
                        );
                        self.audit.record(
                            AuditEntry::new(
                                AuditEventKind::SecurityViolation,
                                Severity::Critical,
                                format!("{}: {}", call.name, verdict.reasoning),
                                ActionResult::Blocked,
                            )
                            .with_agent(agent.id)
                            .with_session(session.id),
                        );
                        let blocked = format!("Blocked: {}", verdict.reasoning);
                        session.push_step(StepKind::ToolResult {
                            tool_call_id: call.id.clone(),
                            tool_name: call.name.clone(),
                            output: blocked.clone(),
                        });
                        messages.push(ChatMessage::tool_result(&call.id, blocked));
                        continue;
                    }
                    PolicyDecision::Ask => {
                        let request = ApprovalRequest::new(
                            session.id,
                            agent.id,
                            call.clone(),
                            verdict.risk,
                            verdict.reasoning.clone(),
                            verdict.impact.clone(),
                            snapshot.policy.max_execution_time_secs,
                        );
                        let request_id = request.id;
                        session.push_step(StepKind::ApprovalRequested {
                            request_id,
                            tool_name: call.name.clone(),
                            risk: verdict.risk,
                        });
                        self.audit.record(
                            AuditEntry::new(
                                AuditEventKind::ApprovalRequested,
                                Severity::Info,
                                format!("approval requested for {}", call.name),
                                ActionResult::Success,
                            )
                            .with_agent(agent.id)
                            .with_session(session.id),
                        );
                        self.events.publish(EngineEvent::ApprovalRequested {
                            session_id: session.id,
                            request_id,
                            tool_name: call.name.clone(),
                            risk: verdict.risk,
                        });

                        self.approvals.submit(request).await;
                        let decided = self.approvals.await_decision(request_id).await?;
                        let outcome = decided
                            .status
                            .outcome()
                            .unwrap_or(ApprovalOutcome::Expired);
                        session.push_step(StepKind::ApprovalDecision {
                            request_id,
                            outcome,
                        });
                        self.events.publish(EngineEvent::ApprovalDecided {
                            session_id: session.id,
                            request_id,
                            outcome,
                        });

                        match decided.status {
                            ApprovalStatus::Approved | ApprovalStatus::Modified => {
                                let modified = decided
                                    .decision
                                    .as_ref()
                                    .and_then(|d| d.modified_command.clone());
                                self.audit.record(
                                    AuditEntry::new(
                                        AuditEventKind::ApprovalGranted,
                                        Severity::Info,
                                        format!("approval granted for {}", call.name),
                                        ActionResult::Success,
                                    )
                                    .with_agent(agent.id)
                                    .with_session(session.id)
                                    .with_detail(
                                        "modified",
                                        serde_json::json!(modified.is_some()),
                                    ),
                                );
                                if let Some(command) = modified {
                                    effective_call
                                        .arguments
                                        .insert("command".into(), command);
                                }
                            }
                            ApprovalStatus::Denied => {
                                self.audit.record(
                                    AuditEntry::new(
                                        AuditEventKind::ApprovalDenied,
                                        Severity::Warning,
                                        format!("approval denied for {}", call.name),
                                        ActionResult::Blocked,
                                    )
                                    .with_agent(agent.id)
                                    .with_session(session.id),
                                );
                                let denial = match decided
                                    .decision
                                    .as_ref()
                                    .and_then(|d| d.justification.as_deref())
                                {
                                    Some(justification) => {
                                        format!("Denied by user: {justification}")
                                    }
                                    None => "Denied by user".to_string(),
                                };
                                session.push_step(StepKind::ToolResult {
                                    tool_call_id: call.id.clone(),
                                    tool_name: call.name.clone(),
                                    output: denial.clone(),
                                });
                                messages.push(ChatMessage::tool_result(&call.id, denial));
                                continue;
                            }
                            ApprovalStatus::Expired | ApprovalStatus::Pending => {
                                self.audit.record(
                                    AuditEntry::new(
                                        AuditEventKind::ApprovalExpired,
                                        Severity::Warning,
                                        format!("approval expired for {}", call.name),
                                        ActionResult::Blocked,
                                    )
                                    .with_agent(agent.id)
                                    .with_session(session.id),
                                );
                                let expired = "Error: approval timed out".to_string();
                                session.push_step(StepKind::ToolResult {
                                    tool_call_id: call.id.clone(),
                                    tool_name: call.name.clone(),
                                    output: expired.clone(),
                                });
                                messages.push(ChatMessage::tool_result(&call.id, expired));
                                continue;
                            }
                        }
                    }
                    PolicyDecision::Allow => {}
                }

                let output = self.registry.dispatch(&effective_call, budget).await;
                let is_error = output.starts_with("Error:");
                self.audit_dispatch(&descriptor, &effective_call, &output, agent.id, session.id);
                session.push_step(StepKind::ToolResult {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    output: output.clone(),
                });
                self.events.publish(EngineEvent::ToolCallFinished {
                    session_id: session.id,
                    tool_call_id: call.id.clone(),
                    is_error,
                });
                messages.push(ChatMessage::tool_result(&call.id, output));

                if SCREEN_MUTATING_TOOLS.contains(&call.name.as_str()) {
                    screen_mutated = true;
                }
            }

            // Vision feedback: agent mode only, only after screen-mutating
            // dispatches, and only when a capture backend exists.
            if options.agent_mode && screen_mutated {
                if let Some(capture) = &self.capture {
                    tokio::time::sleep(SETTLE_DELAY).await;
                    match capture.capture(None, CAPTURE_MAX_WIDTH).await {
                        Ok(jpeg) => {
                            session.push_step(StepKind::ScreenshotObservation {
                                byte_len: jpeg.len(),
                            });
                            self.events.publish(EngineEvent::ScreenshotCaptured {
                                session_id: session.id,
                                byte_len: jpeg.len(),
                            });
                            messages.push(ChatMessage::user_screenshot(
                                &jpeg,
                                SCREENSHOT_INSTRUCTION,
                            ));
                        }
                        Err(e) => {
                            // Degrade gracefully; the loop continues blind.
                            tracing::debug!(error = %e, "screen capture skipped");
                        }
                    }
                }
            }
        }

        if let Some(output) = final_text {
            return self.finalize(
                session,
                SessionStatus::Completed,
                ExecutionResult {
                    success: true,
                    output,
                    error: None,
                },
            );
        }
        if cancelled {
            info!(session_id = %session.id, "session cancelled");
            return self.finalize(
                session,
                SessionStatus::Cancelled,
                ExecutionResult {
                    success: false,
                    output: transcript.join("\n"),
                    error: Some("cancelled".into()),
                },
            );
        }

        warn!(session_id = %session.id, ceiling, "iteration ceiling reached");
        session.push_step(StepKind::Error {
            message: "max iterations".into(),
        });
        self.finalize(
            session,
            SessionStatus::Failed,
            ExecutionResult {
                success: false,
                output: transcript.join("\n"),
                error: Some("max iterations".into()),
            },
        )
    }

    /// Agent mode offers every registered tool; otherwise the agent's
    /// enabled set plus `update_self`, which is always present.
    fn effective_tools(&self, snapshot: &AgentSnapshot, agent_mode: bool) -> Vec<ToolDescriptor> {
        if agent_mode {
            return self.registry.descriptors();
        }
        let mut enabled: HashSet<String> = snapshot.enabled_tools.iter().cloned().collect();
        enabled.insert(UPDATE_SELF.to_string());
        self.registry.descriptors_filtered(&enabled)
    }

    fn finalize(
        &self,
        mut session: ExecutionSession,
        status: SessionStatus,
        result: ExecutionResult,
    ) -> Result<ExecutionSession> {
        session.finalize(status, result);
        self.audit.record(
            AuditEntry::new(
                AuditEventKind::SessionEnded,
                Severity::Info,
                format!("session ended: {:?}", status),
                match status {
                    SessionStatus::Completed => ActionResult::Success,
                    SessionStatus::Cancelled => ActionResult::Partial,
                    _ => ActionResult::Failure,
                },
            )
            .with_agent(session.agent_id)
            .with_session(session.id),
        );
        self.events.publish(EngineEvent::SessionEnded {
            session_id: session.id,
            status,
        });
        self.sessions.save(&session)?;
        Ok(session)
    }

    /// One audit entry per dispatched tool, with the event kind chosen by
    /// what the tool touches and the severity by how the dispatch ended.
    fn audit_dispatch(
        &self,
        descriptor: &ToolDescriptor,
        call: &ToolCall,
        output: &str,
        agent_id: Uuid,
        session_id: Uuid,
    ) {
        let kind = dispatch_audit_kind(descriptor, call);
        let (severity, result) = if output == "Error: timeout" {
            (Severity::Warning, ActionResult::Failure)
        } else if output.starts_with("Error:") {
            (Severity::Error, ActionResult::Failure)
        } else {
            (Severity::Info, ActionResult::Success)
        };

        let target = call
            .arg("path")
            .or_else(|| call.arg("url"))
            .or_else(|| call.arg("command"))
            .or_else(|| call.arg("destination"))
            .map(str::to_string);

        let mut entry = AuditEntry::new(kind, severity, call.name.clone(), result)
            .with_agent(agent_id)
            .with_session(session_id);
        if let Some(target) = target {
            entry = entry.with_target(target);
        }
        self.audit.record(entry);
    }
}

fn dispatch_audit_kind(descriptor: &ToolDescriptor, call: &ToolCall) -> AuditEventKind {
    match descriptor.category {
        ToolCategory::FileOps => match call.name.as_str() {
            "delete_file" => AuditEventKind::FileDeleted,
            "read_file" | "list_directory" | "get_file_info" | "search_files"
            | "count_lines" => AuditEventKind::FileAccessed,
            _ => AuditEventKind::FileModified,
        },
        ToolCategory::TextData => match call.name.as_str() {
            "replace_in_file" => AuditEventKind::FileModified,
            "search_in_file" => AuditEventKind::FileAccessed,
            _ => AuditEventKind::CommandExecuted,
        },
        ToolCategory::Network => AuditEventKind::NetworkRequest,
        ToolCategory::Memory => match call.name.as_str() {
            "memory_save" | "memory_delete" => AuditEventKind::MemoryUpdated,
            _ => AuditEventKind::CommandExecuted,
        },
        ToolCategory::Shell => {
            let command = call.arg("command").unwrap_or("");
            if command.starts_with("sudo ") || command.starts_with("doas ") {
                AuditEventKind::SudoExecuted
            } else {
                AuditEventKind::CommandExecuted
            }
        }
        _ => AuditEventKind::CommandExecuted,
    }
}

/// Apply an `update_self` call to the loop's snapshot. Temperature is
/// clamped into [0, 2], never rejected.
fn apply_self_update(snapshot: &mut AgentSnapshot, call: &ToolCall) -> String {
    let mut changes = Vec::new();

    if let Some(name) = call.arg("name") {
        snapshot.name = name.to_string();
        changes.push(format!("name → '{name}'"));
    }
    if let Some(system_prompt) = call.arg("system_prompt") {
        snapshot.system_prompt = Some(system_prompt.to_string());
        changes.push("system prompt updated".to_string());
    }
    if let Some(model) = call.arg("model") {
        snapshot.model = model.to_string();
        changes.push(format!("model → '{model}'"));
    }
    if let Some(raw) = call.arg("temperature") {
        match raw.parse::<f32>() {
            Ok(t) => {
                let clamped = t.clamp(0.0, 2.0);
                snapshot.temperature = clamped;
                changes.push(format!("temperature → {clamped}"));
            }
            Err(_) => changes.push(format!("temperature '{raw}' ignored (not a number)")),
        }
    }

    snapshot.updated_at = chrono::Utc::now();
    if changes.is_empty() {
        "Agent configuration unchanged: no recognized fields".to_string()
    } else {
        format!("Agent configuration updated: {}", changes.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ProviderTag;

    #[test]
    fn self_update_clamps_temperature() {
        let mut snapshot = AgentSnapshot::new("a", ProviderTag::Ollama, "m");
        let call = ToolCall::new(UPDATE_SELF, &[("temperature", "7.5")]);
        let msg = apply_self_update(&mut snapshot, &call);
        assert_eq!(snapshot.temperature, 2.0);
        assert!(msg.contains("temperature → 2"));

        let call = ToolCall::new(UPDATE_SELF, &[("temperature", "-3")]);
        apply_self_update(&mut snapshot, &call);
        assert_eq!(snapshot.temperature, 0.0);
    }

    #[test]
    fn self_update_reports_unrecognized() {
        let mut snapshot = AgentSnapshot::new("a", ProviderTag::Ollama, "m");
        let call = ToolCall::new(UPDATE_SELF, &[]);
        let msg = apply_self_update(&mut snapshot, &call);
        assert!(msg.contains("unchanged"));
    }

    #[test]
    fn options_ceilings() {
        assert_eq!(RunOptions::default().ceiling(), 10);
        assert_eq!(RunOptions::agent_mode().ceiling(), 30);
    }
}
