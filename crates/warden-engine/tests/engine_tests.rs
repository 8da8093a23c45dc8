#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use warden_approval::ApprovalQueue;
    use warden_audit::{AuditEventKind, AuditFilter, AuditJournal, Severity};
    use warden_core::{
        AgentSnapshot, ProviderTag, Result, RiskLevel, SecurityPolicy, SessionStatus, StepKind,
    };
    use warden_engine::{
        CancelToken, ExecutionEngine, RunOptions, ScreenCapture, MAX_DELEGATION_DEPTH,
    };
    use warden_llm::MockLlm;
    use warden_memory::MemoryStore;
    use warden_tools::{register_builtins, ToolRegistry};

    struct Harness {
        engine: ExecutionEngine,
        audit: Arc<AuditJournal>,
        llm: MockLlm,
        queue: ApprovalQueue,
        _dir: tempfile::TempDir,
    }

    fn harness(llm: MockLlm) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(MemoryStore::open(&dir.path().join("memory.json")).unwrap());
        let registry = Arc::new(ToolRegistry::new());
        register_builtins(&registry, memory);
        let audit = Arc::new(AuditJournal::open_in_memory().unwrap());
        let queue = ApprovalQueue::new();
        let engine = ExecutionEngine::new(
            registry,
            queue.clone(),
            Arc::clone(&audit),
            Arc::new(llm.clone()),
        );
        Harness {
            engine,
            audit,
            llm,
            queue,
            _dir: dir,
        }
    }

    fn agent(policy: SecurityPolicy, tools: &[&str]) -> AgentSnapshot {
        AgentSnapshot::new("test-agent", ProviderTag::Ollama, "test-model")
            .with_policy(policy)
            .with_tools(tools)
    }

    fn audit_count(h: &Harness, kind: AuditEventKind) -> usize {
        h.audit
            .query(&AuditFilter {
                kinds: vec![kind],
                ..Default::default()
            })
            .unwrap()
            .len()
    }

    struct StubCapture;

    #[async_trait]
    impl ScreenCapture for StubCapture {
        async fn capture(&self, _display_id: Option<u32>, _max_width: u32) -> Result<Vec<u8>> {
            // A JPEG SOI marker plus padding; enough for the loop to embed.
            Ok(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46])
        }
    }

    // ── S1: safe read path ─────────────────────────────────────

    #[tokio::test]
    async fn test_safe_read_path_completes_with_audit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hosts");
        std::fs::write(&file, "127.0.0.1 localhost\n::1 localhost\n").unwrap();
        let path = file.to_str().unwrap();

        let llm = MockLlm::new()
            .with_tool_call("read_file", &[("path", path)])
            .with_tool_call("count_lines", &[("path", path)])
            .with_reply("The file has 2 lines.");
        let h = harness(llm);
        let agent = agent(SecurityPolicy::default(), &["read_file", "count_lines"]);

        let session = h
            .engine
            .run(&agent, "Show the host file", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.result.as_ref().unwrap().output, "The file has 2 lines.");
        assert!(session.result.as_ref().unwrap().success);
        assert_eq!(audit_count(&h, AuditEventKind::FileAccessed), 2);
        assert_eq!(audit_count(&h, AuditEventKind::SessionStarted), 1);
        assert_eq!(audit_count(&h, AuditEventKind::SessionEnded), 1);

        // Tool-call/tool-result balance: matching ids, one result per call.
        let calls: Vec<_> = session
            .steps
            .iter()
            .filter_map(|s| match &s.kind {
                StepKind::ToolCall { call, .. } => Some(call.id.clone()),
                _ => None,
            })
            .collect();
        let results: Vec<_> = session
            .steps
            .iter()
            .filter_map(|s| match &s.kind {
                StepKind::ToolResult { tool_call_id, .. } => Some(tool_call_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(results, calls);
    }

    // ── S2: dangerous shell blocked ────────────────────────────

    #[tokio::test]
    async fn test_dangerous_shell_blocked_loop_continues() {
        let llm = MockLlm::new()
            .with_tool_call("execute_command", &[("command", "rm -rf /")])
            .with_reply("I can't run that command; it would destroy the system.");
        let h = harness(llm);
        let agent = agent(SecurityPolicy::unattended(), &["execute_command"]);

        let session = h
            .engine
            .run(&agent, "wipe the disk", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();

        // The block surfaced as a tool result and the loop went on to a
        // normal completion.
        assert_eq!(session.status, SessionStatus::Completed);
        let blocked = session
            .steps
            .iter()
            .find_map(|s| match &s.kind {
                StepKind::ToolResult { output, .. } if output.starts_with("Blocked:") => {
                    Some(output.clone())
                }
                _ => None,
            })
            .expect("expected a Blocked tool result");
        assert!(blocked.contains("critical pattern"));

        let violations = h
            .audit
            .query(&AuditFilter {
                kinds: vec![AuditEventKind::SecurityViolation],
                severities: vec![Severity::Critical],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(violations.len(), 1);
    }

    // ── S3: approval roundtrip ─────────────────────────────────

    #[tokio::test]
    async fn test_approval_roundtrip_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x");
        let path = file.to_str().unwrap().to_string();

        let llm = MockLlm::new()
            .with_tool_call("write_file", &[("path", &path), ("content", "hi")])
            .with_reply("Written.");
        let h = harness(llm);
        let policy = SecurityPolicy {
            require_approval: true,
            auto_approve_ceiling: RiskLevel::Low,
            ..Default::default()
        };
        let agent = agent(policy, &["write_file"]);

        // A human on the other side of the queue.
        let approver = {
            let queue = h.queue.clone();
            tokio::spawn(async move {
                loop {
                    if let Some(request) = queue.current().await {
                        assert_eq!(request.risk, RiskLevel::Medium);
                        queue.approve(request.id, None, None).await.unwrap();
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
        };

        let session = h
            .engine
            .run(&agent, "write hi to x", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();
        approver.await.unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "hi");
        assert_eq!(audit_count(&h, AuditEventKind::ApprovalGranted), 1);
        assert_eq!(audit_count(&h, AuditEventKind::FileModified), 1);
    }

    #[tokio::test]
    async fn test_modified_approval_substitutes_command() {
        let llm = MockLlm::new()
            .with_tool_call("execute_command", &[("command", "echo original")])
            .with_reply("Done.");
        let h = harness(llm);
        let policy = SecurityPolicy {
            require_approval: true,
            ..Default::default()
        };
        let agent = agent(policy, &["execute_command"]);

        let approver = {
            let queue = h.queue.clone();
            tokio::spawn(async move {
                loop {
                    if let Some(request) = queue.current().await {
                        queue
                            .approve(request.id, None, Some("echo modified-ok".into()))
                            .await
                            .unwrap();
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
        };

        let session = h
            .engine
            .run(&agent, "run echo", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();
        approver.await.unwrap();

        let output = session
            .steps
            .iter()
            .find_map(|s| match &s.kind {
                StepKind::ToolResult { tool_name, output, .. }
                    if tool_name == "execute_command" =>
                {
                    Some(output.clone())
                }
                _ => None,
            })
            .unwrap();
        assert!(output.contains("modified-ok"));
        assert!(!output.contains("original"));
    }

    // ── S4: approval expiry ────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_approval_expiry_surfaces_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x").to_str().unwrap().to_string();

        let llm = MockLlm::new()
            .with_tool_call("write_file", &[("path", &path), ("content", "hi")])
            .with_reply("Understood, the write never happened.");
        let h = harness(llm);
        let policy = SecurityPolicy {
            require_approval: true,
            max_execution_time_secs: 2,
            ..Default::default()
        };
        let agent = agent(policy, &["write_file"]);

        // Nobody answers; await_decision rides the deadline to Expired.
        let session = h
            .engine
            .run(&agent, "write hi", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        let timed_out = session.steps.iter().any(|s| {
            matches!(&s.kind, StepKind::ToolResult { output, .. }
                if output == "Error: approval timed out")
        });
        assert!(timed_out);
        assert_eq!(audit_count(&h, AuditEventKind::ApprovalExpired), 1);
    }

    // ── S5: vision feedback ────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_vision_feedback_injects_screenshot() {
        let llm = MockLlm::new()
            .with_tool_call("click_mouse", &[("x", "100"), ("y", "200")])
            .with_reply("I see the dialog is open now.");
        let h = harness(llm.clone());
        let engine = h.engine.with_capture(Arc::new(StubCapture));
        let agent = agent(SecurityPolicy::unattended(), &[]);

        let session = engine
            .run(&agent, "click the button", RunOptions::agent_mode(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(
            session.count_steps(|k| matches!(k, StepKind::ScreenshotObservation { .. })),
            1
        );

        // The second LLM request carries the screenshot as a user message.
        let requests = llm.requests.lock().clone();
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert!(last.has_image());
        assert!(last.text_content().contains("ground truth"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_vision_skipped_without_capture_backend() {
        let llm = MockLlm::new()
            .with_tool_call("click_mouse", &[("x", "1"), ("y", "1")])
            .with_reply("done");
        let h = harness(llm);
        let agent = agent(SecurityPolicy::unattended(), &[]);

        let session = h
            .engine
            .run(&agent, "click", RunOptions::agent_mode(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(
            session.count_steps(|k| matches!(k, StepKind::ScreenshotObservation { .. })),
            0
        );
    }

    // ── S6: iteration ceiling ──────────────────────────────────

    #[tokio::test]
    async fn test_iteration_ceiling_fails_session() {
        let llm = MockLlm::new().with_repeating_tool_call("get_current_datetime", &[]);
        let h = harness(llm.clone());
        let agent = agent(SecurityPolicy::default(), &["get_current_datetime"]);

        let session = h
            .engine
            .run(&agent, "loop forever", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.result.as_ref().unwrap().error.as_deref(), Some("max iterations"));
        assert_eq!(
            session.count_steps(|k| matches!(k, StepKind::ModelResponse { .. })),
            10
        );
        assert_eq!(llm.request_count(), 10);
        let has_error_step = session
            .steps
            .iter()
            .any(|s| matches!(&s.kind, StepKind::Error { message } if message == "max iterations"));
        assert!(has_error_step);
    }

    // ── update_self interception ───────────────────────────────

    #[tokio::test]
    async fn test_update_self_is_intercepted_and_clamped() {
        let llm = MockLlm::new()
            .with_tool_call(
                "update_self",
                &[("name", "Scout"), ("temperature", "9.9")],
            )
            .with_reply("Reconfigured.");
        let h = harness(llm.clone());
        // update_self is offered even with an empty enabled set.
        let agent = agent(SecurityPolicy::paranoid(), &[]);

        let session = h
            .engine
            .run(&agent, "rename yourself", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        let confirmation = session
            .steps
            .iter()
            .find_map(|s| match &s.kind {
                StepKind::ToolResult { tool_name, output, .. } if tool_name == "update_self" => {
                    Some(output.clone())
                }
                _ => None,
            })
            .unwrap();
        // Intercepted in the loop, never the sentinel handler, temperature
        // clamped into [0, 2].
        assert!(confirmation.starts_with("Agent configuration updated"));
        assert!(confirmation.contains("Scout"));
        assert!(confirmation.contains("temperature → 2"));
        assert_eq!(audit_count(&h, AuditEventKind::ConfigurationChanged), 1);
        // No approval was requested despite the paranoid policy.
        assert_eq!(audit_count(&h, AuditEventKind::ApprovalRequested), 0);

        // The next request reflects the updated snapshot.
        let requests = llm.requests.lock().clone();
        assert_eq!(requests[1].temperature, 2.0);
    }

    // ── Unknown tools, cancellation, delegation ────────────────

    #[tokio::test]
    async fn test_unknown_tool_surfaces_as_text() {
        let llm = MockLlm::new()
            .with_tool_call("definitely_not_a_tool", &[])
            .with_reply("ok");
        let h = harness(llm);
        let agent = agent(SecurityPolicy::default(), &[]);

        let session = h
            .engine
            .run(&agent, "go", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();

        let not_found = session.steps.iter().any(|s| {
            matches!(&s.kind, StepKind::ToolResult { output, .. }
                if output == "Tool not found: definitely_not_a_tool")
        });
        assert!(not_found);
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_is_cancelled_without_llm_calls() {
        let llm = MockLlm::new().with_reply("never seen");
        let h = harness(llm.clone());
        let agent = agent(SecurityPolicy::default(), &[]);

        let cancel = CancelToken::new();
        cancel.cancel();
        let session = h
            .engine
            .run(&agent, "go", RunOptions::default(), cancel)
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Cancelled);
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn test_delegation_depth_cap() {
        let llm = MockLlm::new().with_reply("hi");
        let h = harness(llm);
        let agent = agent(SecurityPolicy::default(), &[]);

        let result = h
            .engine
            .run(
                &agent,
                "go",
                RunOptions::delegated(MAX_DELEGATION_DEPTH + 1),
                CancelToken::new(),
            )
            .await;
        assert!(result.is_err());

        let ok = h
            .engine
            .run(
                &agent,
                "go",
                RunOptions::delegated(MAX_DELEGATION_DEPTH),
                CancelToken::new(),
            )
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_llm_failure_fails_session() {
        let llm = MockLlm::new().with_error("connection refused");
        let h = harness(llm);
        let agent = agent(SecurityPolicy::default(), &[]);

        let session = h
            .engine
            .run(&agent, "go", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session
            .result
            .as_ref()
            .unwrap()
            .error
            .as_ref()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_sessions_are_persisted_to_store() {
        let llm = MockLlm::new().with_reply("done");
        let h = harness(llm);
        let agent = agent(SecurityPolicy::default(), &[]);

        let session = h
            .engine
            .run(&agent, "go", RunOptions::default(), CancelToken::new())
            .await
            .unwrap();
        let stored = h.engine.session_store().get(session.id).unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.prompt, "go");
    }
}
