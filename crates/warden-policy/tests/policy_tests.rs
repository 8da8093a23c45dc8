#[cfg(test)]
mod tests {
    use warden_core::{RiskLevel, SecurityPolicy, ToolCall, ToolCategory, ToolDescriptor};
    use warden_policy::{PolicyDecision, PolicyEngine};

    fn shell_tool() -> ToolDescriptor {
        ToolDescriptor::new(
            "execute_command",
            "Run a shell command",
            ToolCategory::Shell,
            RiskLevel::High,
        )
    }

    fn file_tool(name: &str, risk: RiskLevel) -> ToolDescriptor {
        ToolDescriptor::new(name, "file op", ToolCategory::FileOps, risk)
    }

    fn shell_call(command: &str) -> ToolCall {
        ToolCall::new("execute_command", &[("command", command)])
    }

    // ── Denylist precedence ────────────────────────────────────

    #[test]
    fn test_denylist_overrides_allowlist() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            command_allowlist: vec!["curl".into()],
            command_denylist: vec!["evil.com".into()],
            ..Default::default()
        };
        // Allowlisted prefix, denylisted substring → block wins.
        let verdict = engine.evaluate(&shell_tool(), &shell_call("curl https://evil.com"), &policy);
        assert_eq!(verdict.decision, PolicyDecision::Block);
        assert_eq!(verdict.risk, RiskLevel::Critical);
        assert!(verdict.reasoning.contains("denylist"));
    }

    #[test]
    fn test_catastrophic_patterns_block() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy::unattended();
        for command in [
            "rm -rf /",
            "dd if=/dev/zero of=/dev/sda",
            ":(){ :|:& };:",
            "chmod -R 777 /",
            "echo x > /dev/sda",
        ] {
            let verdict = engine.evaluate(&shell_tool(), &shell_call(command), &policy);
            assert_eq!(
                verdict.decision,
                PolicyDecision::Block,
                "expected block for {command:?}"
            );
            assert_eq!(verdict.risk, RiskLevel::Critical);
            assert!(verdict.reasoning.contains("critical pattern"));
        }
    }

    #[test]
    fn test_denylist_matches_path_argument() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            command_denylist: vec!["secrets".into()],
            ..Default::default()
        };
        let call = ToolCall::new("read_file", &[("path", "/home/me/secrets/key.pem")]);
        let verdict = engine.evaluate(&file_tool("read_file", RiskLevel::Low), &call, &policy);
        assert_eq!(verdict.decision, PolicyDecision::Block);
    }

    // ── Privilege check ────────────────────────────────────────

    #[test]
    fn test_sudo_blocked_by_default() {
        let engine = PolicyEngine::new();
        let verdict = engine.evaluate(
            &shell_tool(),
            &shell_call("sudo apt install nmap"),
            &SecurityPolicy::default(),
        );
        assert_eq!(verdict.decision, PolicyDecision::Block);
        assert!(verdict.reasoning.contains("privileged"));
    }

    #[test]
    fn test_sudo_permitted_escalates_to_high() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            allow_privileged_shell: true,
            auto_approve_ceiling: RiskLevel::Medium,
            ..Default::default()
        };
        let verdict = engine.evaluate(&shell_tool(), &shell_call("sudo systemctl restart x"), &policy);
        // Permitted, but risk is at least high → above the medium ceiling.
        assert_eq!(verdict.decision, PolicyDecision::Ask);
        assert!(verdict.risk >= RiskLevel::High);
        assert_eq!(verdict.impact, "system-wide changes may occur");
    }

    // ── Allowlist gate ─────────────────────────────────────────

    #[test]
    fn test_empty_allowlist_means_any() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            auto_approve_ceiling: RiskLevel::High,
            ..Default::default()
        };
        let verdict = engine.evaluate(&shell_tool(), &shell_call("ls -la"), &policy);
        assert_eq!(verdict.decision, PolicyDecision::Allow);
    }

    #[test]
    fn test_nonempty_allowlist_blocks_even_ls() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            command_allowlist: vec!["git ".into()],
            ..Default::default()
        };
        let verdict = engine.evaluate(&shell_tool(), &shell_call("ls"), &policy);
        assert_eq!(verdict.decision, PolicyDecision::Block);
        assert!(verdict.reasoning.contains("allowlist"));
    }

    #[test]
    fn test_allowlist_prefix_match_passes() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            command_allowlist: vec!["git ".into()],
            auto_approve_ceiling: RiskLevel::High,
            ..Default::default()
        };
        let verdict = engine.evaluate(&shell_tool(), &shell_call("git status"), &policy);
        assert_eq!(verdict.decision, PolicyDecision::Allow);
    }

    // ── Risk classification ────────────────────────────────────

    #[test]
    fn test_effective_risk_never_below_intrinsic() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy::default();
        let tool = file_tool("delete_file", RiskLevel::High);
        let call = ToolCall::new("delete_file", &[("path", "/tmp/scratch.txt")]);
        let verdict = engine.evaluate(&tool, &call, &policy);
        assert!(verdict.risk >= tool.risk_level);
    }

    #[test]
    fn test_restricted_path_bumps_to_high() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy::default();
        let tool = file_tool("read_file", RiskLevel::Low);
        let call = ToolCall::new("read_file", &[("path", "/etc/shadow")]);
        let verdict = engine.evaluate(&tool, &call, &policy);
        assert!(verdict.risk >= RiskLevel::High);
        assert_eq!(verdict.decision, PolicyDecision::Ask);
        assert!(verdict.reasoning.contains("restricted"));
    }

    #[test]
    fn test_deletion_verb_bumps_to_medium() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            auto_approve_ceiling: RiskLevel::Low,
            ..Default::default()
        };
        let tool = ToolDescriptor::new(
            "execute_command",
            "shell",
            ToolCategory::Shell,
            RiskLevel::Low,
        );
        let verdict = engine.evaluate(&tool, &shell_call("rm ./scratch.txt"), &policy);
        assert!(verdict.risk >= RiskLevel::Medium);
        assert_eq!(verdict.decision, PolicyDecision::Ask);
        assert_eq!(verdict.impact, "files will be permanently deleted");
    }

    // ── Auto-approve decision ──────────────────────────────────

    #[test]
    fn test_critical_ceiling_approves_everything_not_blocked() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy::unattended();
        let verdict = engine.evaluate(
            &file_tool("delete_file", RiskLevel::High),
            &ToolCall::new("delete_file", &[("path", "/tmp/x")]),
            &policy,
        );
        assert_eq!(verdict.decision, PolicyDecision::Allow);
    }

    #[test]
    fn test_require_approval_asks_even_for_low_risk() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy {
            require_approval: true,
            auto_approve_ceiling: RiskLevel::Critical,
            ..Default::default()
        };
        let verdict = engine.evaluate(
            &file_tool("read_file", RiskLevel::Low),
            &ToolCall::new("read_file", &[("path", "/tmp/notes.txt")]),
            &policy,
        );
        assert_eq!(verdict.decision, PolicyDecision::Ask);
    }

    #[test]
    fn test_impact_falls_back_to_target_path() {
        let engine = PolicyEngine::new();
        let verdict = engine.evaluate(
            &file_tool("write_file", RiskLevel::Medium),
            &ToolCall::new("write_file", &[("path", "/tmp/x"), ("content", "hi")]),
            &SecurityPolicy::default(),
        );
        assert_eq!(verdict.impact, "Target: /tmp/x");
    }

    #[test]
    fn test_verdicts_are_deterministic() {
        let engine = PolicyEngine::new();
        let policy = SecurityPolicy::default();
        let call = shell_call("cat /var/log/syslog");
        let a = engine.evaluate(&shell_tool(), &call, &policy);
        let b = engine.evaluate(&shell_tool(), &call, &policy);
        assert_eq!(a.decision, b.decision);
        assert_eq!(a.risk, b.risk);
        assert_eq!(a.reasoning, b.reasoning);
    }
}
