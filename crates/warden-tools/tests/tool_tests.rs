#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use warden_core::{Result, RiskLevel, ToolCall, ToolCategory, ToolDescriptor};
    use warden_memory::MemoryStore;
    use warden_tools::{register_builtins, ToolHandler, ToolRegistry};

    const BUDGET: Duration = Duration::from_secs(30);

    fn registry_with_builtins() -> (ToolRegistry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let memory = Arc::new(MemoryStore::open(&dir.path().join("memory.json")).unwrap());
        let registry = ToolRegistry::new();
        register_builtins(&registry, memory);
        (registry, dir)
    }

    fn call(name: &str, args: &[(&str, &str)]) -> ToolCall {
        ToolCall::new(name, args)
    }

    // ── Registry semantics ─────────────────────────────────────

    #[test]
    fn test_builtin_set_is_complete() {
        let (registry, _dir) = registry_with_builtins();
        for name in [
            "read_file",
            "list_directory",
            "get_file_info",
            "search_files",
            "count_lines",
            "write_file",
            "append_to_file",
            "move_file",
            "copy_file",
            "create_directory",
            "delete_file",
            "execute_command",
            "get_current_datetime",
            "get_system_info",
            "list_processes",
            "fetch_url",
            "web_search",
            "http_request",
            "git_status",
            "git_log",
            "git_diff",
            "git_branch",
            "git_clone",
            "git_commit",
            "search_in_file",
            "replace_in_file",
            "calculate",
            "parse_json",
            "encode_base64",
            "decode_base64",
            "read_clipboard",
            "write_clipboard",
            "take_screenshot",
            "run_python",
            "run_node",
            "get_screen_info",
            "move_mouse",
            "click_mouse",
            "scroll_mouse",
            "type_text",
            "press_key",
            "run_applescript_or_platform_script",
            "memory_save",
            "memory_read",
            "memory_list",
            "memory_delete",
            "update_self",
        ] {
            assert!(registry.contains(name), "missing builtin: {name}");
        }
    }

    #[test]
    fn test_intrinsic_risk_levels() {
        let (registry, _dir) = registry_with_builtins();
        assert_eq!(registry.get("read_file").unwrap().risk_level, RiskLevel::Low);
        assert_eq!(registry.get("write_file").unwrap().risk_level, RiskLevel::Medium);
        assert_eq!(registry.get("delete_file").unwrap().risk_level, RiskLevel::High);
        assert_eq!(registry.get("execute_command").unwrap().risk_level, RiskLevel::High);
        assert_eq!(registry.get("click_mouse").unwrap().risk_level, RiskLevel::High);
        assert_eq!(registry.get("update_self").unwrap().risk_level, RiskLevel::Low);
    }

    struct Echo(&'static str);

    #[async_trait]
    impl ToolHandler for Echo {
        async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_last_wins() {
        let registry = ToolRegistry::new();
        let descriptor = ToolDescriptor::new("probe", "first", ToolCategory::System, RiskLevel::Low);
        registry.register(descriptor.clone(), Arc::new(Echo("first")));
        registry.register(
            ToolDescriptor::new("probe", "second", ToolCategory::System, RiskLevel::Medium),
            Arc::new(Echo("second")),
        );
        assert_eq!(registry.get("probe").unwrap().description, "second");
        assert_eq!(registry.get("probe").unwrap().risk_level, RiskLevel::Medium);
        let out = registry.dispatch(&call("probe", &[]), BUDGET).await;
        assert_eq!(out, "second");
    }

    #[tokio::test]
    async fn test_unknown_tool_result_string() {
        let registry = ToolRegistry::new();
        let out = registry.dispatch(&call("no_such_tool", &[]), BUDGET).await;
        assert_eq!(out, "Tool not found: no_such_tool");
    }

    #[test]
    fn test_enabled_filter() {
        let (registry, _dir) = registry_with_builtins();
        let enabled: std::collections::HashSet<String> =
            ["read_file", "calculate"].iter().map(|s| s.to_string()).collect();
        let filtered = registry.descriptors_filtered(&enabled);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|d| enabled.contains(&d.name)));
    }

    struct Sleeper;

    #[async_trait]
    impl ToolHandler for Sleeper {
        async fn run(&self, _args: &BTreeMap<String, String>) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_timeout() {
        let registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::new("slow", "sleeps forever", ToolCategory::System, RiskLevel::Low),
            Arc::new(Sleeper),
        );
        let out = registry
            .dispatch(&call("slow", &[]), Duration::from_secs(2))
            .await;
        assert_eq!(out, "Error: timeout");
    }

    // ── File tools ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_write_read_count_roundtrip() {
        let (registry, _mem) = registry_with_builtins();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let path_str = path.to_str().unwrap();

        let out = registry
            .dispatch(
                &call("write_file", &[("path", path_str), ("content", "one\ntwo\nthree")]),
                BUDGET,
            )
            .await;
        assert!(out.contains("Wrote"));

        let out = registry
            .dispatch(&call("read_file", &[("path", path_str)]), BUDGET)
            .await;
        assert_eq!(out, "one\ntwo\nthree");

        let out = registry
            .dispatch(&call("count_lines", &[("path", path_str)]), BUDGET)
            .await;
        assert_eq!(out, "3 lines");
    }

    #[tokio::test]
    async fn test_append_move_copy_delete() {
        let (registry, _mem) = registry_with_builtins();
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");

        registry
            .dispatch(
                &call("write_file", &[("path", a.to_str().unwrap()), ("content", "start")]),
                BUDGET,
            )
            .await;
        registry
            .dispatch(
                &call("append_to_file", &[("path", a.to_str().unwrap()), ("content", "+more")]),
                BUDGET,
            )
            .await;
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "start+more");

        registry
            .dispatch(
                &call(
                    "copy_file",
                    &[("source", a.to_str().unwrap()), ("destination", b.to_str().unwrap())],
                ),
                BUDGET,
            )
            .await;
        assert!(b.exists());

        registry
            .dispatch(
                &call(
                    "move_file",
                    &[("source", b.to_str().unwrap()), ("destination", c.to_str().unwrap())],
                ),
                BUDGET,
            )
            .await;
        assert!(!b.exists());
        assert!(c.exists());

        let out = registry
            .dispatch(&call("delete_file", &[("path", c.to_str().unwrap())]), BUDGET)
            .await;
        assert!(out.starts_with("Deleted"));
        assert!(!c.exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_error_string() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry
            .dispatch(&call("read_file", &[("path", "/nonexistent/x.txt")]), BUDGET)
            .await;
        assert!(out.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_search_files_and_in_file() {
        let (registry, _mem) = registry_with_builtins();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/report_final.md"), "alpha\nbeta alpha\n").unwrap();
        std::fs::write(dir.path().join("other.txt"), "nothing").unwrap();

        let out = registry
            .dispatch(
                &call(
                    "search_files",
                    &[("directory", dir.path().to_str().unwrap()), ("pattern", "report")],
                ),
                BUDGET,
            )
            .await;
        assert!(out.contains("report_final.md"));

        let file = dir.path().join("sub/report_final.md");
        let out = registry
            .dispatch(
                &call(
                    "search_in_file",
                    &[("path", file.to_str().unwrap()), ("pattern", "alpha")],
                ),
                BUDGET,
            )
            .await;
        assert!(out.contains("2 matches"));
        assert!(out.contains("1: alpha"));
    }

    #[tokio::test]
    async fn test_replace_in_file() {
        let (registry, _mem) = registry_with_builtins();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "port=8080\nport=8080\n").unwrap();
        let out = registry
            .dispatch(
                &call(
                    "replace_in_file",
                    &[
                        ("path", path.to_str().unwrap()),
                        ("search", "8080"),
                        ("replacement", "9090"),
                    ],
                ),
                BUDGET,
            )
            .await;
        assert!(out.contains("2 occurrence"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "port=9090\nport=9090\n");
    }

    // ── Shell ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_execute_command_captures_exit_and_output() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry
            .dispatch(&call("execute_command", &[("command", "echo hello")]), BUDGET)
            .await;
        assert!(out.contains("Exit code: 0"));
        assert!(out.contains("hello"));

        let out = registry
            .dispatch(&call("execute_command", &[("command", "exit 3")]), BUDGET)
            .await;
        assert!(out.starts_with("Error:"));
        assert!(out.contains("3"));
    }

    // ── Text/data tools ────────────────────────────────────────

    #[tokio::test]
    async fn test_base64_roundtrip() {
        let (registry, _mem) = registry_with_builtins();
        let original = "warden: übergültig ✓";
        let encoded = registry
            .dispatch(&call("encode_base64", &[("text", original)]), BUDGET)
            .await;
        let decoded = registry
            .dispatch(&call("decode_base64", &[("data", &encoded)]), BUDGET)
            .await;
        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn test_decode_base64_rejects_garbage() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry
            .dispatch(&call("decode_base64", &[("data", "!!not base64!!")]), BUDGET)
            .await;
        assert!(out.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_calculate() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry
            .dispatch(&call("calculate", &[("expression", "(2+3)*4 - 10/4")]), BUDGET)
            .await;
        assert_eq!(out, "17.5");

        let out = registry
            .dispatch(&call("calculate", &[("expression", "2^10")]), BUDGET)
            .await;
        assert_eq!(out, "1024");

        let out = registry
            .dispatch(&call("calculate", &[("expression", "1/0")]), BUDGET)
            .await;
        assert!(out.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_parse_json_with_pointer() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry
            .dispatch(
                &call(
                    "parse_json",
                    &[
                        ("json", r#"{"items":[{"name":"first"},{"name":"second"}]}"#),
                        ("pointer", "/items/1/name"),
                    ],
                ),
                BUDGET,
            )
            .await;
        assert_eq!(out, "\"second\"");

        let out = registry
            .dispatch(&call("parse_json", &[("json", "{broken")]), BUDGET)
            .await;
        assert!(out.starts_with("Error:"));
    }

    // ── Memory tools ───────────────────────────────────────────

    #[tokio::test]
    async fn test_memory_tools_roundtrip() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry
            .dispatch(
                &call("memory_save", &[("key", "city"), ("value", "Rotterdam")]),
                BUDGET,
            )
            .await;
        assert!(out.contains("city"));

        let out = registry
            .dispatch(&call("memory_read", &[("key", "city")]), BUDGET)
            .await;
        assert_eq!(out, "Rotterdam");

        let out = registry.dispatch(&call("memory_list", &[]), BUDGET).await;
        assert!(out.contains("city: Rotterdam"));

        registry
            .dispatch(&call("memory_delete", &[("key", "city")]), BUDGET)
            .await;
        let out = registry
            .dispatch(&call("memory_read", &[("key", "city")]), BUDGET)
            .await;
        assert!(out.starts_with("Error:"));
    }

    // ── update_self sentinel ───────────────────────────────────

    #[tokio::test]
    async fn test_update_self_handler_reports_misuse() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry
            .dispatch(&call("update_self", &[("name", "NewName")]), BUDGET)
            .await;
        assert!(out.starts_with("Error:"));
        assert!(out.contains("execution loop"));
    }

    // ── Missing arguments ──────────────────────────────────────

    #[tokio::test]
    async fn test_missing_required_argument_is_error_string() {
        let (registry, _mem) = registry_with_builtins();
        let out = registry.dispatch(&call("read_file", &[]), BUDGET).await;
        assert!(out.starts_with("Error:"));
        assert!(out.contains("path"));
    }
}
