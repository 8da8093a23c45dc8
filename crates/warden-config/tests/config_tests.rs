#[cfg(test)]
mod tests {
    use warden_config::*;
    use warden_core::{ProviderTag, RiskLevel};

    // ── Defaults ───────────────────────────────────────────────

    #[test]
    fn test_defaults() {
        let config = WardenConfig::default();
        assert_eq!(config.llm.default_provider, ProviderTag::Ollama);
        assert_eq!(config.llm.ollama_url, "http://localhost:11434");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.security.auto_approve_ceiling, RiskLevel::Medium);
        assert!(!config.security.allow_privileged_shell);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_security_settings_to_policy() {
        let mut settings = SecuritySettings::default();
        settings.require_approval = true;
        settings.command_allowlist = vec!["git ".into()];
        let policy = settings.to_policy();
        assert!(policy.require_approval);
        assert_eq!(policy.command_allowlist, vec!["git ".to_string()]);
        assert_eq!(policy.max_execution_time_secs, 60);
    }

    // ── TOML parsing ───────────────────────────────────────────

    #[test]
    fn test_toml_roundtrip() {
        let config = WardenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: WardenConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.llm.default_model, config.llm.default_model);
        assert_eq!(
            restored.security.auto_approve_ceiling,
            config.security.auto_approve_ceiling
        );
    }

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
[llm]
default_model = "qwen2.5-coder"

[security]
require_approval = true
auto_approve_ceiling = "low"
"#;
        let config: WardenConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.default_model, "qwen2.5-coder");
        assert!(config.security.require_approval);
        assert_eq!(config.security.auto_approve_ceiling, RiskLevel::Low);
        // Defaults fill in the rest.
        assert_eq!(config.llm.ollama_url, "http://localhost:11434");
        assert_eq!(config.llm.max_tokens, 4096);
    }

    // ── Validation ─────────────────────────────────────────────

    #[test]
    fn test_validate_clamps_temperature() {
        let mut config = WardenConfig::default();
        config.llm.temperature = 5.0;
        let warnings = config.validate().unwrap();
        assert_eq!(config.llm.temperature, 2.0);
        assert!(warnings[0].contains("clamped"));
    }

    #[test]
    fn test_validate_rejects_zero_execution_time() {
        let mut config = WardenConfig::default();
        config.security.max_execution_time_secs = 0;
        assert!(config.validate().is_err());
    }

    // ── Loader ─────────────────────────────────────────────────

    #[test]
    fn test_loader_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        std::fs::write(
            &path,
            r#"
[llm]
default_model = "from-file"
"#,
        )
        .unwrap();
        let loader = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(loader.get().llm.default_model, "from-file");
        assert_eq!(loader.path(), path);
    }

    #[test]
    fn test_loader_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loader = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(loader.get().llm.default_provider, ProviderTag::Ollama);
    }

    #[test]
    fn test_loader_rejects_broken_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        std::fs::write(&path, "[llm\nbroken").unwrap();
        assert!(ConfigLoader::load(Some(&path)).is_err());
    }
}
