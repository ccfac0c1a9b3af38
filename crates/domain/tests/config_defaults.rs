use lc_domain::config::{Config, ConfigSeverity, StoreKind};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.api_token_env, "LC_API_TOKEN");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn empty_file_yields_engine_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.chat.max_tool_loops, 10);
    assert_eq!(config.chat.default_token_limit, 8000);
    assert!(config.chat.auto_summary.enabled);
    assert_eq!(config.chat.auto_summary.max_chars, 300);
    assert_eq!(config.tools.enabled, vec!["current_time".to_string()]);
    assert_eq!(config.store.kind, StoreKind::Jsonl);
}

#[test]
fn chat_section_overrides() {
    let toml_str = r#"
[chat]
max_tool_loops = 3

[chat.auto_summary]
enabled = false
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.chat.max_tool_loops, 3);
    assert!(!config.chat.auto_summary.enabled);
    assert_eq!(config.chat.auto_summary.max_chars, 300);
    assert_eq!(config.chat.event_buffer, 64);
}

#[test]
fn tools_section_parses_assistant_lists() {
    let toml_str = r#"
[tools]
enabled = []
require_confirm = ["current_time"]

[tools.assistants.helper]
tools = ["current_time"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config.tools.enabled.is_empty());
    assert_eq!(config.tools.assistants["helper"].tools, vec!["current_time".to_string()]);
    assert!(config.validate().iter().all(|e| e.field != "tools.require_confirm"));
}

#[test]
fn default_config_only_warns_about_providers() {
    let issues = Config::default().validate();
    assert!(issues.iter().all(|e| e.severity == ConfigSeverity::Warning));
    assert!(issues.iter().any(|e| e.field == "llm.providers"));
}

#[test]
fn zero_tool_loops_is_an_error() {
    let mut config = Config::default();
    config.chat.max_tool_loops = 0;
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|e| e.field == "chat.max_tool_loops" && e.severity == ConfigSeverity::Error));
}

#[test]
fn role_with_unknown_provider_warns() {
    let toml_str = r#"
[llm.roles.executor]
model = "missing/gpt"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues.iter().any(|e| e.field == "llm.roles.executor.model"));
}

#[test]
fn zero_rate_limit_is_an_error() {
    let toml_str = r#"
[server.rate_limit]
requests_per_second = 0
burst_size = 10
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "server.rate_limit" && i.severity == ConfigSeverity::Error));
}
