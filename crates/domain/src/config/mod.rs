mod chat;
mod llm;
mod observability;
mod server;
mod store;
mod tools;

pub use chat::*;
pub use llm::*;
pub use observability::*;
pub use server::*;
pub use store::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError::warning("llm.providers", "no LLM providers configured"));
        }
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].id"),
                    "provider id must not be empty",
                ));
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError::error(
                    format!("llm.providers[{i}].base_url"),
                    "provider base_url must not be empty",
                ));
            }
        }
        for (role, rc) in &self.llm.roles {
            let provider = rc.model.split('/').next().unwrap_or_default();
            if !self.llm.providers.iter().any(|p| p.id == provider) {
                errors.push(ConfigError::warning(
                    format!("llm.roles.{role}.model"),
                    format!("references unknown provider '{provider}'"),
                ));
            }
        }

        if self.chat.max_tool_loops == 0 {
            errors.push(ConfigError::error(
                "chat.max_tool_loops",
                "must allow at least one model call per turn",
            ));
        }
        if self.chat.event_buffer == 0 {
            errors.push(ConfigError::error("chat.event_buffer", "must be greater than 0"));
        }
        if self.chat.auto_summary.enabled && self.chat.auto_summary.max_chars == 0 {
            errors.push(ConfigError::warning(
                "chat.auto_summary.max_chars",
                "0 sends empty content to the summarizer",
            ));
        }

        for name in &self.tools.require_confirm {
            let known = self.tools.enabled.contains(name)
                || self.tools.assistants.values().any(|a| a.tools.contains(name));
            if !known {
                errors.push(ConfigError::warning(
                    "tools.require_confirm",
                    format!("'{name}' is not enabled for any assistant"),
                ));
            }
        }

        if self.store.kind == StoreKind::Jsonl && self.store.path.as_os_str().is_empty() {
            errors.push(ConfigError::error("store.path", "jsonl store requires a path"));
        }

        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 || rl.burst_size == 0 {
                errors.push(ConfigError::error(
                    "server.rate_limit",
                    "requests_per_second and burst_size must be greater than 0",
                ));
            }
        }
        if self.server.max_concurrent_requests == 0 {
            errors.push(ConfigError::error(
                "server.max_concurrent_requests",
                "must be greater than 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::warning(
                "observability.sample_rate",
                "outside 0.0..=1.0, it will be clamped",
            ));
        }
        if self.server.cors.allows_any() {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}
