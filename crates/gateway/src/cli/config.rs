//! `logicle-engine config validate | show`.

use std::fmt::Write as _;

use lc_domain::config::{Config, ConfigSeverity, StoreKind};

use crate::state::{EXECUTOR_ROLE, SUMMARIZER_ROLE};

const REDACTED: &str = "<redacted>";

/// Print validation issues and the resolved engine wiring. Returns `false`
/// when any issue is an error.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let (report, ok) = validation_report(config, config_path);
    print!("{report}");
    ok
}

fn validation_report(config: &Config, config_path: &str) -> (String, bool) {
    let issues = config.validate();
    let errors = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    let mut out = String::new();
    for issue in &issues {
        let _ = writeln!(out, "{issue}");
    }
    if issues.is_empty() {
        let _ = writeln!(out, "Config OK ({config_path})");
    } else {
        let _ = writeln!(
            out,
            "{errors} error(s), {} warning(s) in {config_path}",
            issues.len() - errors
        );
    }

    let role = |name: &str| {
        config
            .llm
            .roles
            .get(name)
            .map(|r| r.model.clone())
            .unwrap_or_else(|| "-".into())
    };
    let summarizer = config
        .llm
        .roles
        .get(SUMMARIZER_ROLE)
        .map(|r| r.model.clone())
        .unwrap_or_else(|| format!("{} (executor)", role(EXECUTOR_ROLE)));
    let store = match config.store.kind {
        StoreKind::Memory => "memory".to_owned(),
        StoreKind::Jsonl => format!("jsonl at {}", config.store.path.display()),
    };

    let _ = writeln!(out, "\nexecutor:   {}", role(EXECUTOR_ROLE));
    let _ = writeln!(out, "summarizer: {summarizer}");
    let _ = writeln!(out, "store:      {store}");
    let _ = writeln!(out, "tools:      {}", config.tools.enabled.join(", "));
    let _ = writeln!(out, "confirm:    {}", config.tools.require_confirm.join(", "));

    (out, errors == 0)
}

/// Dump the resolved config as TOML, with inline provider keys redacted.
pub fn show(config: &Config) -> anyhow::Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

fn render(config: &Config) -> anyhow::Result<String> {
    let mut config = config.clone();
    for provider in &mut config.llm.providers {
        if provider.auth.key.is_some() {
            provider.auth.key = Some(REDACTED.into());
        }
    }
    toml::to_string_pretty(&config).map_err(|e| anyhow::anyhow!("serializing config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(raw: &str) -> Config {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn report_lists_roles_and_store() {
        let cfg = config(
            r#"
[[llm.providers]]
id = "local"
kind = "openai_compat"
base_url = "http://localhost:11434/v1"

[llm.roles.executor]
model = "local/llama3"

[store]
kind = "memory"
"#,
        );
        let (report, ok) = validation_report(&cfg, "config.toml");
        assert!(ok);
        assert!(report.contains("Config OK (config.toml)"));
        assert!(report.contains("executor:   local/llama3"));
        assert!(report.contains("summarizer: local/llama3 (executor)"));
        assert!(report.contains("store:      memory"));
    }

    #[test]
    fn errors_fail_the_report() {
        let cfg = config("[chat]\nmax_tool_loops = 0");
        let (report, ok) = validation_report(&cfg, "c.toml");
        assert!(!ok);
        assert!(report.contains("chat.max_tool_loops"));
    }

    #[test]
    fn inline_keys_are_redacted() {
        let cfg = config(
            r#"
[[llm.providers]]
id = "openai"
kind = "openai_compat"
base_url = "https://api.openai.com/v1"
auth = { key = "sk-live-secret" }
"#,
        );
        let out = render(&cfg).unwrap();
        assert!(!out.contains("sk-live-secret"));
        assert!(out.contains(REDACTED));
    }
}
