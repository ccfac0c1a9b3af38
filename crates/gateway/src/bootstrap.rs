//! AppState construction shared by `serve` and `run`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};

use lc_context::HeuristicTokenizer;
use lc_domain::config::{Config, ConfigSeverity};
use lc_providers::ProviderRegistry;
use lc_store::Stores;
use lc_tools::ToolRegistry;

use crate::runtime::ConversationLockMap;
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    check_config(&config)?;
    let stores = Stores::open(&config.store).context("opening stores")?;
    build_with_stores(config, stores)
}

/// Like [`build_app_state`] but with caller-provided stores.
pub fn build_with_stores(config: Arc<Config>, stores: Stores) -> anyhow::Result<AppState> {
    // ── LLM providers ────────────────────────────────────────────────
    let llm = Arc::new(
        ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?,
    );
    tracing::info!(providers = ?llm.list_providers(), "LLM providers ready");

    // ── Tools ────────────────────────────────────────────────────────
    let tools = Arc::new(ToolRegistry::from_config(&config.tools, lc_tools::builtin::all()));
    tracing::info!(tools = tools.len(), "tool registry ready");

    // ── API token (read once, hash for constant-time comparison) ────
    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::info!(source = %format!("env:{env_var}"), "API bearer-token auth enabled");
                Some(Sha256::digest(token.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!("API bearer-token auth DISABLED, set the {env_var} env var to enable it");
                None
            }
        }
    };

    Ok(AppState {
        config,
        llm,
        tools,
        messages: stores.messages,
        conversations: stores.conversations,
        tokenizer: Arc::new(HeuristicTokenizer::default()),
        conversation_locks: Arc::new(ConversationLockMap::new()),
        api_token_hash,
    })
}

/// Periodically drop conversation locks nobody holds, so the map does not
/// keep one semaphore per conversation ever written to.
pub fn spawn_lock_pruner(locks: Arc<ConversationLockMap>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let pruned = locks.prune_idle();
            if pruned > 0 {
                tracing::debug!(pruned, remaining = locks.conversation_count(), "pruned idle conversation locks");
            }
        }
    })
}

fn check_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}
