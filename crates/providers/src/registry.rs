//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication (env vars, direct
//! keys), and instantiates the adapter for each configured provider.

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use lc_domain::config::{LlmConfig, LlmStartupPolicy, ProviderKind};
use lc_domain::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers and role assignments.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    roles: HashMap<String, String>,
}

/// A provider together with the model name to request from it.
#[derive(Clone)]
pub struct ResolvedModel {
    pub provider: Arc<dyn LlmProvider>,
    /// `None` means the provider's default model.
    pub model: Option<String>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Providers that fail to initialize are logged and skipped. Under
    /// [`LlmStartupPolicy::RequireOne`] an empty result is an error.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.default_timeout_ms);
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::OpenaiCompat => OpenAiCompatProvider::from_config(pc, timeout)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            };

            match result {
                Ok(provider) => {
                    tracing::info!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        "registered LLM provider"
                    );
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if providers.is_empty() {
            if config.startup_policy == LlmStartupPolicy::RequireOne {
                return Err(Error::Config(
                    "llm.startup_policy is require_one but no provider initialized".into(),
                ));
            }
            tracing::warn!(
                "no LLM providers initialized; chat endpoints will fail \
                 until a provider is configured"
            );
        }

        let roles = config
            .roles
            .iter()
            .map(|(name, role)| (name.clone(), role.model.clone()))
            .collect();

        Ok(Self { providers, roles })
    }

    /// Register a provider instance directly.
    pub fn insert(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers
            .insert(provider.provider_id().to_string(), provider);
    }

    /// Assign a role to a "provider_id/model_name" spec.
    pub fn set_role(&mut self, role: impl Into<String>, model_spec: impl Into<String>) {
        self.roles.insert(role.into(), model_spec.into());
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Resolve a "provider_id/model_name" spec. A bare provider id
    /// resolves to that provider's default model.
    pub fn resolve(&self, model_spec: &str) -> Option<ResolvedModel> {
        let (provider_id, model) = match model_spec.split_once('/') {
            Some((p, m)) if !m.is_empty() => (p, Some(m.to_string())),
            Some((p, _)) => (p, None),
            None => (model_spec, None),
        };
        let provider = self.providers.get(provider_id)?.clone();
        Some(ResolvedModel { provider, model })
    }

    /// Resolve the model assigned to a role (e.g. "executor", "summarizer").
    pub fn for_role(&self, role: &str) -> Option<ResolvedModel> {
        self.resolve(self.roles.get(role)?)
    }

    /// Get the model spec assigned to a given role.
    pub fn model_for_role(&self, role: &str) -> Option<&str> {
        self.roles.get(role).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}
