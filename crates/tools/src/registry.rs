use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use lc_domain::config::ToolsConfig;
use lc_domain::tool::ToolDefinition;

use crate::function::{ToolError, ToolFunction, ToolInvocation};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// All tools known to the process and which assistant may use which.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolFunction>>,
    global: BTreeSet<String>,
    per_assistant: HashMap<String, BTreeSet<String>>,
    confirm: HashSet<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from config, picking implementations out of `available`.
    ///
    /// Names that match no implementation are logged and skipped.
    pub fn from_config(config: &ToolsConfig, available: Vec<Arc<dyn ToolFunction>>) -> Self {
        let mut reg = Self::new();
        for tool in available {
            reg.register(tool);
        }
        for name in &config.enabled {
            if reg.tools.contains_key(name) {
                reg.enable_for_all(name);
            } else {
                tracing::warn!(tool = %name, "tools.enabled names an unknown tool, skipping");
            }
        }
        for (assistant_id, entry) in &config.assistants {
            for name in &entry.tools {
                if reg.tools.contains_key(name) {
                    reg.enable_for(assistant_id, name);
                } else {
                    tracing::warn!(
                        tool = %name,
                        assistant_id = %assistant_id,
                        "assistant tool list names an unknown tool, skipping"
                    );
                }
            }
        }
        for name in &config.require_confirm {
            reg.require_confirm(name);
        }
        reg
    }

    pub fn register(&mut self, tool: Arc<dyn ToolFunction>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn enable_for_all(&mut self, name: impl Into<String>) {
        self.global.insert(name.into());
    }

    pub fn enable_for(&mut self, assistant_id: impl Into<String>, name: impl Into<String>) {
        self.per_assistant
            .entry(assistant_id.into())
            .or_default()
            .insert(name.into());
    }

    /// Force user confirmation for `name` whatever the tool declares.
    pub fn require_confirm(&mut self, name: impl Into<String>) {
        self.confirm.insert(name.into());
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The tools available to one assistant.
    pub fn resolve_tools(&self, assistant_id: &str) -> ToolSet {
        let mut names: BTreeSet<&str> = self.global.iter().map(String::as_str).collect();
        if let Some(extra) = self.per_assistant.get(assistant_id) {
            names.extend(extra.iter().map(String::as_str));
        }
        let tools = names
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                if self.confirm.contains(tool.name()) && !tool.require_confirm() {
                    Arc::new(ConfirmRequired(Arc::clone(tool))) as Arc<dyn ToolFunction>
                } else {
                    Arc::clone(tool)
                }
            })
            .collect();
        ToolSet { tools }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool set
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The tools in effect for one assistant.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn ToolFunction>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn ToolFunction>>) -> Self {
        Self { tools }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ToolFunction>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Wraps a tool so that it always asks for confirmation.
struct ConfirmRequired(Arc<dyn ToolFunction>);

#[async_trait::async_trait]
impl ToolFunction for ConfirmRequired {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn parameters(&self) -> serde_json::Value {
        self.0.parameters()
    }

    fn require_confirm(&self) -> bool {
        true
    }

    async fn invoke(&self, call: ToolInvocation<'_>) -> Result<String, ToolError> {
        self.0.invoke(call).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use lc_domain::config::AssistantToolsConfig;

    struct Echo(&'static str);

    #[async_trait::async_trait]
    impl ToolFunction for Echo {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "echo"
        }
        async fn invoke(&self, call: ToolInvocation<'_>) -> Result<String, ToolError> {
            Ok(call.args.to_string())
        }
    }

    fn available() -> Vec<Arc<dyn ToolFunction>> {
        vec![Arc::new(Echo("a")), Arc::new(Echo("b")), Arc::new(Echo("c"))]
    }

    #[test]
    fn global_and_per_assistant_tools_merge() {
        let mut config = ToolsConfig { enabled: vec!["a".into()], ..Default::default() };
        config
            .assistants
            .insert("helper".into(), AssistantToolsConfig { tools: vec!["c".into()] });
        let reg = ToolRegistry::from_config(&config, available());

        assert_eq!(reg.resolve_tools("helper").names(), vec!["a", "c"]);
        assert_eq!(reg.resolve_tools("other").names(), vec!["a"]);
        assert!(reg.resolve_tools("other").lookup("c").is_none());
    }

    #[test]
    fn unknown_names_are_skipped() {
        let config = ToolsConfig { enabled: vec!["nope".into(), "b".into()], ..Default::default() };
        let reg = ToolRegistry::from_config(&config, available());
        assert_eq!(reg.resolve_tools("x").names(), vec!["b"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn confirm_override_wraps_tool() {
        let config = ToolsConfig {
            enabled: vec!["a".into(), "b".into()],
            require_confirm: vec!["b".into()],
            ..Default::default()
        };
        let set = ToolRegistry::from_config(&config, available()).resolve_tools("x");
        assert!(!set.lookup("a").unwrap().require_confirm());
        let b = set.lookup("b").unwrap();
        assert!(b.require_confirm());
        assert_eq!(b.name(), "b");
    }

    #[test]
    fn definitions_expose_schema() {
        let set = ToolSet::new(available());
        let defs = set.definitions();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].parameters["type"], "object");
    }
}
