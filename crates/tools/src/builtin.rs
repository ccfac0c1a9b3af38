//! Tools shipped with the engine.

use std::sync::Arc;

use crate::function::{ToolError, ToolFunction, ToolInvocation};

/// Every built-in tool, keyed by the name used in `[tools] enabled`.
pub fn all() -> Vec<Arc<dyn ToolFunction>> {
    vec![Arc::new(CurrentTime)]
}

/// Returns the current UTC time in RFC 3339.
pub struct CurrentTime;

#[async_trait::async_trait]
impl ToolFunction for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Returns the current date and time (UTC, RFC 3339)."
    }

    async fn invoke(&self, _call: ToolInvocation<'_>) -> Result<String, ToolError> {
        Ok(chrono::Utc::now().to_rfc3339())
    }
}
