//! Tool trait and registry
//!
//! Tools are the agent's data-fetch adapters. Each one takes a JSON object
//! and returns a `ToolOutput`, or fails with a fetch error when the
//! upstream search API is unreachable or rejects the call.

use crate::llm::ToolSpec;
use crate::models::{ToolInput, ToolOutput};
use crate::error::AdvisorError;
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub mod market;
pub mod news;
pub mod serper;

pub use market::CompareCompetitorsTool;
pub use news::CompanyNewsTool;
pub use serper::SerperClient;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the parameter object
    fn parameters(&self) -> Value;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function declarations for the model, sorted by name
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, parameters: Value) -> Result<ToolOutput> {
        let tool = self
            .get(name)
            .ok_or_else(|| AdvisorError::ToolNotFound(name.to_string()))?;

        if !parameters.is_object() {
            return Err(AdvisorError::InvalidToolInput(
                "tool arguments must be a JSON object".to_string(),
            ));
        }

        let started = Instant::now();
        let result = tool.execute(&ToolInput::new(parameters)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(tool = name, elapsed_ms, "Tool completed"),
            Err(e) => warn!(tool = name, elapsed_ms, error = %e, "Tool failed"),
        }

        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the news and competitor tools.
///
/// Without a Serper key the tools are still registered so the model can
/// see them; calling them fails with a tool error.
pub fn create_default_registry(
    serper_api_key: Option<String>,
    serper_base_url: &str,
) -> Result<ToolRegistry> {
    let serper = match serper_api_key {
        Some(key) => Some(SerperClient::new(key, serper_base_url)?),
        None => {
            warn!("SERPER_API_KEY not set; news and competitor tools will report errors");
            None
        }
    };

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CompanyNewsTool::new(serper.clone())));
    registry.register(Arc::new(CompareCompetitorsTool::new(serper)));

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo the arguments back"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
            Ok(ToolOutput {
                success: true,
                data: input.parameters.clone(),
                error: None,
            })
        }
    }

    #[test]
    fn test_default_registry_exposes_both_tools() {
        let registry = create_default_registry(None, "http://127.0.0.1:1").unwrap();
        assert_eq!(registry.list(), vec!["compare_competitors", "get_company_news"]);

        let specs = registry.specs();
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().all(|s| s.parameters["type"] == "object"));
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let output = registry.execute("echo", json!({"q": 1})).await.unwrap();
        assert_eq!(output.data, json!({"q": 1}));

        let missing = registry.execute("nope", json!({})).await;
        assert!(matches!(missing, Err(AdvisorError::ToolNotFound(_))));

        let bad_args = registry.execute("echo", json!("text")).await;
        assert!(matches!(bad_args, Err(AdvisorError::InvalidToolInput(_))));
    }
}
