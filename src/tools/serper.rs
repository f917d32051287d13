//! Serper search API client shared by the tools

use crate::error::AdvisorError;
use crate::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Clone)]
pub struct SerperClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SerperClient {
    pub fn new(api_key: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `/news` search
    pub async fn news(&self, tool: &str, query: &str, num: usize) -> Result<Value> {
        self.post_json(tool, "/news", &json!({ "q": query, "num": num }))
            .await
    }

    /// `/search` web search
    pub async fn search(&self, tool: &str, query: &str, num: usize) -> Result<Value> {
        self.post_json(tool, "/search", &json!({ "q": query, "num": num }))
            .await
    }

    async fn post_json(&self, tool: &str, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AdvisorError::ToolFetch {
                tool: tool.to_string(),
                reason: format!("request to {} failed: {}", path, e),
            })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdvisorError::ToolFetch {
                tool: tool.to_string(),
                reason: "rate limited by search provider (429)".to_string(),
            });
        }

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdvisorError::ToolFetch {
                tool: tool.to_string(),
                reason: format!("search provider returned {} for {}: {}", status, path, detail),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| {
                AdvisorError::ToolError(format!(
                    "Invalid JSON from search provider: {}",
                    e.without_url()
                ))
            })
    }
}

/// Error for tools called without a configured client
pub(crate) fn not_configured() -> AdvisorError {
    AdvisorError::ToolError("SERPER_API_KEY is not configured".to_string())
}

/// String field of a search result, empty when absent
pub(crate) fn field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or_default()
}
