//! Language model seam
//!
//! The orchestrator talks to a `LanguageModel`: a chat call that either
//! answers in text or asks for tool calls. `GeminiModel` is the hosted
//! implementation; `MockModel` keeps the service usable without a
//! provider key and drives the tests.

use crate::intent::{IntentClassifier, QueryIntent};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub mod gemini;
pub use gemini::GeminiModel;

/// Function declaration offered to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// A tool result handed back to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelMessage {
    User(String),
    Assistant(String),
    ToolCalls(Vec<ToolCall>),
    ToolResults(Vec<ToolResult>),
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<ModelMessage>,
    /// Empty means the model must answer in text
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Text { text: String, confidence: f32 },
    ToolCalls(Vec<ToolCall>),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse>;
}

/// Mock model for development & testing
///
/// Deterministic: news-style prompts call the news tool, competitor-style
/// prompts call the market tool, tool results are listed back, and
/// anything else is acknowledged in text.
pub struct MockModel;

impl MockModel {
    fn describe_result(result: &ToolResult) -> String {
        if let Some(error) = result.response.get("error").and_then(Value::as_str) {
            return format!("{} was unavailable ({})", result.name, error);
        }

        let titles: Vec<&str> = ["articles", "overview"]
            .iter()
            .filter_map(|key| result.response.get(*key).and_then(Value::as_array))
            .flatten()
            .filter_map(|item| item.get("title").and_then(Value::as_str))
            .take(3)
            .collect();

        if titles.is_empty() {
            format!("{} returned no headlines", result.name)
        } else {
            format!("{}: {}", result.name, titles.join("; "))
        }
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        match request.messages.last() {
            Some(ModelMessage::User(text)) => {
                let offered = |name: &str| request.tools.iter().any(|t| t.name == name);

                let call = match IntentClassifier::classify(text) {
                    QueryIntent::News if offered("get_company_news") => Some(ToolCall {
                        name: "get_company_news".to_string(),
                        args: json!({ "query": text.trim() }),
                    }),
                    QueryIntent::Market if offered("compare_competitors") => Some(ToolCall {
                        name: "compare_competitors".to_string(),
                        args: json!({ "company": text.trim() }),
                    }),
                    _ => None,
                };

                Ok(match call {
                    Some(call) => ModelResponse::ToolCalls(vec![call]),
                    None => ModelResponse::Text {
                        text: format!("Advisor notes: {}", text.trim()),
                        confidence: 0.5,
                    },
                })
            }
            Some(ModelMessage::ToolResults(results)) => {
                let lines: Vec<String> = results
                    .iter()
                    .map(|r| format!("- {}", Self::describe_result(r)))
                    .collect();
                Ok(ModelResponse::Text {
                    text: format!("Here is what I found:\n{}", lines.join("\n")),
                    confidence: 0.5,
                })
            }
            _ => Ok(ModelResponse::Text {
                text: "How can I help with your competitive research?".to_string(),
                confidence: 0.5,
            }),
        }
    }
}
