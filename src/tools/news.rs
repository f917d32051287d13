//! News aggregation tool

use crate::error::AdvisorError;
use crate::models::{ToolInput, ToolOutput};
use crate::tools::serper::{field, not_configured, SerperClient};
use crate::tools::Tool;
use crate::Result;
use serde_json::{json, Value};

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 10;

pub struct CompanyNewsTool {
    api: Option<SerperClient>,
}

impl CompanyNewsTool {
    pub fn new(api: Option<SerperClient>) -> Self {
        Self { api }
    }
}

/// Reduce a Serper `/news` body to the article fields the model needs.
pub fn parse_news(query: &str, body: &Value, limit: usize) -> Value {
    let articles: Vec<Value> = body
        .get("news")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| !field(item, "title").is_empty())
                .take(limit)
                .map(|item| {
                    json!({
                        "title": field(item, "title"),
                        "source": field(item, "source"),
                        "date": field(item, "date"),
                        "snippet": field(item, "snippet"),
                        "link": field(item, "link"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "query": query,
        "articles": articles,
    })
}

#[async_trait::async_trait]
impl Tool for CompanyNewsTool {
    fn name(&self) -> &'static str {
        "get_company_news"
    }

    fn description(&self) -> &'static str {
        "Fetch recent news articles about a company, product or market"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Company name or news topic"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of articles (1-10, default 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let query = input
            .str_param(&["query", "company"])
            .ok_or_else(|| {
                AdvisorError::InvalidToolInput("Expected 'query' for get_company_news".to_string())
            })?
            .to_string();

        let limit = input
            .parameters
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| (l as usize).clamp(1, MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT);

        let api = self.api.as_ref().ok_or_else(not_configured)?;
        let body = api.news(self.name(), &query, limit).await?;

        Ok(ToolOutput {
            success: true,
            data: parse_news(&query, &body, limit),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_news_keeps_titled_articles() {
        let body = json!({
            "news": [
                {"title": "Stripe launches stablecoin accounts", "source": "TechCrunch",
                 "date": "2 hours ago", "snippet": "...", "link": "https://example.com/a",
                 "imageUrl": "https://example.com/a.png"},
                {"snippet": "no title"},
                {"title": "Stripe valuation climbs", "source": "Reuters",
                 "link": "https://example.com/b"}
            ]
        });

        let parsed = parse_news("Stripe", &body, 5);
        let articles = parsed["articles"].as_array().unwrap();

        assert_eq!(parsed["query"], "Stripe");
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0]["source"], "TechCrunch");
        assert!(articles[0].get("imageUrl").is_none());
        assert_eq!(articles[1]["date"], "");
    }

    #[test]
    fn test_parse_news_respects_limit_and_missing_key() {
        let body = json!({"news": [{"title": "a"}, {"title": "b"}, {"title": "c"}]});
        assert_eq!(parse_news("x", &body, 2)["articles"].as_array().unwrap().len(), 2);
        assert_eq!(
            parse_news("x", &json!({}), 2)["articles"],
            json!([])
        );
    }

    #[tokio::test]
    async fn test_requires_query() {
        let tool = CompanyNewsTool::new(None);
        let result = tool.execute(&ToolInput::new(json!({"limit": 3}))).await;
        assert!(matches!(result, Err(AdvisorError::InvalidToolInput(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let tool = CompanyNewsTool::new(None);
        let err = tool
            .execute(&ToolInput::new(json!({"query": "Stripe"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }
}
