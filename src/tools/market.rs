//! Competitor / market comparison tool
//!
//! One search for the company's competitive landscape, then one per named
//! competitor. A failed competitor lookup is reported inline; a failed
//! company lookup fails the tool.

use crate::error::AdvisorError;
use crate::models::{ToolInput, ToolOutput};
use crate::tools::serper::{field, not_configured, SerperClient};
use crate::tools::Tool;
use crate::Result;
use serde_json::{json, Value};
use tracing::warn;

const MAX_COMPETITORS: usize = 4;
const OVERVIEW_RESULTS: usize = 5;
const HIGHLIGHTS_PER_COMPETITOR: usize = 3;

pub struct CompareCompetitorsTool {
    api: Option<SerperClient>,
}

impl CompareCompetitorsTool {
    pub fn new(api: Option<SerperClient>) -> Self {
        Self { api }
    }
}

/// Organic results as `{title, snippet, link}`
pub fn organic_results(body: &Value, limit: usize) -> Vec<Value> {
    body.get("organic")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| !field(item, "title").is_empty())
                .take(limit)
                .map(|item| {
                    json!({
                        "title": field(item, "title"),
                        "snippet": field(item, "snippet"),
                        "link": field(item, "link"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `relatedSearches[].query` strings
pub fn related_searches(body: &Value) -> Vec<String> {
    body.get("relatedSearches")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| field(item, "query").to_string())
                .filter(|q| !q.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Competitor names from the `competitors` argument (array or comma list).
pub fn competitor_names(parameters: &Value) -> Vec<String> {
    let names: Vec<String> = match parameters.get("competitors") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        Some(Value::String(list)) => list.split(',').map(|s| s.trim().to_string()).collect(),
        _ => Vec::new(),
    };

    let mut unique: Vec<String> = Vec::new();
    for name in names.into_iter().filter(|n| !n.is_empty()) {
        if !unique.iter().any(|u| u.eq_ignore_ascii_case(&name)) {
            unique.push(name);
        }
    }
    unique.truncate(MAX_COMPETITORS);
    unique
}

#[async_trait::async_trait]
impl Tool for CompareCompetitorsTool {
    fn name(&self) -> &'static str {
        "compare_competitors"
    }

    fn description(&self) -> &'static str {
        "Look up a company's competitive landscape and, optionally, named competitors"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company": {
                    "type": "string",
                    "description": "Company to analyze"
                },
                "competitors": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Competitors to compare against (up to 4)"
                }
            },
            "required": ["company"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let company = input
            .str_param(&["company", "query"])
            .ok_or_else(|| {
                AdvisorError::InvalidToolInput(
                    "Expected 'company' for compare_competitors".to_string(),
                )
            })?
            .to_string();
        let competitors = competitor_names(&input.parameters);

        let api = self.api.as_ref().ok_or_else(not_configured)?;

        let landscape = api
            .search(
                self.name(),
                &format!("{} competitors market share", company),
                OVERVIEW_RESULTS,
            )
            .await?;

        let mut compared = Vec::with_capacity(competitors.len());
        for name in &competitors {
            match api
                .search(
                    self.name(),
                    &format!("{} vs {}", name, company),
                    HIGHLIGHTS_PER_COMPETITOR,
                )
                .await
            {
                Ok(body) => compared.push(json!({
                    "name": name,
                    "highlights": organic_results(&body, HIGHLIGHTS_PER_COMPETITOR),
                })),
                Err(e) => {
                    warn!(competitor = %name, "Competitor lookup failed: {}", e);
                    compared.push(json!({
                        "name": name,
                        "highlights": [],
                        "error": e.to_string(),
                    }));
                }
            }
        }

        Ok(ToolOutput {
            success: true,
            data: json!({
                "company": company,
                "overview": organic_results(&landscape, OVERVIEW_RESULTS),
                "competitors": compared,
                "related_searches": related_searches(&landscape),
            }),
            error: None,
        })
    }
}
