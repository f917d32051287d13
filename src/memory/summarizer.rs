//! History digests and summarization
//!
//! The digest is a cheap, deterministic rendering of the last few
//! exchanges for the system prompt. Summarization asks the language model
//! to compress older history once it outgrows the token budget.

use crate::error::AdvisorError;
use crate::llm::{LanguageModel, ModelMessage, ModelRequest, ModelResponse};
use crate::models::{ConversationTurn, Role};
use tracing::{info, warn};

const NO_HISTORY: &str = "No previous conversation history.";

/// Render the last `max_exchanges` exchanges as "User asked / AI answered"
/// lines, truncating each turn to `max_chars` characters.
pub fn conversation_digest(
    turns: &[ConversationTurn],
    max_exchanges: usize,
    max_chars: usize,
) -> String {
    if turns.is_empty() {
        return NO_HISTORY.to_string();
    }

    let start = turns.len().saturating_sub(max_exchanges * 2);

    turns[start..]
        .iter()
        .map(|turn| {
            let prefix = match turn.role {
                Role::User => "User asked: ",
                Role::Assistant => "AI answered: ",
            };
            format!("{}{}", prefix, truncate_chars(&turn.text, max_chars))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Most recent user question other than `current`.
pub fn last_user_question<'a>(turns: &'a [ConversationTurn], current: &str) -> Option<&'a str> {
    let current = current.trim();
    turns
        .iter()
        .rev()
        .filter(|t| t.role == Role::User)
        .map(|t| t.text.as_str())
        .find(|text| text.trim() != current)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Format turns into readable text for summarization
fn format_turns_for_summary(turns: &[ConversationTurn]) -> String {
    let mut text = String::new();

    for turn in turns {
        let role_str = match turn.role {
            Role::User => "User",
            Role::Assistant => "Advisor",
        };
        text.push_str(&format!("{}: {}\n", role_str, turn.text));
    }

    text
}

/// Summarizes older conversation using the language model
pub struct ContextSummarizer;

impl ContextSummarizer {
    pub async fn summarize(
        model: &dyn LanguageModel,
        turns: &[ConversationTurn],
    ) -> crate::Result<String> {
        if turns.is_empty() {
            return Err(AdvisorError::InvalidRequest(
                "Cannot summarize empty history".to_string(),
            ));
        }

        let prompt = format!(
            r#"Summarize the following competitive-intelligence conversation.

Keep:
1. Companies, competitors and markets discussed
2. Questions the user asked
3. Key findings, figures and conclusions

Use short bullet points, about 20-30% of the original length.

CONVERSATION:
---
{}
---

SUMMARY:"#,
            format_turns_for_summary(turns)
        );

        info!("Summarizing {} older turns", turns.len());

        let request = ModelRequest {
            system: "You condense conversations into factual summaries.".to_string(),
            messages: vec![ModelMessage::User(prompt)],
            tools: vec![],
        };

        match model.generate(&request).await {
            Ok(ModelResponse::Text { text, .. }) if !text.trim().is_empty() => Ok(text),
            Ok(_) => Err(AdvisorError::LlmError(
                "Summarization returned no text".to_string(),
            )),
            Err(e) => {
                warn!("Failed to summarize history: {}", e);
                Err(e)
            }
        }
    }
}
