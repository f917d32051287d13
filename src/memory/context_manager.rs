//! Context Window Management
//!
//! Decides how much history goes into a prompt: the size of the recency
//! buffer, how many similar turns to recall, and when older history has
//! grown large enough to be summarized.

use crate::models::ConversationTurn;
use tracing::info;

/// Phrases that mark a question about the conversation itself
const MEMORY_KEYWORDS: &[&str] = &[
    "last question",
    "previous",
    "earlier",
    "what did i ask",
    "what was my",
    "we discussed",
    "you said",
];

/// Configuration for context window management
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Number of most recent turns always included (the recency buffer)
    pub recent_window: usize,
    /// Maximum similar turns recalled from outside the recency buffer
    pub recall_limit: usize,
    /// Minimum cosine similarity for a recalled turn
    pub min_similarity: f32,
    /// Exchanges rendered into the history digest
    pub digest_exchanges: usize,
    /// Characters kept per turn in the digest
    pub digest_max_chars: usize,
    /// Token budget for the whole stored history
    pub max_context_tokens: usize,
    /// Fraction of the budget that triggers summarization
    pub summarization_threshold: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            recent_window: 6,
            recall_limit: 4,
            min_similarity: 0.35,
            digest_exchanges: 3,
            digest_max_chars: 100,
            max_context_tokens: 8_000,
            summarization_threshold: 0.8,
        }
    }
}

/// Manages context window and triggers summarization
#[derive(Debug, Clone)]
pub struct ContextManager {
    config: ContextConfig,
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Recency buffer size for this prompt; doubled for memory questions.
    pub fn recent_window_for(&self, prompt: &str) -> usize {
        if is_memory_question(prompt) {
            self.config.recent_window.saturating_mul(2)
        } else {
            self.config.recent_window
        }
    }

    /// Total tokens at which older history gets summarized
    pub fn threshold_tokens(&self) -> usize {
        (self.config.max_context_tokens as f32 * self.config.summarization_threshold) as usize
    }

    /// Check if the stored history is too large to send verbatim
    pub fn should_summarize(&self, history: &[ConversationTurn], window: usize) -> bool {
        let current_tokens: usize = history.iter().map(ConversationTurn::token_count).sum();
        let should = current_tokens >= self.threshold_tokens() && history.len() > window;

        if should {
            info!(
                "History at {}/{} tokens (threshold: {}). Summarization needed.",
                current_tokens,
                self.config.max_context_tokens,
                self.threshold_tokens()
            );
        }

        should
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the prompt asks about the conversation itself.
pub fn is_memory_question(prompt: &str) -> bool {
    let lowered = prompt.to_lowercase();
    MEMORY_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}
