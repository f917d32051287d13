//! Query Intent Classifier
//!
//! Keyword heuristics that sort a prompt into:
//! - News: company announcements and headlines ("latest news on Stripe")
//! - Market: competitor and market-position questions ("who competes with Figma?")
//! - MemoryRecall: questions about the conversation itself ("what was my last question?")
//! - General: everything else
//!
//! The hosted model chooses tools on its own; this classifier drives the
//! mock model and the memory shortcut.

use crate::memory::context_manager::is_memory_question;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    News,
    Market,
    MemoryRecall,
    General,
}

/// Static keyword lists
const NEWS_KEYWORDS: &[&str] = &[
    "news", "headline", "announce", "announcement", "latest", "recent",
    "press", "launch", "launched", "acquisition", "acquire", "funding",
    "layoff", "earnings", "this week", "today",
];

const MARKET_KEYWORDS: &[&str] = &[
    "competitor", "competitors", "compete", "competes", "competition",
    "rival", "market share", "market position", "compare", "comparison",
    "versus", " vs ", " vs.", "alternative", "landscape", "benchmark",
    "pricing strategy", "positioning",
];

/// Literal prompts answered straight from memory
const LAST_QUESTION_PROMPTS: &[&str] = &[
    "what was my last question",
    "what did i ask last",
    "what was my previous question",
];

pub struct IntentClassifier;

impl IntentClassifier {
    pub fn classify(prompt: &str) -> QueryIntent {
        if is_memory_question(prompt) {
            return QueryIntent::MemoryRecall;
        }

        let lowered = format!(" {} ", prompt.to_lowercase());

        let news_score = NEWS_KEYWORDS
            .iter()
            .filter(|kw| lowered.contains(**kw))
            .count();

        let market_score = MARKET_KEYWORDS
            .iter()
            .filter(|kw| lowered.contains(**kw))
            .count();

        match (news_score, market_score) {
            (0, 0) => QueryIntent::General,
            (n, m) if m > n => QueryIntent::Market,
            _ => QueryIntent::News,
        }
    }

    /// True for the literal "what was my last question" family.
    pub fn is_last_question_prompt(prompt: &str) -> bool {
        let normalized = prompt
            .trim()
            .trim_end_matches(|c: char| c == '?' || c == '.' || c == '!')
            .to_lowercase();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        LAST_QUESTION_PROMPTS.contains(&normalized.as_str())
    }
}
