//! Agent Memory System
//!
//! Session-scoped conversation storage, embeddings, hybrid recall
//! (recency buffer + similarity) and history summarization.

pub mod context_manager;
pub mod embeddings;
pub mod recall;
pub mod store;
pub mod summarizer;

pub use context_manager::{ContextConfig, ContextManager};
pub use embeddings::{Embedder, GeminiEmbedder, LocalEmbedder};
pub use recall::{HybridMemory, RecalledMemory};
pub use store::{build_store, InMemoryMemoryStore, MemoryStore, PostgresMemoryStore};
pub use summarizer::ContextSummarizer;
