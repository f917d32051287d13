//! Hybrid recall
//!
//! Combines the recency buffer with similarity-ranked recall over older
//! turns. The fusion rule:
//!
//! 1. the last `window` turns, in append order;
//! 2. older turns with an embedding, scored by cosine similarity to the
//!    query, kept when `score >= min_similarity`, best `recall_limit` first
//!    (ties: older first);
//! 3. no turn appears in both lists.

use crate::memory::context_manager::{ContextConfig, ContextManager};
use crate::memory::embeddings::{cosine_similarity, Embedder};
use crate::memory::store::MemoryStore;
use crate::models::{ConversationTurn, Role, ScoredTurn, Session};
use crate::Result;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What memory contributes to one prompt
#[derive(Debug, Clone, Default)]
pub struct RecalledMemory {
    /// Recency buffer, in append order
    pub recent: Vec<ConversationTurn>,
    /// Similar older turns, best first
    pub relevant: Vec<ScoredTurn>,
    /// Turns outside the window, filled only when summarization is due
    pub archive: Vec<ConversationTurn>,
    pub total_turns: usize,
}

impl RecalledMemory {
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.relevant.is_empty()
    }
}

/// Pure fusion step over a session's full history.
pub fn fuse(
    mut history: Vec<ConversationTurn>,
    query_embedding: Option<&[f32]>,
    window: usize,
    config: &ContextConfig,
) -> RecalledMemory {
    let total_turns = history.len();
    let split = total_turns.saturating_sub(window);
    let recent = history.split_off(split);
    let older = history;

    let relevant = match query_embedding {
        Some(query) if config.recall_limit > 0 => {
            let mut scored: Vec<(usize, ScoredTurn)> = older
                .iter()
                .enumerate()
                .filter_map(|(idx, turn)| {
                    let embedding = turn.embedding.as_deref()?;
                    let score = cosine_similarity(query, embedding);
                    (score >= config.min_similarity).then(|| {
                        (
                            idx,
                            ScoredTurn {
                                turn: turn.clone(),
                                score,
                            },
                        )
                    })
                })
                .collect();

            scored.sort_by(|(ia, a), (ib, b)| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
                    .then(ia.cmp(ib))
            });
            scored.truncate(config.recall_limit);
            scored.into_iter().map(|(_, s)| s).collect()
        }
        _ => Vec::new(),
    };

    RecalledMemory {
        recent,
        relevant,
        archive: older,
        total_turns,
    }
}

/// Memory facade used by the orchestrator and the API
pub struct HybridMemory {
    store: Arc<dyn MemoryStore>,
    embedder: Arc<dyn Embedder>,
    context: ContextManager,
}

impl HybridMemory {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedder: Arc<dyn Embedder>,
        config: ContextConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            context: ContextManager::with_config(config),
        }
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub async fn open_session(&self, session: &Session) -> Result<()> {
        self.store.ensure_session(session).await
    }

    /// Append one user turn and one assistant turn, embedded in one call.
    ///
    /// Embedding failure is not fatal; the turns are stored without vectors
    /// and simply never show up in similarity recall.
    pub async fn append_exchange(
        &self,
        session_id: Uuid,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<Vec<ConversationTurn>> {
        let mut turns = vec![
            ConversationTurn::new(session_id, Role::User, user_text),
            ConversationTurn::new(session_id, Role::Assistant, assistant_text),
        ];

        let texts: Vec<String> = turns.iter().map(|t| t.text.clone()).collect();
        match self.embedder.embed(&texts).await {
            Ok(vectors) if vectors.len() == turns.len() => {
                for (turn, vector) in turns.iter_mut().zip(vectors) {
                    turn.embedding = Some(vector);
                }
            }
            Ok(vectors) => warn!(
                expected = turns.len(),
                got = vectors.len(),
                "Embedder returned the wrong number of vectors; storing turns without them"
            ),
            Err(e) => warn!("Embedding failed; storing turns without vectors: {}", e),
        }

        self.store.append(&turns).await?;
        Ok(turns)
    }

    /// Recency buffer plus similarity recall for `query`.
    pub async fn retrieve(&self, session_id: Uuid, query: &str) -> Result<RecalledMemory> {
        let window = self.context.recent_window_for(query);
        self.retrieve_with_window(session_id, query, window).await
    }

    pub async fn retrieve_with_window(
        &self,
        session_id: Uuid,
        query: &str,
        window: usize,
    ) -> Result<RecalledMemory> {
        let history = self.store.history(session_id, None).await?;
        let summarize = self.context.should_summarize(&history, window);

        let query_embedding = if history.len() <= window || query.trim().is_empty() {
            None
        } else {
            match self.embedder.embed_one(query).await {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Query embedding failed; recalling recent turns only: {}", e);
                    None
                }
            }
        };

        let mut recalled = fuse(
            history,
            query_embedding.as_deref(),
            window,
            self.context.config(),
        );
        if !summarize {
            recalled.archive.clear();
        }

        debug!(
            %session_id,
            recent = recalled.recent.len(),
            relevant = recalled.relevant.len(),
            archived = recalled.archive.len(),
            "Memory recalled"
        );

        Ok(recalled)
    }

    /// Full history in append order, or the most recent `limit` turns.
    pub async fn history(
        &self,
        session_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>> {
        self.store.history(session_id, limit).await
    }

    pub async fn clear(&self, session_id: Uuid) -> Result<u64> {
        self.store.clear(session_id).await
    }
}
