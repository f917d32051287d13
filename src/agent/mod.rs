//! Advisor orchestrator - one chat turn
//!
//! PROMPT → RECALL → (SHORTCUT?) → TOOL LOOP → FALLBACK? → REMEMBER

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::intent::IntentClassifier;
use crate::llm::{
    GeminiModel, LanguageModel, MockModel, ModelMessage, ModelRequest, ModelResponse, ToolResult,
};
use crate::memory::summarizer::{conversation_digest, last_user_question};
use crate::memory::{
    build_store, ContextSummarizer, Embedder, GeminiEmbedder, HybridMemory, LocalEmbedder,
    RecalledMemory,
};
use crate::models::{ChatReply, ConversationTurn, Role, Session, ToolInvocation};
use crate::tools::{create_default_registry, ToolRegistry};
use crate::Result;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const MAX_TOOL_ROUNDS: usize = 4;

const PERSONA: &str = "You are a competitive intelligence advisor. You help users research \
companies, their competitors and market trends. Use get_company_news for recent news and \
announcements, and compare_competitors for competitive landscape and market share questions. \
Ground your answers in tool results when you have them and mention the sources. Be concise \
and factual, and say so when information is unavailable.";

/// Source reported for answers served straight from memory
const MEMORY_SOURCE: &str = "memory";

pub struct Advisor {
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    memory: HybridMemory,
    session_secret: String,
}

struct Answer {
    text: String,
    confidence: f32,
    source: String,
    tools_used: Vec<ToolInvocation>,
}

impl Advisor {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
        memory: HybridMemory,
        session_secret: impl Into<String>,
    ) -> Self {
        Self {
            model,
            tools,
            memory,
            session_secret: session_secret.into(),
        }
    }

    /// Wire up providers from configuration.
    ///
    /// Without a Google key the mock model and the local embedder are used;
    /// without a database URL memory lives in-process.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        let (model, embedder): (Arc<dyn LanguageModel>, Arc<dyn Embedder>) =
            match &config.google_api_key {
                Some(key) => (
                    Arc::new(GeminiModel::new(key.clone(), config.chat_model.clone())?),
                    Arc::new(GeminiEmbedder::new(
                        key.clone(),
                        config.embedding_model.clone(),
                    )?),
                ),
                None => {
                    warn!("GOOGLE_API_KEY not set; using the mock model and local embeddings");
                    (Arc::new(MockModel), Arc::new(LocalEmbedder::new()))
                }
            };

        let store = build_store(config.database_url.as_deref())?;
        let tools =
            create_default_registry(config.serper_api_key.clone(), &config.serper_base_url)?;
        let memory = HybridMemory::new(store, embedder, config.memory.clone());

        info!(
            model = model.name(),
            embedder = memory.embedder_name(),
            memory_backend = memory.backend_name(),
            tools = ?tools.list(),
            "Advisor initialized"
        );

        Ok(Self::new(model, tools, memory, config.session_secret.clone()))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn memory(&self) -> &HybridMemory {
        &self.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resolve_session(&self, label: Option<&str>) -> Result<Session> {
        Session::resolve(label, &self.session_secret)
    }

    /// Stored turns of a session, oldest first.
    pub async fn session_history(
        &self,
        label: Option<&str>,
        limit: Option<usize>,
    ) -> Result<(Session, Vec<ConversationTurn>)> {
        let session = self.resolve_session(label)?;
        let turns = self.memory.history(session.session_id, limit).await?;
        Ok((session, turns))
    }

    /// Delete a session's turns. Clearing an empty session removes nothing.
    pub async fn clear_session(&self, label: Option<&str>) -> Result<(Session, u64)> {
        let session = self.resolve_session(label)?;
        let removed = self.memory.clear(session.session_id).await?;
        info!(session = %session.label, removed, "Memory cleared");
        Ok((session, removed))
    }

    /// Answer one prompt and remember the exchange.
    pub async fn chat(&self, session_label: Option<&str>, prompt: &str) -> Result<ChatReply> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AdvisorError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let session = self.resolve_session(session_label)?;
        let started = Instant::now();

        info!(
            session = %session.label,
            session_id = %session.session_id,
            prompt_chars = prompt.len(),
            "Chat turn started"
        );

        let (recalled, memory_available) = match self.recall(&session, prompt).await {
            Some(recalled) => (recalled, true),
            None => (RecalledMemory::default(), false),
        };

        let answer = match self.memory_shortcut(&recalled, prompt) {
            Some(answer) => answer,
            None => self.answer_with_model(&recalled, prompt).await?,
        };

        let remembered = memory_available
            && match self
                .memory
                .append_exchange(session.session_id, prompt, &answer.text)
                .await
            {
                Ok(_) => true,
                Err(e) => {
                    warn!(session = %session.label, "Failed to store exchange: {}", e);
                    false
                }
            };

        info!(
            session = %session.label,
            source = %answer.source,
            tools = answer.tools_used.len(),
            remembered,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat turn complete"
        );

        Ok(ChatReply {
            session_id: session.label,
            answer: answer.text,
            source: answer.source,
            confidence: answer.confidence,
            tools_used: answer.tools_used,
            recent_turns: recalled.recent.len(),
            recalled_turns: recalled.relevant.len(),
            remembered,
        })
    }

    /// Open the session and recall memory for `prompt`. `None` when the
    /// store is unavailable; the turn is then answered without memory.
    async fn recall(&self, session: &Session, prompt: &str) -> Option<RecalledMemory> {
        let recalled = match self.memory.open_session(session).await {
            Ok(()) => self.memory.retrieve(session.session_id, prompt).await,
            Err(e) => Err(e),
        };

        match recalled {
            Ok(recalled) => Some(recalled),
            Err(e) => {
                warn!(
                    session = %session.label,
                    "Memory unavailable, answering without history: {}", e
                );
                None
            }
        }
    }

    fn memory_shortcut(&self, recalled: &RecalledMemory, prompt: &str) -> Option<Answer> {
        if !IntentClassifier::is_last_question_prompt(prompt) {
            return None;
        }

        let question = last_user_question(&recalled.recent, prompt)?;
        debug!("Answering last-question prompt from memory");

        Some(Answer {
            text: format!("Your last question was: \"{}\"", question),
            confidence: 1.0,
            source: MEMORY_SOURCE.to_string(),
            tools_used: Vec::new(),
        })
    }

    async fn answer_with_model(&self, recalled: &RecalledMemory, prompt: &str) -> Result<Answer> {
        let summary = if recalled.archive.is_empty() {
            None
        } else {
            match ContextSummarizer::summarize(self.model.as_ref(), &recalled.archive).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Skipping history summary: {}", e);
                    None
                }
            }
        };

        let system = self.system_prompt(recalled, summary.as_deref());
        let mut messages = history_messages(&recalled.recent);
        messages.push(ModelMessage::User(prompt.to_string()));

        let mut tools_used = Vec::new();

        let (text, confidence) = match self.run_tool_loop(&system, messages, &mut tools_used).await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Agent loop failed, falling back to a direct model call: {}", e);
                self.direct_answer(prompt).await?
            }
        };

        Ok(Answer {
            text,
            confidence,
            source: self.model.name().to_string(),
            tools_used,
        })
    }

    async fn run_tool_loop(
        &self,
        system: &str,
        mut messages: Vec<ModelMessage>,
        tools_used: &mut Vec<ToolInvocation>,
    ) -> Result<(String, f32)> {
        let specs = self.tools.specs();

        for round in 1..=MAX_TOOL_ROUNDS {
            let final_round = round == MAX_TOOL_ROUNDS;
            let request = ModelRequest {
                system: system.to_string(),
                messages: messages.clone(),
                tools: if final_round { Vec::new() } else { specs.clone() },
            };

            match self.model.generate(&request).await? {
                ModelResponse::Text { text, confidence } => {
                    if text.trim().is_empty() {
                        return Err(AdvisorError::LlmError(
                            "model returned an empty answer".to_string(),
                        ));
                    }
                    debug!(round, "Model answered");
                    return Ok((text, confidence));
                }
                ModelResponse::ToolCalls(calls) => {
                    if final_round {
                        break;
                    }

                    debug!(round, calls = calls.len(), "Model requested tools");
                    let mut results = Vec::with_capacity(calls.len());

                    for call in &calls {
                        let response = match self.tools.execute(&call.name, call.args.clone()).await
                        {
                            Ok(output) if output.success => {
                                tools_used.push(ToolInvocation {
                                    name: call.name.clone(),
                                    success: true,
                                });
                                output.data
                            }
                            Ok(output) => {
                                tools_used.push(ToolInvocation {
                                    name: call.name.clone(),
                                    success: false,
                                });
                                let error = output
                                    .error
                                    .unwrap_or_else(|| "tool reported failure".to_string());
                                json!({ "error": error })
                            }
                            Err(e) => {
                                tools_used.push(ToolInvocation {
                                    name: call.name.clone(),
                                    success: false,
                                });
                                json!({ "error": e.to_string() })
                            }
                        };

                        results.push(ToolResult {
                            name: call.name.clone(),
                            response,
                        });
                    }

                    messages.push(ModelMessage::ToolCalls(calls));
                    messages.push(ModelMessage::ToolResults(results));
                }
            }
        }

        Err(AdvisorError::LlmError(format!(
            "no answer after {} tool rounds",
            MAX_TOOL_ROUNDS
        )))
    }

    /// Plain model call with no history and no tools.
    async fn direct_answer(&self, prompt: &str) -> Result<(String, f32)> {
        let request = ModelRequest {
            system: PERSONA.to_string(),
            messages: vec![ModelMessage::User(prompt.to_string())],
            tools: Vec::new(),
        };

        match self.model.generate(&request).await {
            Ok(ModelResponse::Text { text, confidence }) if !text.trim().is_empty() => {
                Ok((text, confidence))
            }
            Ok(_) => Err(AdvisorError::LlmError(
                "model returned no text on the fallback call".to_string(),
            )),
            Err(AdvisorError::LlmError(reason)) => Err(AdvisorError::LlmError(reason)),
            Err(other) => Err(AdvisorError::LlmError(other.to_string())),
        }
    }

    fn system_prompt(&self, recalled: &RecalledMemory, summary: Option<&str>) -> String {
        let config = self.memory.context().config();
        let mut sections = vec![PERSONA.to_string()];

        if let Some(summary) = summary {
            sections.push(format!("Summary of older conversation:\n{}", summary.trim()));
        }

        if !recalled.recent.is_empty() {
            sections.push(format!(
                "Previous conversation:\n{}\n\nUse this history to answer follow-up questions \
                 and questions about earlier messages.",
                conversation_digest(
                    &recalled.recent,
                    config.digest_exchanges,
                    config.digest_max_chars
                )
            ));
        }

        let seen: HashSet<String> = recalled.recent.iter().map(|t| t.fingerprint()).collect();
        let related: Vec<String> = recalled
            .relevant
            .iter()
            .filter(|s| !seen.contains(&s.turn.fingerprint()))
            .map(|s| format!("- [{}] {} (similarity {:.2})", s.turn.role, s.turn.text, s.score))
            .collect();

        if !related.is_empty() {
            sections.push(format!("Related earlier discussion:\n{}", related.join("\n")));
        }

        sections.join("\n\n")
    }
}

/// Recent turns as chat messages. The conversation must open with a user
/// turn, so a leading assistant turn cut off by the window is dropped.
fn history_messages(recent: &[ConversationTurn]) -> Vec<ModelMessage> {
    let start = recent
        .iter()
        .position(|t| t.role == Role::User)
        .unwrap_or(recent.len());

    recent[start..]
        .iter()
        .map(|turn| match turn.role {
            Role::User => ModelMessage::User(turn.text.clone()),
            Role::Assistant => ModelMessage::Assistant(turn.text.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::{InMemoryMemoryStore, MemoryStore};
    use crate::memory::ContextConfig;
    use crate::models::ToolInput;
    use crate::models::ToolOutput;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _request: &ModelRequest) -> Result<ModelResponse> {
            Err(AdvisorError::LlmError("provider unavailable".to_string()))
        }
    }

    /// Fails whenever tools are offered, answers otherwise.
    struct ToolShyModel;

    #[async_trait]
    impl LanguageModel for ToolShyModel {
        fn name(&self) -> &str {
            "tool-shy"
        }

        async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
            if request.tools.is_empty() {
                Ok(ModelResponse::Text {
                    text: "direct answer".to_string(),
                    confidence: 0.6,
                })
            } else {
                Err(AdvisorError::LlmError("function calling failed".to_string()))
            }
        }
    }

    struct StaticNewsTool;

    #[async_trait]
    impl Tool for StaticNewsTool {
        fn name(&self) -> &'static str {
            "get_company_news"
        }

        fn description(&self) -> &'static str {
            "Static headlines"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }

        async fn execute(&self, _input: &ToolInput) -> Result<ToolOutput> {
            Ok(ToolOutput {
                success: true,
                data: json!({"articles": [{"title": "Shopify expands into B2B"}]}),
                error: None,
            })
        }
    }

    /// Store that keeps sessions but refuses writes
    struct ReadOnlyStore(InMemoryMemoryStore);

    #[async_trait]
    impl MemoryStore for ReadOnlyStore {
        async fn ensure_session(&self, session: &Session) -> Result<()> {
            self.0.ensure_session(session).await
        }

        async fn append(&self, _turns: &[ConversationTurn]) -> Result<()> {
            Err(AdvisorError::DatabaseError("read only".to_string()))
        }

        async fn history(
            &self,
            session_id: Uuid,
            limit: Option<usize>,
        ) -> Result<Vec<ConversationTurn>> {
            self.0.history(session_id, limit).await
        }

        async fn turn_count(&self, session_id: Uuid) -> Result<usize> {
            self.0.turn_count(session_id).await
        }

        async fn clear(&self, session_id: Uuid) -> Result<u64> {
            self.0.clear(session_id).await
        }

        fn backend_name(&self) -> &'static str {
            "read-only"
        }
    }

    /// Store whose every operation fails
    struct DownStore;

    #[async_trait]
    impl MemoryStore for DownStore {
        async fn ensure_session(&self, _session: &Session) -> Result<()> {
            Err(AdvisorError::DatabaseError("down".to_string()))
        }

        async fn append(&self, _turns: &[ConversationTurn]) -> Result<()> {
            Err(AdvisorError::DatabaseError("down".to_string()))
        }

        async fn history(
            &self,
            _session_id: Uuid,
            _limit: Option<usize>,
        ) -> Result<Vec<ConversationTurn>> {
            Err(AdvisorError::DatabaseError("down".to_string()))
        }

        async fn turn_count(&self, _session_id: Uuid) -> Result<usize> {
            Err(AdvisorError::DatabaseError("down".to_string()))
        }

        async fn clear(&self, _session_id: Uuid) -> Result<u64> {
            Err(AdvisorError::DatabaseError("down".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "down"
        }
    }

    fn memory_with(store: Arc<dyn MemoryStore>) -> HybridMemory {
        HybridMemory::new(
            store,
            Arc::new(LocalEmbedder::new()),
            ContextConfig::default(),
        )
    }

    fn advisor(model: Arc<dyn LanguageModel>, tools: ToolRegistry) -> Advisor {
        Advisor::new(
            model,
            tools,
            memory_with(Arc::new(InMemoryMemoryStore::new())),
            "test-secret",
        )
    }

    fn unconfigured_tools() -> ToolRegistry {
        create_default_registry(None, "http://127.0.0.1:1").unwrap()
    }

    #[tokio::test]
    async fn test_chat_appends_one_pair() {
        let advisor = advisor(Arc::new(MockModel), unconfigured_tools());

        let reply = advisor
            .chat(Some("acme"), "Give me a quick take on Notion")
            .await
            .unwrap();

        assert!(!reply.answer.is_empty());
        assert_eq!(reply.session_id, "acme");
        assert_eq!(reply.source, "mock");
        assert!(reply.remembered);

        let (_, turns) = advisor.session_history(Some("acme"), None).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "Give me a quick take on Notion");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, reply.answer);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_and_nothing_stored() {
        let advisor = advisor(Arc::new(MockModel), unconfigured_tools());

        let result = advisor.chat(Some("acme"), "   \n").await;
        assert!(matches!(result, Err(AdvisorError::InvalidRequest(_))));

        let (_, turns) = advisor.session_history(Some("acme"), None).await.unwrap();
        assert!(turns.is_empty());
    }

    #[tokio::test]
    async fn test_tool_results_reach_the_answer() {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StaticNewsTool));
        let advisor = advisor(Arc::new(MockModel), tools);

        let reply = advisor.chat(None, "Latest news about Shopify").await.unwrap();

        assert!(reply.answer.contains("Shopify expands into B2B"));
        assert_eq!(
            reply.tools_used,
            vec![ToolInvocation {
                name: "get_company_news".to_string(),
                success: true
            }]
        );
    }

    #[tokio::test]
    async fn test_failing_tool_does_not_fail_chat() {
        let advisor = advisor(Arc::new(MockModel), unconfigured_tools());

        let reply = advisor
            .chat(Some("news"), "Latest news about Shopify")
            .await
            .unwrap();

        assert!(reply.answer.contains("get_company_news was unavailable"));
        assert_eq!(reply.tools_used.len(), 1);
        assert!(!reply.tools_used[0].success);

        let (_, turns) = advisor.session_history(Some("news"), None).await.unwrap();
        assert_eq!(turns.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_model_stores_nothing() {
        let advisor = advisor(Arc::new(FailingModel), unconfigured_tools());

        let result = advisor.chat(Some("down"), "Who competes with Figma?").await;
        let err = result.unwrap_err();
        assert!(matches!(err, AdvisorError::LlmError(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);

        let (_, turns) = advisor.session_history(Some("down"), None).await.unwrap();
        assert!(turns.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_direct_call() {
        let advisor = advisor(Arc::new(ToolShyModel), unconfigured_tools());

        let reply = advisor.chat(None, "Who competes with Figma?").await.unwrap();
        assert_eq!(reply.answer, "direct answer");
        assert!(reply.tools_used.is_empty());
    }

    #[tokio::test]
    async fn test_last_question_shortcut() {
        let advisor = advisor(Arc::new(MockModel), unconfigured_tools());

        advisor
            .chat(Some("s1"), "Tell me about Airtable")
            .await
            .unwrap();
        let reply = advisor
            .chat(Some("s1"), "What was my last question?")
            .await
            .unwrap();

        assert_eq!(reply.answer, "Your last question was: \"Tell me about Airtable\"");
        assert_eq!(reply.source, MEMORY_SOURCE);

        let (_, turns) = advisor.session_history(Some("s1"), None).await.unwrap();
        assert_eq!(turns.len(), 4);
    }

    #[tokio::test]
    async fn test_last_question_without_history_uses_model() {
        let advisor = advisor(Arc::new(MockModel), unconfigured_tools());

        let reply = advisor
            .chat(Some("fresh"), "what was my last question")
            .await
            .unwrap();
        assert_eq!(reply.source, "mock");
    }

    #[tokio::test]
    async fn test_store_failure_still_answers() {
        let advisor = Advisor::new(
            Arc::new(MockModel),
            unconfigured_tools(),
            memory_with(Arc::new(ReadOnlyStore(InMemoryMemoryStore::new()))),
            "test-secret",
        );

        let reply = advisor.chat(None, "Hello there").await.unwrap();
        assert!(!reply.answer.is_empty());
        assert!(!reply.remembered);
    }

    #[tokio::test]
    async fn test_store_outage_answers_without_memory() {
        let advisor = Advisor::new(
            Arc::new(MockModel),
            unconfigured_tools(),
            memory_with(Arc::new(DownStore)),
            "test-secret",
        );

        let reply = advisor.chat(Some("a"), "Tell me about Canva").await.unwrap();
        assert!(reply.answer.contains("Tell me about Canva"));
        assert!(!reply.remembered);
        assert_eq!(reply.recent_turns, 0);

        let shortcut = advisor.chat(Some("a"), "What was my last question?").await.unwrap();
        assert_eq!(shortcut.source, "mock");
    }

    #[tokio::test]
    async fn test_provider_error_does_not_expose_key() {
        let model = GeminiModel::new("SECRET-KEY-123".to_string(), "gemini-x".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let advisor = advisor(Arc::new(model), unconfigured_tools());

        let err = advisor.chat(Some("a"), "Who competes with Figma?").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn test_clear_session_is_scoped_and_idempotent() {
        let advisor = advisor(Arc::new(MockModel), unconfigured_tools());

        advisor.chat(Some("a"), "Tell me about Canva").await.unwrap();
        advisor.chat(Some("b"), "Tell me about Miro").await.unwrap();

        let (_, removed) = advisor.clear_session(Some("a")).await.unwrap();
        assert_eq!(removed, 2);
        let (_, removed_again) = advisor.clear_session(Some("a")).await.unwrap();
        assert_eq!(removed_again, 0);

        let (_, b_turns) = advisor.session_history(Some("b"), None).await.unwrap();
        assert_eq!(b_turns.len(), 2);
    }

    #[test]
    fn test_history_messages_start_with_user() {
        let id = Uuid::new_v4();
        let recent = vec![
            ConversationTurn::new(id, Role::Assistant, "cut-off answer"),
            ConversationTurn::new(id, Role::User, "question"),
            ConversationTurn::new(id, Role::Assistant, "answer"),
        ];

        let messages = history_messages(&recent);
        assert_eq!(
            messages,
            vec![
                ModelMessage::User("question".to_string()),
                ModelMessage::Assistant("answer".to_string()),
            ]
        );
        assert!(history_messages(&[]).is_empty());
    }

    #[test]
    fn test_system_prompt_lists_related_turns_once() {
        let advisor = advisor(Arc::new(MockModel), unconfigured_tools());
        let id = Uuid::new_v4();
        let older = ConversationTurn::new(id, Role::User, "Stripe pricing in Europe");
        let duplicate = ConversationTurn::new(id, Role::User, "What about Adyen?");

        let recalled = RecalledMemory {
            recent: vec![
                duplicate.clone(),
                ConversationTurn::new(id, Role::Assistant, "Adyen targets enterprise."),
            ],
            relevant: vec![
                crate::models::ScoredTurn {
                    turn: older,
                    score: 0.71,
                },
                crate::models::ScoredTurn {
                    turn: duplicate,
                    score: 0.5,
                },
            ],
            archive: Vec::new(),
            total_turns: 6,
        };

        let prompt = advisor.system_prompt(&recalled, None);
        assert!(prompt.contains("User asked: What about Adyen?"));
        assert!(prompt.contains(
            "Related earlier discussion:\n- [user] Stripe pricing in Europe (similarity 0.71)"
        ));
        assert_eq!(prompt.matches("What about Adyen?").count(), 1);
    }
}
