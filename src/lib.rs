//! Competitive Intelligence Advisor
//!
//! A chat backend that answers questions about companies and markets:
//! - An LLM agent that can call a news tool and a competitor lookup tool
//! - Hybrid memory per session: recent turns plus similarity recall
//! - PostgreSQL or in-process storage for conversation turns
//! - HTTP API: `/chat`, `/memory`, `/clear-memory`
//!
//! TURN:
//! PROMPT → RECALL → TOOL LOOP → ANSWER → REMEMBER

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod models;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::Advisor;
pub use config::AdvisorConfig;
pub use error::AdvisorError;
pub use intent::{IntentClassifier, QueryIntent};
pub use models::*;
