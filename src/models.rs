//! Core data models for the advisor

use crate::error::AdvisorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Session label used when a client does not send one
pub const DEFAULT_SESSION_LABEL: &str = "default";

const MAX_SESSION_LABEL_LEN: usize = 128;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a stored role; anything unrecognised is treated as user text.
    pub fn from_db(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "assistant" | "ai" | "agent" | "model" => Role::Assistant,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ================= Session =================
//

/// Memory isolation unit.
///
/// Clients address sessions by label; the store key is derived from the
/// deployment secret so labels never collide across deployments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub session_id: Uuid,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Validate a client label and derive its store key.
    pub fn resolve(label: Option<&str>, secret: &str) -> crate::Result<Self> {
        let label = match label.map(str::trim) {
            Some(l) if !l.is_empty() => l,
            _ => DEFAULT_SESSION_LABEL,
        };

        validate_label(label)?;

        Ok(Self {
            session_id: session_key(label, secret),
            label: label.to_string(),
            created_at: Utc::now(),
        })
    }
}

fn validate_label(label: &str) -> crate::Result<()> {
    if label.len() > MAX_SESSION_LABEL_LEN {
        return Err(AdvisorError::InvalidSession(format!(
            "session_id longer than {} characters",
            MAX_SESSION_LABEL_LEN
        )));
    }

    let valid = label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));

    if !valid {
        return Err(AdvisorError::InvalidSession(format!(
            "session_id '{}' may only contain letters, digits, '_', '-', '.' or ':'",
            label
        )));
    }

    Ok(())
}

/// Stable UUID for (secret, label).
pub fn session_key(label: &str, secret: &str) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update([0u8]);
    hasher.update(label.as_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

//
// ================= Conversation =================
//

/// A single stored message. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub turn_id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl ConversationTurn {
    pub fn new(session_id: Uuid, role: Role, text: impl Into<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            session_id,
            role,
            text: text.into(),
            timestamp: Utc::now(),
            embedding: None,
        }
    }

    /// Approximate token count (4 chars per token)
    pub fn token_count(&self) -> usize {
        (self.text.len() + 3) / 4
    }

    /// Hex SHA-256 of role and whitespace-normalized text.
    pub fn fingerprint(&self) -> String {
        let normalized = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut hasher = Sha256::new();
        hasher.update(self.role.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A recalled turn with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTurn {
    pub turn: ConversationTurn,
    pub score: f32,
}

//
// ================= Tools =================
//

/// Input handed to a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub parameters: Value,
}

impl ToolInput {
    pub fn new(parameters: Value) -> Self {
        Self { parameters }
    }

    /// First non-empty string among `keys`.
    pub fn str_param(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.parameters.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Ephemeral tool result; never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

/// Record of one tool call made while answering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: String,
    pub success: bool,
}

//
// ================= Chat =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub answer: String,
    pub source: String,
    pub confidence: f32,
    pub tools_used: Vec<ToolInvocation>,
    pub recent_turns: usize,
    pub recalled_turns: usize,
    /// False when the exchange could not be written to memory
    pub remembered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults_label() {
        let session = Session::resolve(None, "secret").unwrap();
        assert_eq!(session.label, DEFAULT_SESSION_LABEL);

        let blank = Session::resolve(Some("   "), "secret").unwrap();
        assert_eq!(blank.session_id, session.session_id);
    }

    #[test]
    fn test_session_key_depends_on_secret() {
        let a = Session::resolve(Some("acme-research"), "one").unwrap();
        let b = Session::resolve(Some("acme-research"), "two").unwrap();
        let c = Session::resolve(Some("acme-research"), "one").unwrap();

        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.session_id, c.session_id);
        assert_eq!(a.session_id.get_version_num(), 4);
    }

    #[test]
    fn test_session_rejects_bad_labels() {
        assert!(Session::resolve(Some("drop table;"), "s").is_err());
        assert!(Session::resolve(Some(&"a".repeat(129)), "s").is_err());
        assert!(Session::resolve(Some("user:42.main_thread-1"), "s").is_ok());
    }

    #[test]
    fn test_fingerprint_ignores_spacing_not_role() {
        let id = Uuid::new_v4();
        let a = ConversationTurn::new(id, Role::User, "Who competes  with Stripe?");
        let b = ConversationTurn::new(id, Role::User, "Who competes with Stripe?");
        let c = ConversationTurn::new(id, Role::Assistant, "Who competes with Stripe?");

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_role_from_db() {
        assert_eq!(Role::from_db("assistant"), Role::Assistant);
        assert_eq!(Role::from_db("AI"), Role::Assistant);
        assert_eq!(Role::from_db("user"), Role::User);
        assert_eq!(Role::from_db("???"), Role::User);
    }

    #[test]
    fn test_tool_input_str_param() {
        let input = ToolInput::new(serde_json::json!({"query": "  ", "company": "Notion"}));
        assert_eq!(input.str_param(&["query", "company"]), Some("Notion"));
        assert_eq!(input.str_param(&["missing"]), None);
    }
}
