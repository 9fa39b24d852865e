//! Session data models
//!
//! Defines chat turns and session identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat session
pub type SessionId = String;

/// Generate a new unique session ID (UUID v4)
pub fn generate_session_id() -> SessionId {
    Uuid::new_v4().to_string()
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Message from the user
    User,
    /// Reply from the agent
    Agent,
}

impl Sender {
    /// Convert the sender to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Agent => "agent",
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "agent" => Ok(Sender::Agent),
            other => Err(format!("unknown sender: {}", other)),
        }
    }
}

/// A single turn in a chat session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who sent the turn
    pub sender: Sender,
    /// Text content
    pub text: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// Create an agent turn
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Agent,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_wire_format() {
        let json = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"sender": "user", "text": "hi"}));

        let json = serde_json::to_value(Turn::agent("hello")).unwrap();
        assert_eq!(json["sender"], "agent");
    }

    #[test]
    fn test_sender_parse() {
        assert_eq!("user".parse::<Sender>().unwrap(), Sender::User);
        assert_eq!("agent".parse::<Sender>().unwrap(), Sender::Agent);
        assert!("assistant".parse::<Sender>().is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_session_id(), generate_session_id());
    }
}
