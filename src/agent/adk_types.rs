//! ADK api_server wire types
//!
//! Structs that mirror the JSON accepted and returned by the ADK `/run`
//! endpoint. Only the fields this service reads are modeled.

use serde::{Deserialize, Serialize};

/// Body of `POST /run`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Agent application name
    pub app_name: String,
    /// User the session belongs to
    pub user_id: String,
    /// ADK session id
    pub session_id: String,
    /// The user message for this turn
    pub new_message: RequestContent,
}

/// Message content sent to the agent
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// Always `"user"` for messages sent by this service
    pub role: String,
    /// Content parts (a single text part)
    pub parts: Vec<RequestPart>,
}

/// A single text part
#[derive(Serialize, Debug)]
pub struct RequestPart {
    /// The text content
    pub text: String,
}

/// One event in the `/run` response array
#[derive(Deserialize, Debug)]
pub struct Event {
    /// Who produced the event (`"user"` or an agent name)
    #[serde(default)]
    pub author: Option<String>,
    /// Content carried by the event, absent for pure state updates
    #[serde(default)]
    pub content: Option<EventContent>,
}

/// Content of an event
#[derive(Deserialize, Debug)]
pub struct EventContent {
    /// Parts of the content; tool calls carry no text
    #[serde(default)]
    pub parts: Vec<EventPart>,
}

/// A single part of event content
#[derive(Deserialize, Debug)]
pub struct EventPart {
    /// Text of the part, if it is a text part
    #[serde(default)]
    pub text: Option<String>,
}

impl Event {
    /// Concatenated text of this event, if it carries any
    pub fn text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Whether this event was authored by the agent side
    pub fn is_from_agent(&self) -> bool {
        self.author.as_deref() != Some("user")
    }
}

/// The reply text of a `/run` exchange: the last agent event with text
pub fn final_reply(events: &[Event]) -> Option<String> {
    events
        .iter()
        .rev()
        .filter(|e| e.is_from_agent())
        .find_map(Event::text)
}
