//! API module
//!
//! Contains HTTP request handlers for sessions, chat, status and the ADK pass-through

pub mod chat;
pub mod proxy;
pub mod sessions;
pub mod status;
