//! Shared application state handed to every handler

use crate::api::proxy::AdkProxy;
use crate::config::SessionIdKey;
use crate::relay::ChatRelay;
use std::sync::Arc;

/// Router state
#[derive(Clone)]
pub struct AppState {
    /// Chat relay (owns the session store and the agent)
    pub relay: Arc<ChatRelay>,
    /// JSON key used when returning a new session id
    pub session_id_key: SessionIdKey,
    /// ADK pass-through, when enabled
    pub adk_proxy: Option<Arc<AdkProxy>>,
}

impl AppState {
    /// State with no ADK pass-through
    pub fn new(relay: Arc<ChatRelay>, session_id_key: SessionIdKey) -> Self {
        Self {
            relay,
            session_id_key,
            adk_proxy: None,
        }
    }

    /// Enable the ADK pass-through
    pub fn with_adk_proxy(mut self, proxy: AdkProxy) -> Self {
        self.adk_proxy = Some(Arc::new(proxy));
        self
    }
}
