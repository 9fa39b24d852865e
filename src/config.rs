//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::str::FromStr;
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Session storage configuration
    pub sessions: SessionConfig,
    /// Agent backend configuration
    pub agent: AgentConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Allowed CORS origins (`None` means any origin)
    pub allowed_origins: Option<Vec<String>>,
    /// JSON key used for the identifier returned by `POST /api/sessions`
    pub session_id_key: SessionIdKey,
    /// Whether `/adk/*` requests are forwarded to the ADK server
    pub adk_proxy: bool,
}

/// Session storage configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which store backs the session registry
    pub backend: StoreBackend,
    /// SQLite URL used when `backend` is `Sqlite`
    pub db_url: String,
}

/// Agent backend configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Which agent answers chat messages
    pub backend: AgentBackend,
    /// Display name reported by the status endpoint
    pub name: String,
    /// Base URL of the ADK api_server
    pub adk_url: String,
    /// ADK application (agent directory) name
    pub adk_app_name: String,
    /// ADK user id sessions are created under
    pub adk_user_id: String,
    /// Timeout for a single agent invocation (in seconds)
    pub timeout_secs: u64,
}

/// Key naming for the created-session response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionIdKey {
    /// `{"sessionId": ...}`
    Camel,
    /// `{"session_id": ...}`
    Snake,
}

impl SessionIdKey {
    /// The JSON key this variant renders as
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionIdKey::Camel => "sessionId",
            SessionIdKey::Snake => "session_id",
        }
    }
}

impl FromStr for SessionIdKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sessionId" | "camel" => Ok(SessionIdKey::Camel),
            "session_id" | "snake" => Ok(SessionIdKey::Snake),
            other => Err(format!("unknown session id key: {}", other)),
        }
    }
}

/// Session store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Volatile in-process map
    Memory,
    /// SQLite database via sqlx
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("unknown session store: {}", other)),
        }
    }
}

/// Agent backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentBackend {
    /// Remote ADK api_server
    Adk,
    /// Offline echo agent
    Echo,
}

impl FromStr for AgentBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adk" => Ok(AgentBackend::Adk),
            "echo" => Ok(AgentBackend::Echo),
            other => Err(format!("unknown agent backend: {}", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 80,
                host: "0.0.0.0".to_string(),
                allowed_origins: None,
                session_id_key: SessionIdKey::Camel,
                adk_proxy: true,
            },
            sessions: SessionConfig {
                backend: StoreBackend::Memory,
                db_url: "sqlite://./sessions.db".to_string(),
            },
            agent: AgentConfig {
                backend: AgentBackend::Adk,
                name: "VentureBot".to_string(),
                adk_url: "http://localhost:8000".to_string(),
                adk_app_name: "managerA".to_string(),
                adk_user_id: "user".to_string(),
                timeout_secs: 120,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                port: parsed_var("PORT", defaults.server.port),
                host: env::var("HOST").unwrap_or(defaults.server.host),
                allowed_origins: env::var("ALLOWED_ORIGINS")
                    .ok()
                    .and_then(|v| parse_origins(&v)),
                session_id_key: parsed_var("SESSION_ID_KEY", defaults.server.session_id_key),
                adk_proxy: flag_var("ADK_PROXY", defaults.server.adk_proxy),
            },
            sessions: SessionConfig {
                backend: parsed_var("SESSION_STORE", defaults.sessions.backend),
                db_url: env::var("SESSION_DB_URL").unwrap_or(defaults.sessions.db_url),
            },
            agent: AgentConfig {
                backend: parsed_var("AGENT_BACKEND", defaults.agent.backend),
                name: env::var("AGENT_NAME").unwrap_or(defaults.agent.name),
                adk_url: env::var("ADK_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.agent.adk_url),
                adk_app_name: env::var("ADK_APP_NAME").unwrap_or(defaults.agent.adk_app_name),
                adk_user_id: env::var("ADK_USER_ID").unwrap_or(defaults.agent.adk_user_id),
                timeout_secs: parsed_var("AGENT_TIMEOUT_SECS", defaults.agent.timeout_secs)
                    .max(1),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Read and parse an environment variable, falling back to `default` when it
/// is unset or does not parse.
fn parsed_var<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(variable = name, value = %raw, error = %e, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Read a boolean flag. Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`
/// in any case; anything else falls back to `default`.
fn flag_var(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw).unwrap_or_else(|| {
            warn!(variable = name, value = %raw, "Invalid flag, using default");
            default
        }),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated origin list. `*` (or an empty list) means any origin.
fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(|o| o.to_string())
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "HOST",
        "ALLOWED_ORIGINS",
        "SESSION_ID_KEY",
        "ADK_PROXY",
        "SESSION_STORE",
        "SESSION_DB_URL",
        "AGENT_BACKEND",
        "AGENT_NAME",
        "ADK_URL",
        "ADK_APP_NAME",
        "ADK_USER_ID",
        "AGENT_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.server.port, 80);
        assert_eq!(config.server_addr(), "0.0.0.0:80");
        assert!(config.server.allowed_origins.is_none());
        assert_eq!(config.server.session_id_key, SessionIdKey::Camel);
        assert_eq!(config.sessions.backend, StoreBackend::Memory);
        assert_eq!(config.agent.backend, AgentBackend::Adk);
        assert_eq!(config.agent.name, "VentureBot");
        assert_eq!(config.agent.timeout_secs, 120);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("PORT", "8080");
        env::set_var("SESSION_ID_KEY", "session_id");
        env::set_var("SESSION_STORE", "sqlite");
        env::set_var("AGENT_BACKEND", "echo");
        env::set_var("ADK_URL", "http://adk:8000/");
        env::set_var("ALLOWED_ORIGINS", "http://localhost:3000, http://example.com");

        let config = Config::from_env();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.session_id_key, SessionIdKey::Snake);
        assert_eq!(config.sessions.backend, StoreBackend::Sqlite);
        assert_eq!(config.agent.backend, AgentBackend::Echo);
        assert_eq!(config.agent.adk_url, "http://adk:8000");
        assert_eq!(
            config.server.allowed_origins,
            Some(vec![
                "http://localhost:3000".to_string(),
                "http://example.com".to_string()
            ])
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        env::set_var("PORT", "not-a-port");
        env::set_var("AGENT_BACKEND", "gpt");
        env::set_var("AGENT_TIMEOUT_SECS", "0");

        let config = Config::from_env();
        assert_eq!(config.server.port, 80);
        assert_eq!(config.agent.backend, AgentBackend::Adk);
        assert_eq!(config.agent.timeout_secs, 1);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_adk_proxy_flag_spellings() {
        clear_env();
        for raw in ["true", "1", "YES", " on "] {
            env::set_var("ADK_PROXY", raw);
            assert!(Config::from_env().server.adk_proxy, "{:?}", raw);
        }
        for raw in ["false", "0", "No", "OFF"] {
            env::set_var("ADK_PROXY", raw);
            assert!(!Config::from_env().server.adk_proxy, "{:?}", raw);
        }
        env::set_var("ADK_PROXY", "maybe");
        assert!(Config::from_env().server.adk_proxy);
        assert_eq!(parse_flag("maybe"), None);
        clear_env();
    }

    #[test]
    fn test_parse_origins_wildcard() {
        assert_eq!(parse_origins("*"), None);
        assert_eq!(parse_origins(" , "), None);
        assert_eq!(parse_origins("http://a.com,*"), None);
    }
}
