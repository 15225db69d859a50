//! Process configuration
//!
//! Read once at startup and passed explicitly to everything that needs it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the Gemini API key
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Variable name the first version of the bot read the key from
pub const LEGACY_API_KEY_VAR: &str = "GEMNI";

const DEFAULT_FAST_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_CODE_MODEL: &str = "gemini-1.5-ultra";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_THINKING_DELAY: Duration = Duration::from_millis(1500);
const DEFAULT_PYTHON: &str = "python3";
const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Gemini API key not found. Set {API_KEY_VAR} (or {LEGACY_API_KEY_VAR}) in the environment or a .env file")]
    MissingApiKey,
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    /// Model variant for general conversation
    pub fast_model: String,
    /// Model variant for code generation
    pub code_model: String,
    pub base_url: String,
    pub bind: IpAddr,
    pub port: u16,
    /// Pause between the thinking indicator and the model call
    pub thinking_delay: Duration,
    /// Exposes `POST /api/tools/:name/run`. Off unless explicitly enabled.
    pub enable_exec_endpoint: bool,
    pub python: String,
    /// Sessions with no stream attached are dropped after this long
    pub session_idle_ttl: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("fast_model", &self.fast_model)
            .field("code_model", &self.code_model)
            .field("base_url", &self.base_url)
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("thinking_delay", &self.thinking_delay)
            .field("enable_exec_endpoint", &self.enable_exec_endpoint)
            .field("python", &self.python)
            .field("session_idle_ttl", &self.session_idle_ttl)
            .finish()
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(API_KEY_VAR)
            .or_else(|| non_empty(LEGACY_API_KEY_VAR))
            .ok_or(ConfigError::MissingApiKey)?;

        let bind = match non_empty("CHAT_BIND") {
            Some(raw) => raw.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidValue {
                    var: "CHAT_BIND",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let port = match non_empty("CHAT_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    var: "CHAT_PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_PORT,
        };

        let thinking_delay = match non_empty("CHAT_THINKING_DELAY_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                    var: "CHAT_THINKING_DELAY_MS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_THINKING_DELAY,
        };

        let session_idle_ttl = match non_empty("CHAT_SESSION_IDLE_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                    var: "CHAT_SESSION_IDLE_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_SESSION_IDLE_TTL,
        };

        let enable_exec_endpoint = match non_empty("CHAT_ENABLE_EXEC_ENDPOINT") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::InvalidValue {
                var: "CHAT_ENABLE_EXEC_ENDPOINT",
                value: raw.clone(),
                reason: "expected true/false".to_string(),
            })?,
            None => false,
        };

        Ok(Self {
            api_key,
            fast_model: non_empty("GEMINI_FAST_MODEL").unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
            code_model: non_empty("GEMINI_CODE_MODEL").unwrap_or_else(|| DEFAULT_CODE_MODEL.to_string()),
            base_url: non_empty("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bind,
            port,
            thinking_delay,
            enable_exec_endpoint,
            python: non_empty("CHAT_PYTHON").unwrap_or_else(|| DEFAULT_PYTHON.to_string()),
            session_idle_ttl,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
