// src/config/mod.rs

use std::time::Duration;

/// Instruction handed to the agent ahead of every conversation.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are an Informatica expert.

Answer the following questions as best you can, but speaking Japanese.";

pub const DEFAULT_CAPTION: &str = "testのチャットです";

const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

/// Model endpoint settings plus a few app-level knobs.
///
/// The five `OPENAI_*` values pass through untouched: nothing here checks
/// that they are present. A missing value is reported by the chat client the
/// first time a completion is attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub api_base: Option<String>,
    pub api_version: Option<String>,
    pub deployment: Option<String>,
    pub api_key: Option<String>,
    pub api_type: Option<String>,
    pub system_message: String,
    pub caption: String,
    pub verbose: bool,
    /// How long an untouched browser session keeps its conversation.
    pub session_ttl: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_base: lookup("OPENAI_API_BASE"),
            api_version: lookup("OPENAI_API_VERSION"),
            deployment: lookup("OPENAI_API_MODEL_DEPROY"),
            api_key: lookup("OPENAI_API_KEY"),
            api_type: lookup("OPENAI_API_TYPE"),
            system_message: lookup("CHAT_SYSTEM_MESSAGE")
                .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
            caption: lookup("CHAT_CAPTION").unwrap_or_else(|| DEFAULT_CAPTION.to_string()),
            verbose: lookup("CHAT_VERBOSE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            session_ttl: Duration::from_secs(
                lookup("CHAT_SESSION_TTL_SECS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = self.verbose || verbose;
        self
    }
}
