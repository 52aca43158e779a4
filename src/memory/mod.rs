// src/memory/mod.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Variable name under which the conversation is exposed to the agent.
pub const MEMORY_KEY: &str = "chat_history";

/// One message in a conversation, tagged with who said it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum Turn {
    User(String),
    Assistant(String),
}

impl Turn {
    pub fn role(&self) -> &'static str {
        match self {
            Turn::User(_) => "user",
            Turn::Assistant(_) => "assistant",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Turn::User(text) | Turn::Assistant(text) => text,
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("stored conversation is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A trait for conversation memory the agent appends to after each exchange.
pub trait Memory {
    fn save_context(&mut self, input: &str, output: &str);
    fn load(&self) -> Vec<Turn>;
}

/// Append-only buffer of every turn exchanged in one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub memory_key: String,
    pub messages: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self {
            memory_key: MEMORY_KEY.to_string(),
            messages: Vec::new(),
        }
    }

    /// `{memory_key: [turns...]}`, the shape prompt templates consume.
    pub fn load_memory_variables(&self) -> Map<String, Value> {
        let turns = self
            .messages
            .iter()
            .map(|turn| serde_json::json!({ "role": turn.role(), "content": turn.content() }))
            .collect();

        let mut vars = Map::new();
        vars.insert(self.memory_key.clone(), Value::Array(turns));
        vars
    }

    pub fn to_value(&self) -> Result<Value, MemoryError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: Value) -> Result<Self, MemoryError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for ConversationMemory {
    fn save_context(&mut self, input: &str, output: &str) {
        self.messages.push(Turn::User(input.to_string()));
        self.messages.push(Turn::Assistant(output.to_string()));
    }

    fn load(&self) -> Vec<Turn> {
        self.messages.clone()
    }
}
