// src/context/mod.rs

use crate::config::Settings;
use crate::memory::ConversationMemory;
use crate::model::{AzureChatClient, ChatModel};
use crate::tools::{Tool, WebSearchTool};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Builds a fresh agent context around a session's memory.
pub type ContextFactory = Arc<dyn Fn(ConversationMemory) -> Context + Send + Sync>;

/// Runtime context for an agent: the model, its tools, memory and instruction.
pub struct Context {
    pub model: Box<dyn ChatModel + Send + Sync>,
    pub tools: BTreeMap<String, Box<dyn Tool + Send + Sync>>,
    pub memory: ConversationMemory,
    pub system_message: String,
    pub verbose: bool,
    pub max_iterations: usize,
}

impl Context {
    pub fn new<M: ChatModel + Send + Sync + 'static>(model: M, memory: ConversationMemory) -> Self {
        Self {
            model: Box::new(model),
            tools: BTreeMap::new(),
            memory,
            system_message: String::new(),
            verbose: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// The production wiring: hosted chat client plus the web-search tool.
    pub fn from_settings(settings: &Settings, memory: ConversationMemory) -> Self {
        Context::new(AzureChatClient::new(settings), memory)
            .register_tool(WebSearchTool::new())
            .with_system_message(&settings.system_message)
            .with_verbose(settings.verbose)
    }

    pub fn register_tool<T: Tool + Send + Sync + 'static>(mut self, tool: T) -> Self {
        self.tools.insert(tool.name().into(), Box::new(tool));
        self
    }

    pub fn with_system_message(mut self, message: &str) -> Self {
        self.system_message = message.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn get_tool(&self, name: &str) -> Option<&(dyn Tool + Send + Sync)> {
        self.tools.get(name).map(|boxed| boxed.as_ref())
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// `> name: description` lines, one per registered tool.
    pub fn describe_tools(&self) -> String {
        self.tools
            .values()
            .map(|tool| format!("> {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}

/// Factory that rebuilds the production context for every run.
pub fn settings_factory(settings: Settings) -> ContextFactory {
    Arc::new(move |memory: ConversationMemory| Context::from_settings(&settings, memory))
}
