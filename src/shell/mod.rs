// src/shell/mod.rs

use crate::agent::{Agent, AgentError, ConversationalAgent};
use crate::context::ContextFactory;
use crate::memory::{ConversationMemory, Memory, MemoryError, Turn};
use crate::session::SessionContext;
use thiserror::Error;

/// What the user did to trigger this render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Idle,
    Clear,
    Submit(String),
}

/// What the page should show after an interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    /// In load order; the renderer reverses it.
    pub history: Vec<Turn>,
    pub error: Option<String>,
}

/// Failures the shell does not handle itself; they reach the host.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("failed to persist conversation: {0}")]
    Persist(#[from] MemoryError),
}

/// Runs one interaction against `session` and returns the view to render.
pub fn interact(
    session: &mut SessionContext,
    action: Action,
    factory: &ContextFactory,
) -> Result<View, ShellError> {
    match action {
        Action::Idle => Ok(reload(session)),
        Action::Clear => {
            session.clear_memory();
            session.history.clear();
            tracing::info!("🧹 conversation cleared");
            Ok(View::default())
        }
        Action::Submit(text) => {
            let memory = checkout_memory(session);
            let mut agent = ConversationalAgent::new(factory(memory));

            agent.run(&text)?;

            session.store_memory(agent.context.memory())?;
            Ok(reload(session))
        }
    }
}

fn checkout_memory(session: &SessionContext) -> ConversationMemory {
    match session.load_memory() {
        Ok(Some(memory)) => memory,
        Ok(None) => ConversationMemory::new(),
        Err(err) => {
            tracing::warn!(error = %err, "starting a fresh conversation over unreadable memory");
            ConversationMemory::new()
        }
    }
}

/// Re-reads history from the memory slot. On failure the error is reported
/// in the view and the previously rendered history stays.
fn reload(session: &mut SessionContext) -> View {
    match session.load_memory() {
        Ok(memory) => {
            session.history = memory.map(|m| m.load()).unwrap_or_default();
            View {
                history: session.history.clone(),
                error: None,
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to load chat history");
            View {
                history: session.history.clone(),
                error: Some(err.to_string()),
            }
        }
    }
}
