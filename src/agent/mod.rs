// src/agent/mod.rs

use crate::context::Context;
use crate::memory::Memory;
use crate::model::{ChatError, ChatMessage};
use crate::protocol::{AgentStep, FINAL_ANSWER, parse_step};
use colored::Colorize;
use thiserror::Error;

pub const INVALID_RESPONSE: &str = "Invalid or incomplete response";
pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("chat model failed: {0}")]
    Model(#[from] ChatError),
}

pub trait Agent {
    /// Answers `input`, appending the exchange to the bound memory.
    fn run(&mut self, input: &str) -> Result<String, AgentError>;
}

/// Conversational agent that asks the model for one JSON action per turn.
pub struct ConversationalAgent {
    pub context: Context,
}

impl ConversationalAgent {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    fn system_prompt(&self) -> String {
        let tool_names = self.context.tool_names().join(", ");
        format!(
            r#"{system}

TOOLS
-----
You may ask for one of the following tools when it would help answer the user's question:

{tools}

RESPONSE FORMAT
---------------
Always reply with a markdown code snippet holding a single JSON object, and nothing else.

To use a tool:

```json
{{
    "action": string, \ one of [{tool_names}]
    "action_input": string \ the input for the tool
}}
```

To answer the user directly:

```json
{{
    "action": "{final_answer}",
    "action_input": string \ your answer to the user
}}
```"#,
            system = self.context.system_message.trim(),
            tools = self.context.describe_tools(),
            final_answer = FINAL_ANSWER,
        )
    }

    fn initial_messages(&self, input: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_prompt())];
        messages.extend(self.context.memory().load().iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(format!(
            "USER INPUT\n----------\n{input}\n\n(Reply with a markdown code snippet holding a single JSON action, and nothing else.)"
        )));
        messages
    }

    fn observe(&self, step: &AgentStep) -> String {
        let AgentStep::Action { tool, input } = step else {
            return String::new();
        };

        match self.context.get_tool(tool) {
            Some(found) => found.execute(input).observation(),
            None => format!(
                "{tool} is not a valid tool, try one of [{}].",
                self.context.tool_names().join(", ")
            ),
        }
    }

    fn trace(&self, label: &str, text: &str) {
        if self.context.verbose {
            eprintln!("{} {}", label.bold().cyan(), text.green());
        }
    }
}

impl Agent for ConversationalAgent {
    fn run(&mut self, input: &str) -> Result<String, AgentError> {
        let mut messages = self.initial_messages(input);
        let mut answer = None;

        self.trace("> Entering agent loop:", input);

        for iteration in 0..self.context.max_iterations {
            let reply = self.context.model.complete(&messages)?;
            tracing::debug!(iteration, "🧠 model replied");
            self.trace("Model:", &reply);

            let observation = match parse_step(&reply) {
                Ok(AgentStep::Finish(text)) => {
                    answer = Some(text);
                    break;
                }
                Ok(step) => {
                    if let AgentStep::Action { tool, input } = &step {
                        tracing::info!(tool = %tool, "🔧 agent calling tool");
                        self.trace("Action:", &format!("{tool} <- {input}"));
                    }
                    self.observe(&step)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "⚠️ unparseable model output");
                    INVALID_RESPONSE.to_string()
                }
            };

            self.trace("Observation:", &observation);
            messages.push(ChatMessage::assistant(reply));
            messages.push(ChatMessage::user(format!(
                "TOOL RESPONSE\n-------------\n{observation}\n\nUSER INPUT\n----------\nUsing what you learned above, what is the response to my last message? \
                 Do not mention tool names; I cannot see tool responses. \
                 Reply with a markdown code snippet holding a single JSON action, and nothing else."
            )));
        }

        let answer = answer.unwrap_or_else(|| {
            tracing::warn!(limit = self.context.max_iterations, "agent hit iteration limit");
            ITERATION_LIMIT_ANSWER.to_string()
        });

        self.trace("> Finished:", &answer);
        self.context.memory.save_context(input, &answer);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ConversationMemory, Turn};
    use crate::model::{ChatModel, Role};
    use crate::tools::{Tool, ToolResult};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies and records every prompt it was sent.
    #[derive(Clone, Default)]
    struct Scripted {
        replies: Arc<Mutex<VecDeque<String>>>,
        seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
                seen: Arc::default(),
            }
        }
    }

    impl ChatModel for Scripted {
        fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(ChatError::MalformedResponse)
        }
    }

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "BingSearch"
        }

        fn description(&self) -> &str {
            "search"
        }

        fn execute(&self, input: &str) -> ToolResult {
            ToolResult::success(&format!("results for {input}"))
        }
    }

    fn final_answer(text: &str) -> String {
        format!("```json\n{{\"action\": \"Final Answer\", \"action_input\": \"{text}\"}}\n```")
    }

    fn agent_with(model: Scripted) -> ConversationalAgent {
        let context = Context::new(model, ConversationMemory::new())
            .register_tool(Echo)
            .with_system_message("You are helpful.");
        ConversationalAgent::new(context)
    }

    #[test]
    fn direct_answer_is_saved_to_memory() {
        let mut agent = agent_with(Scripted::new(&[&final_answer("Hi there")]));

        let answer = agent.run("Hello").unwrap();

        assert_eq!(answer, "Hi there");
        assert_eq!(
            agent.context.memory().load(),
            vec![Turn::User("Hello".into()), Turn::Assistant("Hi there".into())]
        );
    }

    #[test]
    fn tool_output_is_fed_back_before_final_answer() {
        let model = Scripted::new(&[
            r#"{"action": "BingSearch", "action_input": "tokyo weather"}"#,
            &final_answer("Sunny"),
        ]);
        let mut agent = agent_with(model.clone());

        assert_eq!(agent.run("Weather?").unwrap(), "Sunny");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let last = seen[1].last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.contains("results for tokyo weather"));
    }

    #[test]
    fn prompt_carries_instruction_tools_and_history() {
        let model = Scripted::new(&[&final_answer("a"), &final_answer("b")]);
        let mut agent = agent_with(model.clone());

        agent.run("first").unwrap();
        agent.run("second").unwrap();

        let seen = model.seen.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second[0].role, Role::System);
        assert!(second[0].content.starts_with("You are helpful."));
        assert!(second[0].content.contains("> BingSearch: search"));
        assert_eq!(second[1], ChatMessage::user("first"));
        assert_eq!(second[2], ChatMessage::assistant("a"));
        assert!(second[3].content.contains("second"));
    }

    #[test]
    fn unknown_tool_is_reported_to_the_model() {
        let model = Scripted::new(&[
            r#"{"action": "Calculator", "action_input": "1+1"}"#,
            &final_answer("2"),
        ]);
        let mut agent = agent_with(model.clone());

        agent.run("1+1?").unwrap();

        let seen = model.seen.lock().unwrap();
        let observation = &seen[1].last().unwrap().content;
        assert!(observation.contains("Calculator is not a valid tool, try one of [BingSearch]."));
    }

    #[test]
    fn unparseable_output_is_tolerated() {
        let model = Scripted::new(&["just some words", &final_answer("recovered")]);
        let mut agent = agent_with(model.clone());

        assert_eq!(agent.run("hi").unwrap(), "recovered");
        let seen = model.seen.lock().unwrap();
        assert!(seen[1].last().unwrap().content.contains(INVALID_RESPONSE));
    }

    #[test]
    fn stops_at_iteration_limit() {
        let call = r#"{"action": "BingSearch", "action_input": "again"}"#;
        let model = Scripted::new(&[call, call, call]);
        let context = Context::new(model.clone(), ConversationMemory::new())
            .register_tool(Echo)
            .with_max_iterations(3);
        let mut agent = ConversationalAgent::new(context);

        assert_eq!(agent.run("loop").unwrap(), ITERATION_LIMIT_ANSWER);
        assert_eq!(model.seen.lock().unwrap().len(), 3);
        assert_eq!(agent.context.memory().load().len(), 2);
    }

    #[test]
    fn model_failure_propagates_and_leaves_memory_untouched() {
        let mut agent = agent_with(Scripted::new(&[]));

        let err = agent.run("hello").unwrap_err();

        assert!(matches!(err, AgentError::Model(ChatError::MalformedResponse)));
        assert!(agent.context.memory().is_empty());
    }
}
