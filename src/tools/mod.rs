// src/tools/mod.rs

/// The result of executing a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: &str) -> Self {
        Self {
            success: true,
            output: Some(output.to_string()),
            error: None,
        }
    }

    pub fn failure(error: &str) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.to_string()),
        }
    }

    /// Text fed back to the model as the observation for this call.
    pub fn observation(&self) -> String {
        match (self.success, &self.output, &self.error) {
            (true, Some(output), _) => output.clone(),
            (true, None, _) => String::new(),
            (false, _, Some(error)) => format!("Error: {error}"),
            (false, _, None) => "Error: tool failed without a message".to_string(),
        }
    }
}

/// Trait that defines a pluggable tool usable by an agent.
///
/// The description is the only signal the agent gets about when to pick the
/// tool, so it should say what the tool is good for.
pub trait Tool {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn execute(&self, input: &str) -> ToolResult;
}

pub mod web_search;
pub use web_search::WebSearchTool;
