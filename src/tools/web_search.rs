// src/tools/web_search.rs

use crate::tools::{Tool, ToolResult};
use scraper::{Html, Selector};
use std::sync::LazyLock;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) agentic-chat/0.1";
const DEFAULT_MAX_RESULTS: usize = 4;
pub const NO_RESULTS: &str = "No good DuckDuckGo Search Result was found";

static SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__snippet").expect("snippet selector"));

/// Web search over DuckDuckGo's HTML endpoint, returning joined result snippets.
pub struct WebSearchTool {
    name: String,
    description: String,
    endpoint: String,
    max_results: usize,
    http: reqwest::blocking::Client,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            name: "BingSearch".into(),
            description: "Useful when you need to search the web for up-to-date information."
                .into(),
            endpoint: SEARCH_URL.into(),
            max_results: DEFAULT_MAX_RESULTS,
            http: reqwest::blocking::Client::new(),
        }
    }

    fn fetch(&self, query: &str) -> Result<String, reqwest::Error> {
        self.http
            .post(&self.endpoint)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .form(&[("q", query)])
            .send()?
            .error_for_status()?
            .text()
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, input: &str) -> ToolResult {
        tracing::debug!(query = input, "🔎 web search");
        match self.fetch(input) {
            Ok(html) => {
                let snippets = extract_snippets(&html, self.max_results);
                if snippets.is_empty() {
                    ToolResult::success(NO_RESULTS)
                } else {
                    ToolResult::success(&snippets.join(" "))
                }
            }
            Err(err) => ToolResult::failure(&format!("Search request failed: {err}")),
        }
    }
}

/// Pulls plain-text result snippets out of a DuckDuckGo HTML results page.
pub fn extract_snippets(html: &str, max_results: usize) -> Vec<String> {
    Html::parse_document(html)
        .select(&SNIPPET)
        .map(|el| {
            let text = el.text().collect::<String>();
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|snippet| !snippet.is_empty())
        .take(max_results)
        .collect()
}
