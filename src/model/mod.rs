// src/model/mod.rs

use crate::config::Settings;
use crate::memory::Turn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        match turn {
            Turn::User(text) => Self::user(text.clone()),
            Turn::Assistant(text) => Self::assistant(text.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("missing setting {0}")]
    MissingSetting(&'static str),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("chat endpoint response missing message content")]
    MalformedResponse,
}

/// Request/response chat completion against some hosted model.
pub trait ChatModel {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

/// Which flavour of OpenAI endpoint the settings point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    Azure,
    OpenAi,
}

impl ApiFlavor {
    pub fn parse(api_type: Option<&str>) -> Self {
        match api_type.map(|t| t.trim().to_ascii_lowercase()) {
            Some(t) if t == "open_ai" || t == "openai" => ApiFlavor::OpenAi,
            _ => ApiFlavor::Azure,
        }
    }
}

/// Blocking client for an Azure OpenAI (or plain OpenAI) chat deployment.
pub struct AzureChatClient {
    settings: Settings,
    temperature: f32,
    http: reqwest::blocking::Client,
}

impl AzureChatClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
            temperature: DEFAULT_TEMPERATURE,
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn flavor(&self) -> ApiFlavor {
        ApiFlavor::parse(self.settings.api_type.as_deref())
    }

    fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ChatError> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(ChatError::MissingSetting(name))
    }

    pub fn endpoint(&self) -> Result<String, ChatError> {
        let base = Self::require(&self.settings.api_base, "OPENAI_API_BASE")?.trim_end_matches('/');

        match self.flavor() {
            ApiFlavor::Azure => {
                let deployment = Self::require(&self.settings.deployment, "OPENAI_API_MODEL_DEPROY")?;
                let version = Self::require(&self.settings.api_version, "OPENAI_API_VERSION")?;
                Ok(format!(
                    "{base}/openai/deployments/{deployment}/chat/completions?api-version={version}"
                ))
            }
            ApiFlavor::OpenAi => Ok(format!("{base}/chat/completions")),
        }
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage]) -> Result<CompletionRequest<'a>, ChatError> {
        let model = match self.flavor() {
            ApiFlavor::Azure => None,
            ApiFlavor::OpenAi => {
                Some(Self::require(&self.settings.deployment, "OPENAI_API_MODEL_DEPROY")?)
            }
        };

        Ok(CompletionRequest {
            model,
            messages,
            temperature: self.temperature,
        })
    }
}

impl ChatModel for AzureChatClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let url = self.endpoint()?;
        let key = Self::require(&self.settings.api_key, "OPENAI_API_KEY")?;
        let body = self.request_body(messages)?;

        let request = self.http.post(&url).json(&body);
        let request = match self.flavor() {
            ApiFlavor::Azure => request.header("api-key", key),
            ApiFlavor::OpenAi => request.bearer_auth(key),
        };

        tracing::debug!(url = %url, messages = messages.len(), "sending chat completion");
        let response = request.send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ChatError::Status { status: status.as_u16(), body });
        }

        let parsed: CompletionResponse = response.json()?;
        extract_content(parsed)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_content(response: CompletionResponse) -> Result<String, ChatError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ChatError::MalformedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_settings() -> Settings {
        Settings {
            api_base: Some("https://contoso.openai.azure.com/".into()),
            api_version: Some("2023-05-15".into()),
            deployment: Some("gpt35".into()),
            api_key: Some("key".into()),
            api_type: Some("azure".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn azure_endpoint_includes_deployment_and_version() {
        let client = AzureChatClient::new(&azure_settings());
        assert_eq!(
            client.endpoint().unwrap(),
            "https://contoso.openai.azure.com/openai/deployments/gpt35/chat/completions?api-version=2023-05-15"
        );
    }

    #[test]
    fn openai_flavor_uses_plain_completions_path() {
        let settings = Settings {
            api_base: Some("https://api.openai.com/v1".into()),
            api_type: Some("open_ai".into()),
            deployment: Some("gpt-4o-mini".into()),
            ..Settings::default()
        };
        let client = AzureChatClient::new(&settings);

        assert_eq!(client.flavor(), ApiFlavor::OpenAi);
        assert_eq!(client.endpoint().unwrap(), "https://api.openai.com/v1/chat/completions");

        let messages = [ChatMessage::user("hi")];
        let body = serde_json::to_value(client.request_body(&messages).unwrap()).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn unset_api_type_defaults_to_azure() {
        assert_eq!(ApiFlavor::parse(None), ApiFlavor::Azure);
        assert_eq!(ApiFlavor::parse(Some("AZURE")), ApiFlavor::Azure);
        assert_eq!(ApiFlavor::parse(Some("OpenAI")), ApiFlavor::OpenAi);
    }

    #[test]
    fn missing_settings_surface_only_when_completing() {
        let client = AzureChatClient::new(&Settings::default());
        let err = client.complete(&[ChatMessage::user("hi")]).unwrap_err();
        assert!(matches!(err, ChatError::MissingSetting("OPENAI_API_BASE")));

        let settings = Settings { api_key: None, ..azure_settings() };
        let err = AzureChatClient::new(&settings)
            .complete(&[ChatMessage::user("hi")])
            .unwrap_err();
        assert!(matches!(err, ChatError::MissingSetting("OPENAI_API_KEY")));
    }

    #[test]
    fn azure_body_omits_model() {
        let client = AzureChatClient::new(&azure_settings()).with_temperature(0.0);
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = serde_json::to_value(client.request_body(&messages).unwrap()).unwrap();

        assert!(body.get("model").is_none());
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn extracts_first_choice_content() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(response).unwrap(), "hello");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_content(empty), Err(ChatError::MalformedResponse)));
    }

    #[test]
    fn turns_convert_to_chat_messages() {
        assert_eq!(ChatMessage::from(&Turn::User("a".into())), ChatMessage::user("a"));
        assert_eq!(
            ChatMessage::from(&Turn::Assistant("b".into())),
            ChatMessage::assistant("b")
        );
    }
}
