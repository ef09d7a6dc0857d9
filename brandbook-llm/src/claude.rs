use crate::traits::{
    ChatMessage, ChatProvider, Fragment, ModelResponse, Role, JSON_ONLY_INSTRUCTION,
};
use crate::{normalize_base, provider_error};
use async_trait::async_trait;
use brandbook_common::{BrandbookError, ProviderKind, Result};
use brandbook_http::{sse, Auth, ByteStream, HttpClient, RequestOpts};
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

pub const CLAUDE_API_BASE: &str = "https://api.anthropic.com/v1/";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta {
        delta: BlockDelta,
    },
    MessageStop,
    Error {
        error: StreamError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

/// Anthropic messages API client.
///
/// System messages are lifted into the top-level `system` field; in JSON
/// mode a JSON-only instruction is appended there, since the API has no
/// response-format switch.
pub struct ClaudeClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(CLAUDE_API_BASE, api_key, model)
    }

    pub fn with_base_url(base_url: &str, api_key: String, model: String) -> Result<Self> {
        let client = HttpClient::new(&normalize_base(base_url))
            .map_err(|e| BrandbookError::Config(format!("claude client init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        json_mode: bool,
        stream: bool,
    ) -> MessagesRequest<'a> {
        let mut system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if json_mode {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str(JSON_ONLY_INSTRUCTION);
        }

        let messages = messages
            .iter()
            .filter_map(|m| match m.role {
                Role::System => None,
                Role::User => Some(WireMessage {
                    role: "user",
                    content: &m.content,
                }),
                Role::Assistant => Some(WireMessage {
                    role: "assistant",
                    content: &m.content,
                }),
            })
            .collect();

        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages,
            stream,
        }
    }

    fn opts(&self) -> Result<RequestOpts<'_>> {
        let key = HeaderValue::from_str(self.api_key.trim())
            .map_err(|e| BrandbookError::Config(format!("invalid Claude API key: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(RequestOpts {
            auth: Some(Auth::Header {
                name: HeaderName::from_static("x-api-key"),
                value: key,
            }),
            headers: Some(headers),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ChatProvider for ClaudeClient {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        streaming: bool,
    ) -> Result<ModelResponse> {
        tracing::debug!(
            provider = "claude",
            model = %self.model,
            messages = messages.len(),
            json_mode,
            streaming,
            "llm.invoke"
        );
        let req = self.request(messages, json_mode, streaming);

        if streaming {
            let body = self
                .client
                .post_stream("messages", &req, self.opts()?)
                .await
                .map_err(|e| provider_error(ProviderKind::Claude, e))?;
            return Ok(ModelResponse::Stream(Box::pin(fragments(body))));
        }

        let resp: MessagesResponse = self
            .client
            .post_json_opts("messages", &req, self.opts()?)
            .await
            .map_err(|e| provider_error(ProviderKind::Claude, e))?;

        let text = resp
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .unwrap_or_default();
        Ok(ModelResponse::Complete(text))
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get_json::<serde_json::Value>("models", self.opts()?)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Claude health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Text deltas become fragments; an `error` event ends the stream with an error.
fn fragments(body: ByteStream) -> impl Stream<Item = Result<Fragment>> + Send {
    async_stream::try_stream! {
        let mut events = Box::pin(sse::events(body));
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| provider_error(ProviderKind::Claude, e))?;
            if event.data.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StreamEvent>(&event.data)? {
                StreamEvent::ContentBlockDelta { delta } => {
                    yield Fragment::new(delta.text.unwrap_or_default());
                }
                StreamEvent::MessageStop => break,
                StreamEvent::Error { error } => {
                    Err::<(), _>(BrandbookError::Provider(format!("claude: {}", error.message)))?;
                }
                StreamEvent::Other => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_are_lifted_and_joined() {
        let client = ClaudeClient::new("k".into(), "claude-sonnet-4-5".into()).unwrap();
        let messages = [
            ChatMessage::system("First."),
            ChatMessage::user("Hello"),
            ChatMessage::system("Second."),
        ];
        let body = serde_json::to_value(client.request(&messages, false, false)).unwrap();
        assert_eq!(body["system"], "First.\n\nSecond.");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn json_mode_appends_instruction_even_without_system() {
        let client = ClaudeClient::new("k".into(), "claude-sonnet-4-5".into()).unwrap();
        let body = serde_json::to_value(client.request(&[ChatMessage::user("x")], true, true)).unwrap();
        assert_eq!(body["system"], JSON_ONLY_INSTRUCTION);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn empty_system_is_omitted() {
        let client = ClaudeClient::new("k".into(), "claude-sonnet-4-5".into()).unwrap();
        let body = serde_json::to_value(client.request(&[ChatMessage::user("x")], false, false)).unwrap();
        assert!(body.get("system").is_none());
    }
}
