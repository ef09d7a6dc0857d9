use crate::traits::{ChatMessage, ChatProvider, Fragment, ModelResponse};
use crate::{normalize_base, provider_error};
use async_trait::async_trait;
use brandbook_common::{BrandbookError, ProviderKind, Result};
use brandbook_http::{sse, Auth, ByteStream, HttpClient, RequestOpts};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

/// Client for the chat-completions API and servers that mimic it.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
    kind: ProviderKind,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI endpoint.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(OPENAI_API_BASE, api_key, model)
    }

    /// Create a client against any chat-completions compatible base URL.
    pub fn with_base_url(base_url: &str, api_key: String, model: String) -> Result<Self> {
        Self::compatible(ProviderKind::OpenAi, base_url, api_key, model)
    }

    /// Shared constructor for providers that speak this dialect.
    pub(crate) fn compatible(
        kind: ProviderKind,
        base_url: &str,
        api_key: String,
        model: String,
    ) -> Result<Self> {
        let client = HttpClient::new(&normalize_base(base_url))
            .map_err(|e| BrandbookError::Config(format!("{kind} client init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            kind,
        })
    }

    fn request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        json_mode: bool,
        stream: bool,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
            stream,
        }
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: Some(Auth::Bearer(&self.api_key)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        streaming: bool,
    ) -> Result<ModelResponse> {
        tracing::debug!(
            provider = %self.kind,
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
                .post_stream("chat/completions", &req, self.opts())
                .await
                .map_err(|e| provider_error(self.kind, e))?;
            return Ok(ModelResponse::Stream(Box::pin(fragments(self.kind, body))));
        }

        let resp: ChatCompletionResponse = self
            .client
            .post_json_opts("chat/completions", &req, self.opts())
            .await
            .map_err(|e| provider_error(self.kind, e))?;

        let choice = resp.choices.into_iter().next().ok_or_else(|| {
            BrandbookError::Provider(format!("{}: response has no choices", self.kind))
        })?;
        Ok(ModelResponse::Complete(
            choice.message.content.unwrap_or_default(),
        ))
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get_json::<serde_json::Value>("models", self.opts())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("{} health check failed: {}", self.kind, e);
                Ok(false)
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Decode `choices[0].delta.content` from each event until `[DONE]`. An
/// `error` payload ends the stream with an error.
fn fragments(kind: ProviderKind, body: ByteStream) -> impl Stream<Item = Result<Fragment>> + Send {
    async_stream::try_stream! {
        let mut events = Box::pin(sse::events(body));
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| provider_error(kind, e))?;
            if event.data.trim() == "[DONE]" {
                break;
            }
            let chunk: ChatCompletionChunk = serde_json::from_str(&event.data)?;
            if let Some(error) = chunk.error {
                Err::<(), _>(BrandbookError::Provider(format!("{kind}: {}", error.message)))?;
            }
            let delta = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .unwrap_or_default();
            yield Fragment::new(delta);
        }
    }
}
