use crate::traits::{
    ChatMessage, ChatProvider, Fragment, FragmentStream, ModelResponse, JSON_ONLY_INSTRUCTION,
};
use crate::{normalize_base, provider_error};
use async_trait::async_trait;
use brandbook_common::{BrandbookError, ProviderKind, Result};
use brandbook_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Width, in characters, of the fragments a "streamed" Gemini reply is cut into.
pub const STREAM_CHUNK_CHARS: usize = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

/// Google Gemini API client.
///
/// Gemini takes a single flattened prompt. It never streams natively: a
/// streaming request fetches the full reply and replays it in fixed-width
/// fragments.
pub struct GeminiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client using the provided API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(GEMINI_API_BASE, api_key, model)
    }

    pub fn with_base_url(base_url: &str, api_key: String, model: String) -> Result<Self> {
        let client = HttpClient::new(&normalize_base(base_url))
            .map_err(|e| BrandbookError::Config(format!("gemini client init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn request(messages: &[ChatMessage], json_mode: bool) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: flatten_prompt(messages, json_mode),
                }],
            }],
            generation_config: json_mode.then_some(GeminiGenerationConfig {
                response_mime_type: "application/json",
            }),
        }
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(&self.api_key),
            }),
            ..Default::default()
        }
    }

    async fn generate(&self, messages: &[ChatMessage], json_mode: bool) -> Result<String> {
        let path = format!("models/{}:generateContent", self.model);
        let resp: GeminiResponse = self
            .client
            .post_json_opts(&path, &Self::request(messages, json_mode), self.opts())
            .await
            .map_err(|e| provider_error(ProviderKind::Gemini, e))?;

        let candidate = resp.candidates.into_iter().next().ok_or_else(|| {
            BrandbookError::Provider("gemini: No candidates returned from Gemini".to_string())
        })?;

        // Check for safety blocks
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(BrandbookError::Provider(
                "gemini: Content blocked by Gemini safety filters".to_string(),
            ));
        }

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        if parts.is_empty() {
            return Err(BrandbookError::Provider(
                "gemini: No content parts in Gemini response".to_string(),
            ));
        }
        Ok(parts.into_iter().map(|p| p.text).collect())
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        streaming: bool,
    ) -> Result<ModelResponse> {
        tracing::debug!(
            provider = "gemini",
            model = %self.model,
            messages = messages.len(),
            json_mode,
            streaming,
            "llm.invoke"
        );
        let text = self.generate(messages, json_mode).await?;
        if streaming {
            Ok(ModelResponse::Stream(replay(&text, STREAM_CHUNK_CHARS)))
        } else {
            Ok(ModelResponse::Complete(text))
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let path = format!("models/{}", self.model);
        match self
            .client
            .get_json::<serde_json::Value>(&path, self.opts())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Render every message as `role: content`, blank-line separated.
fn flatten_prompt(messages: &[ChatMessage], json_mode: bool) -> String {
    let mut prompt = messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    if json_mode {
        prompt.push_str("\n\n");
        prompt.push_str(JSON_ONLY_INSTRUCTION);
    }
    prompt
}

/// Cut `text` into fragments of at most `width` characters.
fn replay(text: &str, width: usize) -> FragmentStream {
    let chars: Vec<char> = text.chars().collect();
    let pieces: Vec<Result<Fragment>> = chars
        .chunks(width.max(1))
        .map(|chunk| Ok(Fragment::new(chunk.iter().collect::<String>())))
        .collect();
    Box::pin(futures::stream::iter(pieces))
}
