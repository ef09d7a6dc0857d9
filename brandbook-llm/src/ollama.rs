use crate::openai::OpenAiClient;
use crate::traits::{ChatMessage, ChatProvider, ModelResponse};
use crate::{normalize_base, provider_error};
use async_trait::async_trait;
use brandbook_common::{BrandbookError, ProviderKind, Result};
use brandbook_http::{HttpClient, RequestOpts};
use serde::Deserialize;
use std::time::Duration;

pub use brandbook_common::DEFAULT_OLLAMA_BASE_URL;

/// Ollama ignores the key, but the chat endpoint expects a bearer header.
const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama client for local model inference.
///
/// Chat goes through Ollama's OpenAI-compatible `/v1` surface; model
/// discovery uses the native `/api/tags` endpoint next to it.
pub struct OllamaClient {
    chat: OpenAiClient,
    native: HttpClient,
    model: String,
}

impl OllamaClient {
    /// Create a client and report (but tolerate) an unreachable server.
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let chat = OpenAiClient::compatible(
            ProviderKind::Ollama,
            &base_url,
            OLLAMA_PLACEHOLDER_KEY.to_string(),
            model.clone(),
        )?;
        let native = HttpClient::new(&native_root(&base_url))
            .map_err(|e| BrandbookError::Config(format!("ollama client init failed: {e}")))?
            .with_timeout(Duration::from_secs(5));

        let client = Self {
            chat,
            native,
            model,
        };

        match client.available_models().await {
            Ok(models) if !has_model(&models, &client.model) => {
                tracing::warn!(
                    model = %client.model,
                    "Model not found locally. Make sure {} is installed (`ollama pull {}`)",
                    client.model,
                    client.model
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "{}", OLLAMA_CONNECTION_ERROR),
        }

        Ok(client)
    }

    /// Names of locally installed models.
    pub async fn available_models(&self) -> Result<Vec<String>> {
        let tags: TagsResponse = self
            .native
            .get_json("api/tags", RequestOpts::default())
            .await
            .map_err(|e| provider_error(ProviderKind::Ollama, e))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ChatProvider for OllamaClient {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        streaming: bool,
    ) -> Result<ModelResponse> {
        self.chat.invoke(messages, json_mode, streaming).await
    }

    async fn health_check(&self) -> Result<bool> {
        match self.available_models().await {
            Ok(models) => Ok(has_model(&models, &self.model)),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// `http://host:11434/v1` -> `http://host:11434/`
fn native_root(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    normalize_base(trimmed.strip_suffix("/v1").unwrap_or(trimmed))
}

/// Tags carry a `:latest` style suffix the configured name may omit.
fn has_model(installed: &[String], wanted: &str) -> bool {
    installed.iter().any(|name| {
        name == wanted
            || name
                .split_once(':')
                .is_some_and(|(base, _)| base == wanted)
    })
}
