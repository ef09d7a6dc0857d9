//! Provider-agnostic model gateway for BrandBook.
//!
//! This crate exposes a common [`traits::ChatProvider`] interface and
//! concrete clients for OpenAI, Gemini, Ollama, and Claude. [`connect`]
//! turns a [`brandbook_common::LlmConfig`] into a ready client.
//!
//! Every client accepts an ordered list of role-tagged messages, a JSON-mode
//! flag and a streaming flag, and returns a [`traits::ModelResponse`]:
//! either the complete text or a lazy stream of fragments whose
//! concatenation equals the complete text.
//!
//! # Examples
//! ```no_run
//! use brandbook_common::{LlmConfig, Result};
//! use brandbook_llm::connect;
//! use brandbook_llm::traits::ChatMessage;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::Ollama {
//!     base_url: "http://localhost:11434/v1".into(),
//!     model: "deepseek-r1".into(),
//! };
//! let client = connect(&cfg).await?;
//! let text = client
//!     .complete(&[ChatMessage::user("Say hello")], false)
//!     .await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```
#[cfg(feature = "claude")]
pub mod claude;
#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod traits;

use brandbook_common::{BrandbookError, LlmConfig, ProviderKind};
use brandbook_http::HttpError;
use std::sync::Arc;
use traits::ChatProvider;

pub use traits::{ChatMessage, Fragment, FragmentStream, ModelResponse, Role};

/// Build a client for `config`.
///
/// Only Ollama touches the network here: it probes the local server and
/// logs a warning when it is unreachable, but still returns a client.
pub async fn connect(config: &LlmConfig) -> brandbook_common::Result<Arc<dyn ChatProvider>> {
    tracing::info!(provider = %config.kind(), model = config.model(), "llm.connect");
    match config {
        #[cfg(feature = "openai")]
        LlmConfig::OpenAi {
            api_key,
            model,
            base_url,
        } => {
            let base = base_url.as_deref().unwrap_or(openai::OPENAI_API_BASE);
            let client = openai::OpenAiClient::with_base_url(base, api_key.clone(), model.clone())?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "gemini")]
        LlmConfig::Gemini {
            api_key,
            model,
            base_url,
        } => {
            let base = base_url.as_deref().unwrap_or(gemini::GEMINI_API_BASE);
            let client = gemini::GeminiClient::with_base_url(base, api_key.clone(), model.clone())?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "ollama")]
        LlmConfig::Ollama { base_url, model } => {
            let client = ollama::OllamaClient::new(base_url.clone(), model.clone()).await?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "claude")]
        LlmConfig::Claude {
            api_key,
            model,
            base_url,
        } => {
            let base = base_url.as_deref().unwrap_or(claude::CLAUDE_API_BASE);
            let client = claude::ClaudeClient::with_base_url(base, api_key.clone(), model.clone())?;
            Ok(Arc::new(client))
        }
        #[allow(unreachable_patterns)]
        _ => Err(BrandbookError::Config(format!(
            "LLM provider {} not enabled",
            config.kind()
        ))),
    }
}

/// Map a transport failure into the shared provider error.
pub(crate) fn provider_error(kind: ProviderKind, e: HttpError) -> BrandbookError {
    let message = match e.status().map(|s| s.as_u16()) {
        Some(429) => "Rate limit exceeded".to_string(),
        Some(401) => "Invalid API key".to_string(),
        Some(403) => "API access forbidden".to_string(),
        _ => e.to_string(),
    };
    BrandbookError::Provider(format!("{kind}: {message}"))
}

/// Base URLs are joined with relative paths, so they need a trailing slash.
#[allow(dead_code)]
pub(crate) fn normalize_base(base: &str) -> String {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}
