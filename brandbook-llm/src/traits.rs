use async_trait::async_trait;
use brandbook_common::{ProviderKind, Result};
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Instruction appended to prompts for providers without a native JSON mode.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. No other text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry of an ordered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One incremental piece of generated text. The delta may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub delta: String,
}

impl Fragment {
    pub fn new(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.delta
    }
}

/// Lazy, single-pass sequence of fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// What every provider hands back, whatever its native shape.
pub enum ModelResponse {
    Complete(String),
    Stream(FragmentStream),
}

impl ModelResponse {
    pub fn is_streaming(&self) -> bool {
        matches!(self, ModelResponse::Stream(_))
    }

    /// Full text of the response; a stream is drained in order.
    pub async fn into_text(self) -> Result<String> {
        match self {
            ModelResponse::Complete(text) => Ok(text),
            ModelResponse::Stream(stream) => {
                stream
                    .try_fold(String::new(), |mut acc, fragment| async move {
                        acc.push_str(fragment.text());
                        Ok(acc)
                    })
                    .await
            }
        }
    }

    /// View the response as fragments; a complete text becomes one fragment.
    pub fn into_stream(self) -> FragmentStream {
        match self {
            ModelResponse::Stream(stream) => stream,
            ModelResponse::Complete(text) => {
                Box::pin(futures::stream::once(async move { Ok(Fragment::new(text)) }))
            }
        }
    }
}

impl fmt::Debug for ModelResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelResponse::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            ModelResponse::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Provider-agnostic chat interface.
///
/// Implementations translate the message list into their native request,
/// honor `json_mode` natively or by instruction, and return either a
/// complete text or a fragment stream. Provider failures are returned as
/// errors, never retried.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        streaming: bool,
    ) -> Result<ModelResponse>;

    /// Check if the provider is reachable with the configured credentials.
    async fn health_check(&self) -> Result<bool>;

    fn kind(&self) -> ProviderKind;

    fn model_name(&self) -> &str;

    /// Non-streaming call returning just the text.
    async fn complete(&self, messages: &[ChatMessage], json_mode: bool) -> Result<String> {
        self.invoke(messages, json_mode, false)
            .await?
            .into_text()
            .await
    }
}
