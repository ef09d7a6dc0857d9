//! Common types and utilities shared across BrandBook crates.
//!
//! This crate defines provider selection, model configuration, observability
//! helpers, and the shared error type used throughout the workspace. It is
//! intentionally dependency‑minimal so every crate can depend on it.
//!
//! # Overview
//!
//! - [`ProviderKind`]: the four supported language-model backends
//! - [`LlmConfig`]: provider‑tagged model configuration (credentials included)
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`BrandbookError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use brandbook_common::{LlmConfig, ProviderKind};
//!
//! let cfg = LlmConfig::Ollama {
//!     base_url: "http://localhost:11434/v1".to_string(),
//!     model: ProviderKind::Ollama.default_model().to_string(),
//! };
//! assert_eq!(cfg.kind(), ProviderKind::Ollama);
//! assert_eq!(cfg.model(), "deepseek-r1");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod observability;

/// Default model recommendations per provider.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5.1";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OLLAMA_MODEL: &str = "deepseek-r1";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5";

/// Ollama's OpenAI-compatible endpoint on a default local install.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// The language-model backends a session can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
    Ollama,
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Ollama,
        ProviderKind::Claude,
    ];

    /// Wire name used in configuration files and HTTP forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Claude => "claude",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => DEFAULT_OPENAI_MODEL,
            ProviderKind::Gemini => DEFAULT_GEMINI_MODEL,
            ProviderKind::Ollama => DEFAULT_OLLAMA_MODEL,
            ProviderKind::Claude => DEFAULT_CLAUDE_MODEL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = BrandbookError;

    /// Parse a provider name, ignoring case and surrounding whitespace.
    ///
    /// ```
    /// use brandbook_common::ProviderKind;
    ///
    /// assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
    /// assert!("mistral".parse::<ProviderKind>().is_err());
    /// ```
    fn from_str(raw: &str) -> Result<Self> {
        let wanted = raw.trim();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BrandbookError::Config(format!("Unsupported provider: {wanted}")))
    }
}

/// Configuration for one language-model session.
///
/// Built by `brandbook-config` and turned into a live client by
/// `brandbook_llm::connect`. `base_url` overrides exist so tests (and
/// compatible gateways) can point a client somewhere else.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    #[serde(rename = "openai")]
    OpenAi {
        api_key: String,
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    Gemini {
        api_key: String,
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    Ollama {
        base_url: String,
        model: String,
    },
    Claude {
        api_key: String,
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

impl LlmConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            LlmConfig::OpenAi { .. } => ProviderKind::OpenAi,
            LlmConfig::Gemini { .. } => ProviderKind::Gemini,
            LlmConfig::Ollama { .. } => ProviderKind::Ollama,
            LlmConfig::Claude { .. } => ProviderKind::Claude,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmConfig::OpenAi { model, .. }
            | LlmConfig::Gemini { model, .. }
            | LlmConfig::Ollama { model, .. }
            | LlmConfig::Claude { model, .. } => model,
        }
    }
}

// Credentials never reach log output.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base_url = match self {
            LlmConfig::OpenAi { base_url, .. }
            | LlmConfig::Gemini { base_url, .. }
            | LlmConfig::Claude { base_url, .. } => base_url.as_deref(),
            LlmConfig::Ollama { base_url, .. } => Some(base_url.as_str()),
        };
        f.debug_struct("LlmConfig")
            .field("provider", &self.kind())
            .field("model", &self.model())
            .field("base_url", &base_url)
            .finish_non_exhaustive()
    }
}

/// Error types used across the BrandBook system.
#[derive(thiserror::Error, Debug)]
pub enum BrandbookError {
    /// The language-model provider call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A page could not be fetched or decoded.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A model response that should have been JSON was not.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenient alias for results that use [`BrandbookError`].
pub type Result<T> = std::result::Result<T, BrandbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_with_their_category() {
        let cases = [
            (BrandbookError::Provider("openai: overloaded".into()), "Provider error: openai: overloaded"),
            (BrandbookError::Fetch("https://acme.com: 404".into()), "Fetch error: https://acme.com: 404"),
            (BrandbookError::Config("no key".into()), "Configuration error: no key"),
        ];
        for (err, rendered) in cases {
            assert_eq!(err.to_string(), rendered);
        }

        let parse: BrandbookError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(parse, BrandbookError::Parse(_)));
        assert!(parse.to_string().starts_with("Parse error:"));
    }

    #[test]
    fn provider_names_round_trip_through_from_str() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert_eq!(" Claude ".parse::<ProviderKind>().unwrap(), ProviderKind::Claude);
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = "bard".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, BrandbookError::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: Unsupported provider: bard");
    }

    #[test]
    fn llm_config_debug_hides_api_key() {
        let cfg = LlmConfig::OpenAi {
            api_key: "sk-very-secret".into(),
            model: DEFAULT_OPENAI_MODEL.into(),
            base_url: None,
        };
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("gpt-5.1"));
        assert!(!rendered.contains("sk-very-secret"));
    }

    #[test]
    fn llm_config_is_tagged_by_provider() {
        let cfg: LlmConfig = serde_json::from_value(serde_json::json!({
            "provider": "claude",
            "api_key": "k",
            "model": "claude-sonnet-4-5"
        }))
        .unwrap();
        assert_eq!(cfg.kind(), ProviderKind::Claude);
        assert_eq!(cfg.model(), "claude-sonnet-4-5");
    }
}
