//! Loader for BrandBook configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, YAML files and inline
//! snippets (in the order they were added), then `BRANDBOOK__`-prefixed
//! environment variables (`BRANDBOOK__MODEL__PROVIDER=claude`). After
//! merging, every string is run through `${VAR}` expansion, so the defaults
//! pick up the conventional `OPENAI_API_KEY`, `GOOGLE_API_KEY` and
//! `ANTHROPIC_API_KEY` variables without a config file.
//!
//! Credentials are only checked when a session is built with
//! [`BrandbookConfig::llm_config`]; a missing key never fails loading.
use brandbook_common::{BrandbookError, LlmConfig, ProviderKind, Result};
use brandbook_web::{DEFAULT_USER_AGENT, FetcherConfig};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "BRANDBOOK";

/// Default config file name, looked up in the working directory and the
/// user config directory.
pub const CONFIG_FILE_NAME: &str = "brandbook.yaml";

const DEFAULTS_YAML: &str = r#"
version: "1"
server:
  bind: "0.0.0.0:8000"
providers:
  openai:
    api_key: "${OPENAI_API_KEY}"
  gemini:
    api_key: "${GOOGLE_API_KEY}"
  ollama:
    base_url: "http://localhost:11434/v1"
  claude:
    api_key: "${ANTHROPIC_API_KEY}"
fetch:
  timeout_secs: 15
  max_chars: 2000
search:
  timeout_secs: 10
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct BrandbookConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    /// Session selected at startup; the server and CLI fall back to OpenAI.
    #[serde(default)]
    pub model: Option<ModelSelection>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSelection {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: RemoteProviderConfig,
    #[serde(default)]
    pub gemini: RemoteProviderConfig,
    #[serde(default)]
    pub ollama: OllamaProviderConfig,
    #[serde(default)]
    pub claude: RemoteProviderConfig,
}

/// Settings for a hosted provider.
#[derive(Clone, Default, Deserialize)]
pub struct RemoteProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for RemoteProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaProviderConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

impl Default for OllamaProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_chars: default_max_chars(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".into()
}
fn default_ollama_base_url() -> String {
    brandbook_common::DEFAULT_OLLAMA_BASE_URL.into()
}
fn default_fetch_timeout() -> u64 {
    15
}
fn default_max_chars() -> usize {
    2_000
}
fn default_search_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

impl BrandbookConfig {
    /// Build the model configuration for `provider`.
    ///
    /// `model` falls back to the provider default when absent or blank. A
    /// hosted provider without a usable key (missing, empty or still an
    /// unexpanded `${VAR}`) is a configuration error.
    pub fn llm_config(&self, provider: ProviderKind, model: Option<&str>) -> Result<LlmConfig> {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(provider.default_model())
            .to_string();

        let cfg = match provider {
            ProviderKind::OpenAi => {
                let api_key = require_key(&self.providers.openai, provider, "OPENAI_API_KEY")?;
                if !(api_key.starts_with("sk-") && api_key.len() > 10) {
                    tracing::warn!("OpenAI API key might be invalid. Please check your environment");
                }
                LlmConfig::OpenAi {
                    api_key,
                    model,
                    base_url: self.providers.openai.base_url.clone(),
                }
            }
            ProviderKind::Gemini => LlmConfig::Gemini {
                api_key: require_key(&self.providers.gemini, provider, "GOOGLE_API_KEY")?,
                model,
                base_url: self.providers.gemini.base_url.clone(),
            },
            ProviderKind::Ollama => LlmConfig::Ollama {
                base_url: self.providers.ollama.base_url.clone(),
                model,
            },
            ProviderKind::Claude => LlmConfig::Claude {
                api_key: require_key(&self.providers.claude, provider, "ANTHROPIC_API_KEY")?,
                model,
                base_url: self.providers.claude.base_url.clone(),
            },
        };
        Ok(cfg)
    }

    /// Session named by the `model` section, or OpenAI with its default model.
    pub fn selected_llm_config(&self) -> Result<LlmConfig> {
        match &self.model {
            Some(sel) => self.llm_config(sel.provider.parse()?, sel.model.as_deref()),
            None => self.llm_config(ProviderKind::OpenAi, None),
        }
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_chars: self.fetch.max_chars,
            user_agent: self.fetch.user_agent.clone(),
        }
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }
}

fn require_key(cfg: &RemoteProviderConfig, provider: ProviderKind, env_name: &str) -> Result<String> {
    match cfg.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() && !key.contains("${") => Ok(key.to_string()),
        _ => Err(BrandbookError::Config(format!(
            "{env_name} not found; set it or providers.{provider}.api_key"
        ))),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// `brandbook.yaml` under the user config directory, if there is one.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("brandbook").join(CONFIG_FILE_NAME))
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct BrandbookConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for BrandbookConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl BrandbookConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use brandbook_config::BrandbookConfigLoader;
    ///
    /// let config = BrandbookConfigLoader::new().load().expect("defaults load");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.server.bind, "0.0.0.0:8000");
    /// assert_eq!(config.fetch.max_chars, 2000);
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULTS_YAML, FileFormat::Yaml));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the `config` crate
    /// infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use brandbook_config::BrandbookConfigLoader;
    ///
    /// let cfg = BrandbookConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// model:
    ///   provider: ollama
    ///   model: llama3
    /// providers:
    ///   ollama:
    ///     base_url: "http://gpu-box:11434/v1"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let llm = cfg.selected_llm_config().unwrap();
    /// assert_eq!(llm.model(), "llama3");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge every source, apply environment overrides, expand `${VAR}`
    /// placeholders and deserialize.
    pub fn load(self) -> std::result::Result<BrandbookConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: BrandbookConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
