use anyhow::{Context, Result};
use brandbook_brochure::BrochureComposer;
use brandbook_common::{LlmConfig, ProviderKind};
use brandbook_config::BrandbookConfig;
use brandbook_finder::UrlResolver;
use brandbook_llm::traits::ChatProvider;
use brandbook_web::{DuckDuckGoSearch, HttpPageFetcher, PageFetcher, SearchProvider};
use std::sync::Arc;

/// Long-lived pieces shared by every command and request.
pub struct Tether {
    pub config: BrandbookConfig,
    pub resolver: UrlResolver,
    pub composer: BrochureComposer,
}

impl Tether {
    pub fn new(
        config: BrandbookConfig,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            config,
            resolver: UrlResolver::new(search),
            composer: BrochureComposer::new(fetcher),
        }
    }

    /// DuckDuckGo search plus plain HTTP page fetching.
    pub fn from_config(config: BrandbookConfig) -> Result<Self> {
        let search = DuckDuckGoSearch::new(config.search_timeout(), &config.search.user_agent)
            .context("search provider init failed")?;
        let fetcher = HttpPageFetcher::new(config.fetcher_config())?;
        Ok(Self::new(config, Arc::new(search), Arc::new(fetcher)))
    }

    /// Build the model session for `provider` (or the configured one).
    pub async fn connect(
        &self,
        provider: Option<ProviderKind>,
        model: Option<&str>,
    ) -> brandbook_common::Result<Session> {
        let llm = match provider {
            Some(kind) => self.config.llm_config(kind, model)?,
            None => match model {
                Some(_) => {
                    let kind = self.config.selected_llm_config()?.kind();
                    self.config.llm_config(kind, model)?
                }
                None => self.config.selected_llm_config()?,
            },
        };
        Session::connect(&llm).await
    }
}

/// A connected model: what it is and the client to call it.
#[derive(Clone)]
pub struct Session {
    pub provider: ProviderKind,
    pub model: String,
    pub gateway: Arc<dyn ChatProvider>,
}

impl Session {
    pub async fn connect(config: &LlmConfig) -> brandbook_common::Result<Self> {
        let gateway = brandbook_llm::connect(config).await?;
        Ok(Self::from_gateway(gateway))
    }

    pub fn from_gateway(gateway: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider: gateway.kind(),
            model: gateway.model_name().to_string(),
            gateway,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
