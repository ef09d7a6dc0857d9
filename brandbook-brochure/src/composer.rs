use crate::prompts::{
    BROCHURE_PROMPT_MAX_CHARS, BROCHURE_SYSTEM_PROMPT, LINK_SYSTEM_PROMPT, brochure_prompt_header,
    links_user_prompt,
};
use brandbook_common::Result;
use brandbook_llm::traits::ChatProvider;
use brandbook_llm::{ChatMessage, ModelResponse};
use brandbook_web::PageFetcher;
use brandbook_web::extract::truncate_chars;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A page the model picked for the brochure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// JSON answer of the link selection phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSelection {
    pub links: Vec<Link>,
}

/// Two-phase brochure pipeline: pick relevant sub-pages, then write the
/// brochure from the landing page plus those pages.
#[derive(Clone)]
pub struct BrochureComposer {
    fetcher: Arc<dyn PageFetcher>,
}

impl BrochureComposer {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Ask the model (JSON mode) which links on `url` belong in a brochure.
    ///
    /// A reply that does not parse as [`LinkSelection`] is a
    /// [`BrandbookError::Parse`](brandbook_common::BrandbookError::Parse).
    pub async fn select_relevant_links(
        &self,
        url: &str,
        gateway: &dyn ChatProvider,
    ) -> Result<LinkSelection> {
        tracing::info!(
            url,
            provider = %gateway.kind(),
            model = gateway.model_name(),
            "selecting relevant links"
        );
        let links = self.fetcher.fetch_links(url).await?;
        let messages = [
            ChatMessage::system(LINK_SYSTEM_PROMPT),
            ChatMessage::user(links_user_prompt(url, &links)),
        ];
        let reply = gateway.complete(&messages, true).await?;
        let selection: LinkSelection = serde_json::from_str(&reply)?;
        tracing::info!(url, count = selection.links.len(), "relevant links selected");
        Ok(selection)
    }

    /// Landing page text followed by the text of every selected page.
    pub async fn gather_pages(&self, url: &str, gateway: &dyn ChatProvider) -> Result<String> {
        let landing = self.fetcher.fetch_contents(url).await?;
        let selection = self.select_relevant_links(url, gateway).await?;

        let mut pages = Vec::with_capacity(selection.links.len());
        for link in selection.links {
            let text = self.fetcher.fetch_contents(&link.url).await?;
            pages.push((link.kind, text));
        }
        Ok(assemble_document(&landing, &pages))
    }

    /// Header plus gathered pages, cut to [`BROCHURE_PROMPT_MAX_CHARS`].
    pub async fn brochure_user_prompt(
        &self,
        company: &str,
        url: &str,
        gateway: &dyn ChatProvider,
    ) -> Result<String> {
        let document = self.gather_pages(url, gateway).await?;
        let prompt = format!("{}{document}", brochure_prompt_header(company));
        Ok(truncate_chars(&prompt, BROCHURE_PROMPT_MAX_CHARS))
    }

    /// Produce the brochure for `company` at `url`, whole or as fragments.
    pub async fn compose(
        &self,
        company: &str,
        url: &str,
        gateway: &dyn ChatProvider,
        streaming: bool,
    ) -> Result<ModelResponse> {
        let user_prompt = self.brochure_user_prompt(company, url, gateway).await?;
        tracing::info!(
            company,
            url,
            prompt_chars = user_prompt.chars().count(),
            streaming,
            "generating brochure"
        );
        let messages = [
            ChatMessage::system(BROCHURE_SYSTEM_PROMPT),
            ChatMessage::user(user_prompt),
        ];
        gateway.invoke(&messages, false, streaming).await
    }
}

/// `## Landing Page:` section, then one `### Link:` section per page.
pub fn assemble_document(landing: &str, pages: &[(String, String)]) -> String {
    let mut doc = format!("## Landing Page:\n\n{landing}\n## Relevant Links:\n");
    for (kind, text) in pages {
        doc.push_str(&format!("\n\n### Link: {kind}\n"));
        doc.push_str(text);
    }
    doc
}
