use async_trait::async_trait;
use brandbook_brochure::{BrochureComposer, Link};
use brandbook_common::{BrandbookError, ProviderKind, Result};
use brandbook_llm::openai::OpenAiClient;
use brandbook_llm::traits::ChatProvider;
use brandbook_llm::{ChatMessage, Fragment, ModelResponse, Role};
use brandbook_web::{FetcherConfig, HttpPageFetcher, PageFetcher};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, String>,
    links: HashMap<String, Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeSite {
    fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.into(), text.into());
        self
    }

    fn links(mut self, url: &str, links: &[&str]) -> Self {
        self.links
            .insert(url.into(), links.iter().map(|l| l.to_string()).collect());
        self
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch_contents(&self, url: &str) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| BrandbookError::Fetch(format!("{url}: 404 Not Found")))
    }

    async fn fetch_links(&self, url: &str) -> Result<Vec<String>> {
        Ok(self.links.get(url).cloned().unwrap_or_default())
    }
}

/// Answers JSON-mode calls with `links_json` and everything else with
/// `brochure`, streamed in three pieces when asked.
struct ScriptedModel {
    links_json: String,
    brochure: String,
    calls: Mutex<Vec<(Vec<ChatMessage>, bool, bool)>>,
}

impl ScriptedModel {
    fn new(links_json: &str, brochure: &str) -> Self {
        Self {
            links_json: links_json.into(),
            brochure: brochure.into(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatProvider for ScriptedModel {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        streaming: bool,
    ) -> Result<ModelResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), json_mode, streaming));
        if json_mode {
            return Ok(ModelResponse::Complete(self.links_json.clone()));
        }
        if !streaming {
            return Ok(ModelResponse::Complete(self.brochure.clone()));
        }
        let third = self.brochure.len() / 3;
        let pieces = vec![
            Ok(Fragment::new(&self.brochure[..third])),
            Ok(Fragment::new("")),
            Ok(Fragment::new(&self.brochure[third..])),
        ];
        Ok(ModelResponse::Stream(Box::pin(futures::stream::iter(pieces))))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

const ABOUT_ONLY: &str = r#"{"links": [{"type": "about page", "url": "https://acme.com/about"}]}"#;

fn acme() -> FakeSite {
    FakeSite::default()
        .page("https://acme.com", "Acme\n\nRockets for everyone")
        .page("https://acme.com/about", "About\n\nFounded in 1949")
        .links(
            "https://acme.com",
            &["/about", "/privacy", "mailto:hi@acme.com"],
        )
}

#[tokio::test]
async fn link_selection_parses_json_reply() {
    let composer = BrochureComposer::new(Arc::new(acme()));
    let model = ScriptedModel::new(ABOUT_ONLY, "unused");

    let selection = composer
        .select_relevant_links("https://acme.com", &model)
        .await
        .unwrap();
    assert_eq!(
        selection.links,
        vec![Link {
            kind: "about page".into(),
            url: "https://acme.com/about".into(),
        }]
    );

    let calls = model.calls.lock().unwrap();
    let (messages, json_mode, streaming) = &calls[0];
    assert!(*json_mode && !*streaming);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[1].content.ends_with("/about\n/privacy\nmailto:hi@acme.com"));
}

#[tokio::test]
async fn malformed_link_json_is_a_parse_error() {
    let composer = BrochureComposer::new(Arc::new(acme()));
    let model = ScriptedModel::new("here are the links: /about", "unused");

    let err = composer
        .select_relevant_links("https://acme.com", &model)
        .await
        .unwrap_err();
    assert!(matches!(err, BrandbookError::Parse(_)));
}

#[tokio::test]
async fn brochure_prompt_holds_landing_and_linked_pages() {
    let site = Arc::new(acme());
    let composer = BrochureComposer::new(site.clone());
    let model = ScriptedModel::new(ABOUT_ONLY, "# Acme");

    let prompt = composer
        .brochure_user_prompt("Acme", "https://acme.com", &model)
        .await
        .unwrap();
    assert!(prompt.starts_with("\nYou are looking at a company called: Acme\n"));
    assert!(prompt.ends_with(
        "## Landing Page:\n\nAcme\n\nRockets for everyone\n## Relevant Links:\n\n\n### Link: about page\nAbout\n\nFounded in 1949"
    ));
    assert_eq!(
        *site.fetched.lock().unwrap(),
        vec!["https://acme.com", "https://acme.com/about"]
    );
}

#[tokio::test]
async fn brochure_prompt_is_truncated_to_five_thousand_chars() {
    let big = "é".repeat(6_000);
    let site = FakeSite::default()
        .page("https://acme.com", &big)
        .links("https://acme.com", &[]);
    let composer = BrochureComposer::new(Arc::new(site));
    let model = ScriptedModel::new(r#"{"links": []}"#, "unused");

    let prompt = composer
        .brochure_user_prompt("Acme", "https://acme.com", &model)
        .await
        .unwrap();
    assert_eq!(prompt.chars().count(), 5_000);
    assert!(prompt.starts_with("\nYou are looking at a company called: Acme"));
}

#[tokio::test]
async fn failing_sub_page_fetch_propagates() {
    let site = FakeSite::default()
        .page("https://acme.com", "Acme")
        .links("https://acme.com", &["/about"]);
    let composer = BrochureComposer::new(Arc::new(site));
    let model = ScriptedModel::new(ABOUT_ONLY, "unused");

    let err = composer
        .compose("Acme", "https://acme.com", &model, false)
        .await
        .unwrap_err();
    assert!(matches!(err, BrandbookError::Fetch(_)));
}

#[tokio::test]
async fn streamed_and_whole_brochures_match() {
    let composer = BrochureComposer::new(Arc::new(acme()));
    let model = ScriptedModel::new(ABOUT_ONLY, "# Acme\n\nRockets, culture and careers.");

    let whole = composer
        .compose("Acme", "https://acme.com", &model, false)
        .await
        .unwrap()
        .into_text()
        .await
        .unwrap();

    let streamed = composer
        .compose("Acme", "https://acme.com", &model, true)
        .await
        .unwrap();
    assert!(streamed.is_streaming());
    let pieces: Vec<String> = streamed
        .into_stream()
        .map(|f| f.unwrap().delta)
        .collect()
        .await;
    assert_eq!(pieces.concat(), whole);

    let calls = model.calls.lock().unwrap();
    let (messages, json_mode, streaming) = calls.last().unwrap();
    assert!(!*json_mode && *streaming);
    assert!(messages[0].content.contains("short brochure about the company"));
}

#[tokio::test]
async fn end_to_end_against_mock_site_and_openai() {
    let site = MockServer::start().await;
    let home = format!(
        r#"<html><head><title>Acme</title></head><body><h1>Rockets</h1><a href="{0}/about">About</a><a href="{0}/privacy">Privacy</a></body></html>"#,
        site.uri()
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(home, "text/html"))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>About Acme</title></head><body><p>Since 1949</p></body></html>",
            "text/html",
        ))
        .mount(&site)
        .await;

    let llm = MockServer::start().await;
    let links_reply = serde_json::json!({
        "links": [{ "type": "about page", "url": format!("{}/about", site.uri()) }]
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": links_reply } }]
        })))
        .with_priority(1)
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "# Acme brochure" } }]
        })))
        .mount(&llm)
        .await;

    let gateway =
        OpenAiClient::with_base_url(&llm.uri(), "sk-test".into(), "gpt-test".into()).unwrap();
    let fetcher = HttpPageFetcher::new(FetcherConfig::default()).unwrap();
    let composer = BrochureComposer::new(Arc::new(fetcher));

    let brochure = composer
        .compose("Acme", &format!("{}/", site.uri()), &gateway, false)
        .await
        .unwrap()
        .into_text()
        .await
        .unwrap();
    assert_eq!(brochure, "# Acme brochure");

    let requests = llm.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let final_body: serde_json::Value = requests[1].body_json().unwrap();
    let user_prompt = final_body["messages"][1]["content"].as_str().unwrap();
    assert!(user_prompt.contains("## Landing Page:\n\nAcme\n\nRockets"));
    assert!(user_prompt.contains("### Link: about page\nAbout Acme\n\nSince 1949"));
}
