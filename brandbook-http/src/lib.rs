//! Minimal HTTP client with safe logging and flexible auth.
//!
//! - Request options: headers, `Auth`, query params, timeout
//! - JSON, text, form and byte-stream helpers over one request path
//! - Redacts sensitive query params and never logs secret values
//! - Optional *raw* request/response logging via `BRANDBOOK_HTTP_RAW=1`
//! - [`sse`] decodes `text/event-stream` bodies into events
//!
//! Requests are attempted exactly once; callers decide what a failure means.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), brandbook_http::HttpError> {
//! let client = brandbook_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", brandbook_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind (bearer/header/query/none), not the secret.

pub mod sse;

pub use reqwest::StatusCode;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "BRANDBOOK_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

const SECRET_QUERY_KEYS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_key(name: &str) -> bool {
    SECRET_QUERY_KEYS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(name))
}

fn is_secret_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("x-api-key")
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in headers.iter() {
        let v = if is_secret_header(name.as_str()) {
            "<redacted>".to_string()
        } else {
            val.to_str().unwrap_or("").to_string()
        };
        parts.push(format!(
            "-H '{}: {}'",
            name.as_str(),
            v.replace('\'', r"'\''")
        ));
    }
    if let Some(bytes) = body {
        if let Ok(s) = std::str::from_utf8(bytes) {
            let mut s = s.to_string();
            if s.len() > RAW_MAX_BODY {
                s.truncate(floor_char_boundary(&s, RAW_MAX_BODY));
                s.push('…');
            }
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    let mut shown = url.clone();
    let redacted: Vec<(String, String)> = redact_query(url).1;
    if !redacted.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(redacted);
    }
    parts.push(format!("'{}'", shown.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for API errors, `None` for transport-level failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Chunked response body, consumed once.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use brandbook_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header (e.g., Anthropic: x-api-key)
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    /// Auth via query param (e.g., Gemini: key=...)
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
    None,
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::Query { .. } => "query",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use brandbook_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     auth: Some(Auth::Query {
///         name: "key",
///         value: Cow::Borrowed("demo"),
///     }),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.allow_absolute == false);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>, // e.g. [("q", "term".into())]
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

enum Payload<'a> {
    Empty,
    Json(Vec<u8>),
    Form(&'a [(&'a str, &'a str)]),
}

impl Payload<'_> {
    fn is_some(&self) -> bool {
        !matches!(self, Payload::Empty)
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use brandbook_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(60));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::build(base, None)
    }

    /// Same as [`HttpClient::new`] but every request carries `user_agent`.
    pub fn with_user_agent(base: &str, user_agent: &str) -> Result<Self, HttpError> {
        Self::build(base, Some(user_agent))
    }

    /// Client without a usable base; callers pass absolute URLs with
    /// `allow_absolute` set.
    pub fn unanchored(user_agent: &str) -> Result<Self, HttpError> {
        Self::build("about:blank", Some(user_agent))
    }

    fn build(base: &str, user_agent: Option<&str>) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5));
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua);
        }
        let inner = builder
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(60),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use brandbook_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET JSON with per-request options (headers/query/auth/timeout).
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let resp = self.send(Method::GET, path, Payload::Empty, opts).await?;
        decode_json(resp).await
    }

    /// POST JSON with per-request options (headers/query/auth/timeout).
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = Payload::Json(encode_json(body)?);
        let resp = self.send(Method::POST, path, payload, opts).await?;
        decode_json(resp).await
    }

    /// GET a body as text (HTML pages, plain responses).
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        let resp = self.send(Method::GET, path, Payload::Empty, opts).await?;
        read_text(resp).await
    }

    /// POST an url-encoded form and return the body as text.
    pub async fn post_form_text(
        &self,
        path: &str,
        form: &[(&str, &str)],
        opts: RequestOpts<'_>,
    ) -> Result<String, HttpError> {
        let resp = self.send(Method::POST, path, Payload::Form(form), opts).await?;
        read_text(resp).await
    }

    /// POST JSON and hand back the response body as a chunk stream.
    ///
    /// Non-success statuses are reported before any chunk is produced.
    pub async fn post_stream<B>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<ByteStream, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let payload = Payload::Json(encode_json(body)?);
        let resp = self.send(Method::POST, path, payload, opts).await?;
        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| HttpError::Network(e.to_string())));
        Ok(Box::pin(stream))
    }

    // ==============================
    // Core request implementation
    // ==============================

    fn resolve_url(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    fn prepare(
        &self,
        method: &Method,
        url: &Url,
        payload: &Payload<'_>,
        opts: &RequestOpts<'_>,
    ) -> Result<RequestBuilder, HttpError> {
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(opts.timeout.unwrap_or(self.default_timeout));

        let mut query: Vec<(&str, &str)> = opts
            .query
            .as_ref()
            .map(|q| q.iter().map(|(k, v)| (*k, v.as_ref())).collect())
            .unwrap_or_default();

        match payload {
            Payload::Empty => {}
            Payload::Json(bytes) => {
                rb = rb
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes.clone());
            }
            Payload::Form(pairs) => {
                rb = rb.form(pairs);
            }
        }

        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        match &opts.auth {
            Some(Auth::Bearer(tok)) => {
                rb = rb.bearer_auth(sanitize_api_key(tok)?);
            }
            Some(Auth::Header { name, value }) => {
                rb = rb.header(name, value);
            }
            Some(Auth::Query { name, value }) => {
                query.push((*name, value.as_ref()));
            }
            Some(Auth::None) | None => {}
        }

        if !query.is_empty() {
            rb = rb.query(&query);
        }
        Ok(rb)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Payload<'_>,
        opts: RequestOpts<'_>,
    ) -> Result<Response, HttpError> {
        let url = self.resolve_url(path, opts.allow_absolute)?;
        let rb = self.prepare(&method, &url, &payload, &opts)?;

        let req_id = format!("r{}", uuid::Uuid::new_v4().simple());
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let redacted_q: Vec<(String, String)> = opts
            .query
            .as_ref()
            .map(|q| {
                q.iter()
                    .map(|(k, v)| {
                        let shown = if is_secret_key(k) {
                            "<redacted>".to_string()
                        } else {
                            v.as_ref().to_string()
                        };
                        ((*k).to_string(), shown)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            query=?redacted_q,
            timeout_ms=timeout.as_millis() as u64,
            auth_kind,
            has_body=%payload.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let merged = opts.headers.clone().unwrap_or_default();
            let body = match &payload {
                Payload::Json(bytes) => Some(bytes.as_slice()),
                _ => None,
            };
            let curl = make_curl(&method, &url, &merged, body);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            if err.is_timeout() {
                HttpError::Timeout(message)
            } else {
                HttpError::Network(message)
            }
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let req_hdr_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("request-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=t0.elapsed().as_millis() as u64,
            content_length=?resp.content_length(),
            x_request_id=%req_hdr_id,
            "http.response.headers"
        );

        if raw_enabled() {
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                headers=?redact_headers(&headers),
                "response"
            );
        }

        if status.is_success() {
            return Ok(resp);
        }

        let bytes = resp.bytes().await.unwrap_or_default();
        let message = extract_error_message(&bytes);
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%message,
            x_request_id=%req_hdr_id,
            body_snippet=%snip_body(&bytes),
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            request_id: req_hdr_id,
        })
    }
}

// ==============================
// Helpers
// ==============================

fn encode_json<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, HttpError> {
    serde_json::to_vec(body).map_err(|e| HttpError::Build(format!("json body: {e}")))
}

async fn read_bytes(resp: Response) -> Result<Bytes, HttpError> {
    resp.bytes().await.map_err(|e| {
        if e.is_timeout() {
            HttpError::Timeout(e.to_string())
        } else {
            HttpError::Network(e.to_string())
        }
    })
}

async fn read_text(resp: Response) -> Result<String, HttpError> {
    let bytes = read_bytes(resp).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, HttpError> {
    let bytes = read_bytes(resp).await?;
    serde_json::from_slice::<T>(&bytes).map_err(|e| {
        let snippet = snip_body(&bytes);
        tracing::warn!(
            serde_line=%e.line(),
            serde_col=%e.column(),
            serde_err=%e.to_string(),
            body_snippet=%snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

fn extract_error_message(body: &[u8]) -> String {
    // OpenAI, Anthropic and Gemini: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Envelope>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut idx = max.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        snip.truncate(floor_char_boundary(&snip, 500));
        snip.push_str("...");
    }
    snip
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_key(&k) {
                "<redacted>".into()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}
