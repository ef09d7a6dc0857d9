//! HTTP surface: URL lookup, streamed brochure generation and session
//! management.

use crate::tether::{Session, Tether};
use axum::{
    Form, Json, Router,
    extract::State,
    response::{
        IntoResponse, Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use brandbook_common::ProviderKind;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MODEL_NOT_INITIALIZED: &str = "Model not initialized";

#[derive(Clone)]
pub struct AppState {
    tether: Arc<Tether>,
    session: Arc<RwLock<Option<Session>>>,
}

impl AppState {
    pub fn new(tether: Arc<Tether>, session: Option<Session>) -> Self {
        Self {
            tether,
            session: Arc::new(RwLock::new(session)),
        }
    }

    /// Copy of the active session; later `set-model` calls do not affect it.
    async fn snapshot(&self) -> Option<Session> {
        self.session.read().await.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/find-url", post(find_url))
        .route("/api/generate-brochure", post(generate_brochure))
        .route("/api/set-model", post(set_model))
        .route("/api/model-status", get(model_status))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("API server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct FindUrlForm {
    company_name: String,
}

async fn find_url(State(state): State<AppState>, Form(form): Form<FindUrlForm>) -> Json<Value> {
    let Some(session) = state.snapshot().await else {
        return Json(json!({ "success": false, "error": MODEL_NOT_INITIALIZED }));
    };
    match state
        .tether
        .resolver
        .resolve(&form.company_name, session.gateway.as_ref())
        .await
    {
        Some(url) => Json(json!({ "success": true, "url": url })),
        None => Json(json!({ "success": false, "error": "Could not find URL" })),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateForm {
    company_name: String,
    website_url: String,
}

fn data_event(payload: Value) -> Result<Event, Infallible> {
    Ok(Event::default().data(payload.to_string()))
}

async fn generate_brochure(
    State(state): State<AppState>,
    Form(form): Form<GenerateForm>,
) -> impl IntoResponse {
    let session = state.snapshot().await;
    let tether = state.tether.clone();

    let events = async_stream::stream! {
        let Some(session) = session else {
            yield data_event(json!({ "error": MODEL_NOT_INITIALIZED }));
            return;
        };

        let response = tether
            .composer
            .compose(&form.company_name, &form.website_url, session.gateway.as_ref(), true)
            .await;
        let mut fragments = match response {
            Ok(response) => response.into_stream(),
            Err(e) => {
                tracing::warn!(company = %form.company_name, error = %e, "brochure generation failed");
                yield data_event(json!({ "error": e.to_string() }));
                return;
            }
        };

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) if fragment.delta.is_empty() => {}
                Ok(fragment) => {
                    yield data_event(json!({ "content": fragment.delta }));
                }
                Err(e) => {
                    tracing::warn!(company = %form.company_name, error = %e, "brochure stream failed");
                    yield data_event(json!({ "error": e.to_string() }));
                    return;
                }
            }
        }
        yield data_event(json!({ "done": true }));
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct SetModelForm {
    provider: String,
    #[serde(default)]
    model_name: Option<String>,
}

async fn set_model(State(state): State<AppState>, Form(form): Form<SetModelForm>) -> Json<Value> {
    let session = match form.provider.parse::<ProviderKind>() {
        Ok(kind) => {
            state
                .tether
                .connect(Some(kind), form.model_name.as_deref())
                .await
        }
        Err(e) => Err(e),
    };

    match session {
        Ok(session) => {
            tracing::info!(provider = %session.provider, model = %session.model, "model session changed");
            let body = json!({
                "success": true,
                "provider": session.provider,
                "model": session.model,
            });
            *state.session.write().await = Some(session);
            Json(body)
        }
        Err(e) => Json(json!({ "success": false, "error": e.to_string() })),
    }
}

async fn model_status(State(state): State<AppState>) -> Json<Value> {
    match state.snapshot().await {
        Some(session) => Json(json!({
            "initialized": true,
            "provider": session.provider,
            "model": session.model,
        })),
        None => Json(json!({ "initialized": false })),
    }
}
