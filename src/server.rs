//! HTTP surface: the form page, form submission and a health probe

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;

use crate::model::Predictor;
use crate::predict::{self, PredictForm};
use crate::{render, Result, ServerConfig};

/// Shared, read-only request state
#[derive(Clone, Default)]
pub struct AppState {
    predictor: Option<Arc<Predictor>>,
}

impl AppState {
    pub fn new(predictor: Option<Predictor>) -> Self {
        AppState {
            predictor: predictor.map(Arc::new),
        }
    }

    pub fn predictor(&self) -> Option<&Predictor> {
        self.predictor.as_deref()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict_form))
        .route("/health", get(health))
        .with_state(state)
}

async fn home() -> Html<String> {
    Html(render::page(None))
}

// Failures are reported in the page body; the status is always 200. A body
// that is not a urlencoded form is treated as an empty submission.
async fn predict_form(
    State(state): State<AppState>,
    body: std::result::Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Html<String> {
    let form = match body {
        Ok(Form(pairs)) => PredictForm::from_pairs(pairs),
        Err(rejection) => {
            log::debug!("Unreadable form body: {}", rejection);
            PredictForm::default()
        }
    };

    let outcome = predict::handle(state.predictor(), &form);
    log::debug!("POST /predict -> {}", outcome);
    Html(render::page(Some(&outcome)))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.predictor.is_some(),
    }))
}

/// Bind and serve until Ctrl-C
pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
