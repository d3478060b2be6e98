//! REST API Server for the CFO copilot
//!
//! Exposes question answering and the PDF snapshot over HTTP. The server
//! holds one immutable data context loaded at startup; a request may bring
//! its own CSV text instead.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::agent::Copilot;
use crate::config::ColumnConfig;
use crate::context::DataContext;
use crate::error::CopilotError;
use crate::loader::RawInputs;
use crate::models::Period;

/// =============================
/// Request Models
/// =============================

/// Inline CSV text for the four inputs, the upload path
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InlineData {
    pub actuals: String,
    pub budget: String,
    pub fx: String,
    pub cash: String,
    #[serde(default)]
    pub columns: ColumnConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AskRequest {
    pub question: String,
    pub data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub period: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub copilot: Arc<Copilot>,
    pub context: Arc<DataContext>,
}

fn error_status(e: &CopilotError) -> StatusCode {
    if e.is_data_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        match e {
            CopilotError::UnknownIntent(_) => StatusCode::OK,
            CopilotError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "data": state.context.summary(),
    }))
}

/// =============================
/// Ask Endpoint
/// =============================

async fn ask(
    State(state): State<ApiState>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(question = %req.question, inline_data = req.data.is_some(), "Received question");

    let uploaded;
    let ctx: &DataContext = match &req.data {
        Some(data) => {
            let inputs = RawInputs::from_text(&data.actuals, &data.budget, &data.fx, &data.cash);
            match DataContext::load(&inputs, &data.columns) {
                Ok(ctx) => {
                    uploaded = ctx;
                    &uploaded
                }
                Err(e) => {
                    warn!(error = %e, "Uploaded data rejected");
                    return (error_status(&e), Json(ApiResponse::error(e.user_message())));
                }
            }
        }
        None => state.context.as_ref(),
    };

    let answer = match state.copilot.try_answer(ctx, &req.question) {
        Ok(answer) => answer,
        Err(e) => {
            let fallback = state.copilot.error_answer(ctx, &req.question, &e);
            let body = ApiResponse::error(fallback.text.clone())
                .with_data(serde_json::to_value(&fallback).unwrap_or_default());
            return (error_status(&e), Json(body));
        }
    };

    let chart_spec = match state.copilot.render_chart(&answer) {
        Ok(spec) => spec,
        Err(e) => {
            warn!(error = %e, "Chart rendering failed");
            None
        }
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "answer": answer,
            "chart_spec": chart_spec,
            "renderer": state.copilot.renderer_name(),
        }))),
    )
}

/// =============================
/// Export Endpoint
/// =============================

async fn export_pdf(State(state): State<ApiState>, Query(query): Query<ExportQuery>) -> Response {
    let period = match query.period.as_deref().map(str::parse::<Period>).transpose() {
        Ok(period) => period,
        Err(e) => {
            return (error_status(&e), Json(ApiResponse::error(e.user_message()))).into_response();
        }
    };

    match state.copilot.snapshot_pdf(&state.context, period) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"cfo_snapshot.pdf\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Snapshot export failed");
            (error_status(&e), Json(ApiResponse::error(e.user_message()))).into_response()
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(copilot: Arc<Copilot>, context: Arc<DataContext>) -> Router {
    let state = ApiState { copilot, context };

    Router::new()
        .route("/health", get(health))
        .route("/api/ask", post(ask))
        .route("/api/export", get(export_pdf))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    copilot: Arc<Copilot>,
    context: Arc<DataContext>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(copilot, context);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
