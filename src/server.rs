//! HTTP surface of the documentation service.
//!
//! Routes (all JSON):
//! - `POST /api/docs/generate`: multipart upload with a `projectZip` field
//! - `GET  /api/docs/markdown/:filename`: stored markdown document
//! - `GET  /api/docs/download/:filename`: render to PDF, publish, return URL
//! - `GET  /health`
//!
//! When renderings are published to a local directory, that directory is
//! served under `/files`.

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::contract::{DocEntry, GenerationReport};
use crate::error::ZenError;
use crate::load_config::StorageConfig;
use crate::publish::Publisher;
use crate::workflow::Workflow;

/// Multipart field carrying the zipped project.
pub const UPLOAD_FIELD: &str = "projectZip";

const BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub publisher: Arc<Publisher>,
}

/// Error returned by handlers, carrying whether internals may be shown.
#[derive(Debug)]
pub struct ApiError {
    error: ZenError,
    expose_details: bool,
}

impl ApiError {
    fn new(error: ZenError, state: &AppState) -> Self {
        Self {
            error,
            expose_details: !state.workflow.config().environment.is_production(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = &self.error;
        let (status, message) = match err {
            ZenError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "Documentation file not found".to_string(),
            ),
            ZenError::MissingConfig(name) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Missing required configuration: {name}"),
            ),
            e if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected error occurred".to_string(),
            ),
        };

        let mut body = json!({ "message": message });
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            body["error"] = json!(err.to_string());
            if self.expose_details {
                body["stack"] = json!(error_chain(err));
            }
        }
        (status, Json(body)).into_response()
    }
}

/// Debug rendering of the error followed by its `source()` chain.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    out
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileResult {
    file: String,
    full_path: String,
    has_documentation: bool,
    summary: String,
}

impl From<&DocEntry> for FileResult {
    fn from(e: &DocEntry) -> Self {
        Self {
            file: e.file_name.clone(),
            full_path: e.full_path.clone(),
            has_documentation: e.is_success(),
            summary: e.summary.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    message: &'static str,
    document: String,
    processed_files: usize,
    successful_files: usize,
    documentation: String,
    files: Vec<FileResult>,
}

impl From<GenerationReport> for GenerateResponse {
    fn from(report: GenerationReport) -> Self {
        Self {
            message: "Documentation generated successfully",
            processed_files: report.processed_files(),
            successful_files: report.successful_files(),
            files: report.entries.iter().map(FileResult::from).collect(),
            document: report.document,
            documentation: report.documentation,
        }
    }
}

async fn generate_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    info!("Starting documentation generation request");
    let mut upload = None;
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            ApiError::new(ZenError::InvalidInput(format!("malformed upload: {e}")), &state)
        })?;
        let Some(field) = field else { break };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.zip").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            ApiError::new(ZenError::InvalidInput(format!("malformed upload: {e}")), &state)
        })?;
        upload = Some((name, bytes));
        break;
    }

    let Some((name, bytes)) = upload else {
        return Err(ApiError::new(
            ZenError::InvalidInput("No file uploaded".into()),
            &state,
        ));
    };

    let report = state
        .workflow
        .generate_from_upload(&name, &bytes)
        .await
        .map_err(|e| ApiError::new(e, &state))?;
    Ok(Json(report.into()))
}

async fn markdown_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let content = state
        .workflow
        .documents()
        .load(&filename)
        .await
        .map_err(|e| ApiError::new(e, &state))?;
    Ok(Json(json!({
        "message": "Documentation retrieved successfully",
        "filename": filename,
        "content": content,
        "contentType": "markdown",
    })))
}

async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let content = state
        .workflow
        .documents()
        .load(&filename)
        .await
        .map_err(|e| ApiError::new(e, &state))?;
    let url = state
        .publisher
        .render_and_publish(&content)
        .await
        .map_err(|e| ApiError::new(e, &state))?;
    Ok(Json(json!({
        "message": "PDF generated successfully",
        "filename": filename,
        "url": url,
    })))
}

async fn health() -> &'static str {
    "ok"
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let config = state.workflow.config();
    let cors = match HeaderValue::from_str(&config.allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(tower_http::cors::Any),
        Err(e) => {
            error!(
                error = %e,
                origin = %config.allowed_origin,
                "Invalid CORS origin, cross-origin calls disabled"
            );
            CorsLayer::new()
        }
    };

    let mut app = Router::new()
        .route("/api/docs/generate", post(generate_handler))
        .route("/api/docs/markdown/:filename", get(markdown_handler))
        .route("/api/docs/download/:filename", get(download_handler))
        .route("/health", get(health));
    if let StorageConfig::Local { dir, .. } = &config.storage {
        app = app.nest_service("/files", ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to the configured port and serves until Ctrl-C.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let port = state.workflow.config().port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "Server running");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = ?e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await
}
