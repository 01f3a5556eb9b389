//! API routes for deskhelperd

use crate::opener::resolve_folder;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

type AppStateArc = Arc<AppState>;

/// Body of a folder-open request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenFolderRequest {
    #[serde(default)]
    pub folder_path: Option<String>,
}

/// `{"status": "success"}` or `{"status": "error", "message": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============================================================================
// Folder Routes
// ============================================================================

pub fn folder_routes(paths: &[String]) -> Router<AppStateArc> {
    paths
        .iter()
        .fold(Router::new(), |router, path| {
            router.route(path.as_str(), post(open_folder))
        })
}

async fn open_folder(
    State(state): State<AppStateArc>,
    payload: Result<Json<OpenFolderRequest>, JsonRejection>,
) -> (StatusCode, Json<StatusResponse>) {
    let requested = match payload {
        Ok(Json(req)) => req.folder_path,
        Err(rejection) => {
            warn!("Rejected folder request body: {}", rejection);
            None
        }
    };
    info!(folder_path = ?requested, "Folder open requested");

    let Some(path) = resolve_folder(requested.as_deref()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(StatusResponse::error("Invalid path")),
        );
    };

    let opener = state.opener.clone();
    let target = path.clone();
    let result = tokio::task::spawn_blocking(move || opener.open(&target)).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, Json(StatusResponse::success())),
        Ok(Err(e)) => {
            error!(path = %path.display(), "Failed to open folder: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error(e.to_string())),
            )
        }
        Err(e) => {
            error!(path = %path.display(), "Folder opener task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error(e.to_string())),
            )
        }
    }
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
