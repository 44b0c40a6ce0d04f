//! HTTP routing for the LanShare daemon.
//!
//! Maps each route to the file services. Every file route passes the raw,
//! still percent-encoded request path to [`ServerRoot`] first; a rejected
//! path short-circuits with a fixed 403 before the filesystem is touched.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use protocol::{
    ErrorCode, ErrorResponse, ListResponse, UploadResponse, FILES_ROUTE, HEALTH_BODY,
    HEALTH_ROUTE, LIST_ROUTE, PING_BODY, PING_ROUTE, UPLOAD_FIELD, UPLOAD_ROUTE,
};
use tower_http::trace::TraceLayer;

use crate::files::{
    list_directory, open_download, Download, FileError, FileTransfer, ServerRoot, UploadPolicy,
};

/// Read-only state shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub root: Arc<ServerRoot>,
    pub transfer: FileTransfer,
}

impl AppState {
    pub fn new(root: ServerRoot, policy: UploadPolicy) -> Self {
        let root = Arc::new(root);
        let transfer = FileTransfer::new(root.clone(), policy);
        Self { root, transfer }
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let files_wildcard = format!("{FILES_ROUTE}/{{*path}}");
    let files_slash = format!("{FILES_ROUTE}/");

    Router::new()
        .route(FILES_ROUTE, get(serve_files))
        .route(&files_slash, get(serve_files))
        .route(&files_wildcard, get(serve_files))
        .route(LIST_ROUTE, get(list_root))
        .route(
            UPLOAD_ROUTE,
            post(upload).layer(DefaultBodyLimit::disable()),
        )
        .route(PING_ROUTE, get(ping))
        .route(HEALTH_ROUTE, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /files/{path...}`: file bytes, or the child names of a directory.
async fn serve_files(State(state): State<Arc<AppState>>, uri: Uri) -> Result<Response, ApiError> {
    let requested = uri.path().strip_prefix(FILES_ROUTE).unwrap_or_default();
    let resolved = state.root.resolve_checked(requested).await?;

    match open_download(&resolved).await? {
        Download::Directory(names) => Ok(Json::<ListResponse>(names).into_response()),
        Download::File(file) => {
            let headers = [
                (CONTENT_TYPE, file.content_type.clone()),
                (CONTENT_LENGTH, file.len.to_string()),
            ];
            Ok((headers, Body::from_stream(file.into_stream())).into_response())
        }
    }
}

/// `GET /list`: names at the top of the shared root.
async fn list_root(State(state): State<Arc<AppState>>) -> Result<Json<ListResponse>, ApiError> {
    let root = state.root.resolve("")?;
    let names = list_directory(&root).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list shared root");
        ApiError::internal("failed to list directory")
    })?;
    Ok(Json(names))
}

/// `POST /upload`: store the multipart field `file` under its file name.
async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let Some(name) = field.file_name().map(str::to_owned) else {
            return Err(ApiError::bad_request("upload field has no file name"));
        };

        let stored = state.transfer.store(&name, field).await?;
        return Ok(Json(UploadResponse::stored(stored)));
    }

    Err(ApiError::bad_request(format!(
        "missing multipart field `{UPLOAD_FIELD}`"
    )))
}

async fn ping() -> &'static str {
    PING_BODY
}

async fn health() -> &'static str {
    HEALTH_BODY
}

/// Error response with a JSON [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: ErrorCode,
    message: String,
}

impl ApiError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(code.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Rejected => Self::new(ErrorCode::Forbidden, err.to_string()),
            FileError::PermissionDenied => Self::new(ErrorCode::Forbidden, err.to_string()),
            FileError::NotFound | FileError::NotADirectory => {
                Self::new(ErrorCode::NotFound, FileError::NotFound.to_string())
            }
            FileError::PayloadTooLarge { .. } => {
                Self::new(ErrorCode::PayloadTooLarge, err.to_string())
            }
            FileError::AlreadyExists(_) => Self::new(ErrorCode::Conflict, err.to_string()),
            FileError::InvalidPayload(_) => Self::new(ErrorCode::BadRequest, err.to_string()),
            FileError::Io(e) => {
                tracing::error!(error = %e, "file operation failed");
                Self::internal("internal I/O error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, message = %self.message, "request rejected");
        }

        let body = ErrorResponse::new(self.code, self.message);
        (self.status, Json(body)).into_response()
    }
}
