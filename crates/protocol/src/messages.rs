//! HTTP message definitions for LanShare.
//!
//! This module defines the JSON bodies exchanged between the daemon and its
//! clients, plus the route paths the daemon serves.

use serde::{Deserialize, Serialize};

/// Route serving file bytes (or a directory listing) under the shared root.
pub const FILES_ROUTE: &str = "/files";

/// Route listing the top level of the shared root.
pub const LIST_ROUTE: &str = "/list";

/// Route accepting multipart uploads.
pub const UPLOAD_ROUTE: &str = "/upload";

/// Liveness check route.
pub const PING_ROUTE: &str = "/ping";

/// Health check route.
pub const HEALTH_ROUTE: &str = "/health";

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Body of the liveness check.
pub const PING_BODY: &str = "PONG";

/// Body of the health check.
pub const HEALTH_BODY: &str = "OK";

/// Directory listing: names of the immediate children, no metadata.
pub type ListResponse = Vec<String>;

/// Successful upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human readable status message.
    pub message: String,
    /// Name the file was stored under, relative to the shared root.
    pub filename: String,
}

impl UploadResponse {
    /// Create the response for a stored file.
    pub fn stored(filename: impl Into<String>) -> Self {
        Self {
            message: "file uploaded successfully".to_string(),
            filename: filename.into(),
        }
    }
}

/// Machine readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request was malformed.
    BadRequest,
    /// The requested path escapes the shared root.
    Forbidden,
    /// The target does not exist.
    NotFound,
    /// The target exists and may not be replaced.
    Conflict,
    /// The upload exceeded the configured size limit.
    PayloadTooLarge,
    /// The server failed to complete the operation.
    InternalError,
}

impl ErrorCode {
    /// HTTP status code conventionally paired with this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::PayloadTooLarge => 413,
            Self::InternalError => 500,
        }
    }
}

/// Error body returned by every failing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category.
    pub code: ErrorCode,
    /// Human readable description. Never contains server-side absolute paths.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error body.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
