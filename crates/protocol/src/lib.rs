//! # LanShare Protocol Library
//!
//! Wire types shared by the LanShare daemon and anything talking to it over
//! HTTP: JSON response bodies, error codes and the route table.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{ErrorCode, ErrorResponse, UploadResponse};
//!
//! let ok = UploadResponse::stored("photo.jpg");
//! assert_eq!(ok.filename, "photo.jpg");
//!
//! let err = ErrorResponse::new(ErrorCode::Forbidden, "path rejected");
//! assert_eq!(err.code.status(), 403);
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Response bodies and route constants

pub mod messages;

pub use messages::{
    ErrorCode, ErrorResponse, ListResponse, UploadResponse, FILES_ROUTE, HEALTH_BODY,
    HEALTH_ROUTE, LIST_ROUTE, PING_BODY, PING_ROUTE, UPLOAD_FIELD, UPLOAD_ROUTE,
};
