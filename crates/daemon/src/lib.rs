//! # LanShare Daemon Library
//!
//! This crate shares a single directory over HTTP on the local network.
//!
//! ## Overview
//!
//! - **Path Resolution**: Every client path is resolved lexically against the
//!   shared root and rejected if it would escape it
//! - **File Operations**: Flat directory listings, streaming downloads and
//!   size-limited uploads with atomic rename
//! - **HTTP Routing**: axum routes for files, listing, upload and health checks
//! - **Address Advertisement**: Reachable URLs logged at startup, optionally
//!   rendered as QR codes
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Router                            │
//! │   /files/*   /list   /upload   /ping   /health           │
//! ├──────────────────────────────────────────────────────────┤
//! │                     ServerRoot                           │
//! │          (decode once, normalize, contain)               │
//! ├───────────────────────────┬──────────────────────────────┤
//! │    Directory listing      │      File transfer           │
//! └───────────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use daemon::files::{ServerRoot, UploadPolicy};
//! use daemon::router::{build_router, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let root = ServerRoot::new("/srv/share")?;
//!     let state = Arc::new(AppState::new(root, UploadPolicy::default()));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:9999").await?;
//!     axum::serve(listener, build_router(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`files`]: Path resolution, listing and transfers
//! - [`router`]: HTTP routes and error responses
//! - [`server`]: Listener lifecycle and graceful shutdown
//! - [`network`]: Reachable address discovery
//! - [`ui`]: QR code rendering and startup output
//! - [`logging`]: Tracing subscriber setup

pub mod config;
pub mod files;
pub mod logging;
pub mod network;
pub mod router;
pub mod server;
pub mod ui;

pub use config::Config;
pub use files::{FileError, FileTransfer, ResolvedPath, ServerRoot, UploadPolicy};
pub use router::{build_router, ApiError, AppState};
