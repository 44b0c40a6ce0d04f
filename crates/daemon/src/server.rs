//! HTTP server lifecycle.
//!
//! Serves a router until the shutdown token is cancelled, then waits at most
//! a bounded grace period for in-flight requests before returning.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::files::ServerRoot;
use crate::network;
use crate::router::{build_router, AppState};
use crate::ui;

/// Start the daemon described by `config` and run until SIGINT or SIGTERM.
///
/// `qrcode_png` additionally writes each advertised URL as a PNG QR code.
pub async fn serve(config: &Config, qrcode_png: Option<&Path>) -> anyhow::Result<()> {
    let root = ServerRoot::new(&config.server.root)
        .with_context(|| format!("Invalid root directory: {}", config.server.root.display()))?
        .with_symlink_check(config.file.verify_symlinks);
    tracing::info!(
        root = %root.path().display(),
        verify_symlinks = root.verifies_symlinks(),
        "sharing directory"
    );

    let state = Arc::new(AppState::new(root, config.file.upload_policy()));
    if let Err(e) = state.transfer.sweep_partial_uploads().await {
        tracing::warn!(error = %e, "Failed to sweep stale partial uploads");
    }

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let bound = listener.local_addr().context("Failed to read listener address")?;

    ui::announce(&advertised_urls(bound), config.advertise.qrcode, qrcode_png);

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    run(listener, build_router(state), shutdown, config.server.shutdown_grace()).await
}

/// URLs clients should use. A wildcard bind is expanded to the interface
/// addresses.
fn advertised_urls(bound: SocketAddr) -> Vec<String> {
    match bound.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => network::local_service_urls(bound.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => network::local_service_urls(bound.port()),
        _ => vec![format!("http://{bound}")],
    }
}

/// Serve `router` on `listener` until `shutdown` is cancelled.
///
/// After cancellation no new connections are accepted. Once `grace` has
/// elapsed `run` stops waiting and returns. Connections still open at that
/// point are not closed here; they end when the runtime shuts down, which
/// `main` does as soon as `serve` returns.
pub async fn run(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    tracing::info!(%addr, "listening");

    let token = shutdown.clone();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move { token.cancelled().await });
    let mut handle = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut handle => {
            return result
                .context("Server task panicked")?
                .context("Server stopped unexpectedly");
        }
        _ = shutdown.cancelled() => {
            tracing::info!(grace_secs = grace.as_secs_f64(), "shutting down");
        }
    }

    match tokio::time::timeout(grace, &mut handle).await {
        Ok(result) => result
            .context("Server task panicked")?
            .context("Server failed during shutdown")?,
        Err(_) => {
            tracing::warn!("Grace period elapsed with requests still in flight");
            handle.abort();
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM.
pub async fn shutdown_signal(token: CancellationToken) {
    wait_for_shutdown_signal().await;
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to register SIGTERM handler");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = wait_for_ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start(
        router: Router,
        grace: Duration,
    ) -> (
        SocketAddr,
        CancellationToken,
        tokio::task::JoinHandle<anyhow::Result<()>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(listener, router, token.clone(), grace));
        (addr, token, handle)
    }

    #[test]
    fn test_advertised_urls_specific_bind() {
        let bound: SocketAddr = "192.168.1.20:9999".parse().unwrap();
        assert_eq!(advertised_urls(bound), vec!["http://192.168.1.20:9999".to_string()]);

        let v6: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(advertised_urls(v6), vec!["http://[::1]:8080".to_string()]);
    }

    #[test]
    fn test_advertised_urls_wildcard_bind() {
        let bound: SocketAddr = "0.0.0.0:9999".parse().unwrap();
        let urls = advertised_urls(bound);
        assert!(!urls.is_empty());
        assert!(urls.iter().all(|u| u.ends_with(":9999")));
    }

    #[tokio::test]
    async fn test_serves_until_cancelled() {
        let router = Router::new().route("/ping", get(|| async { "PONG" }));
        let (addr, token, handle) = start(router, Duration::from_secs(5)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("PONG"));

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_grace_period_bounds_run() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                "late"
            }),
        );
        let (addr, token, handle) = start(router, Duration::from_millis(100)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // `run` returns after the grace period even though /slow never
        // finishes; the connection itself is left to the runtime.
        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run should not wait for the slow request")
            .unwrap();
        assert!(result.is_ok());
    }
}
