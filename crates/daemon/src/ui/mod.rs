//! Startup output for the LanShare daemon.
//!
//! Announces the URLs the server can be reached at, optionally as terminal
//! QR codes or PNG files. Nothing here is fatal: rendering failures are
//! logged and the server keeps starting.

pub mod qr;

use std::path::{Path, PathBuf};

pub use qr::{generate_png_qr, generate_png_qr_image, generate_terminal_qr, QrStyle};

/// Log every URL and render QR output for it as configured.
pub fn announce(urls: &[String], style: QrStyle, png_path: Option<&Path>) {
    for (index, url) in urls.iter().enumerate() {
        tracing::info!(url = %url, "serving");

        if style.is_enabled() {
            match generate_terminal_qr(url, style) {
                Ok(qr) => println!("{url}\n{qr}"),
                Err(e) => tracing::warn!(url = %url, error = %e, "Failed to render QR code"),
            }
        }

        if let Some(base) = png_path {
            let path = numbered_path(base, index, urls.len());
            match generate_png_qr(url, &path) {
                Ok(()) => tracing::info!(path = %path.display(), url = %url, "QR code written"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to write QR code"),
            }
        }
    }
}

/// `qr.png` stays as is for a single URL and becomes `qr-1.png`, `qr-2.png`,
/// ... when there are several.
pub fn numbered_path(base: &Path, index: usize, count: usize) -> PathBuf {
    if count <= 1 {
        return base.to_path_buf();
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "qr".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{stem}-{}.{}", index + 1, ext.to_string_lossy()),
        None => format!("{stem}-{}", index + 1),
    };
    base.with_file_name(name)
}
