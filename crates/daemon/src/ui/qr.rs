//! QR Code rendering for service URLs.
//!
//! This module renders the daemon's reachable URLs as QR codes, either for
//! display in the terminal using Unicode block characters or as PNG files.

use std::path::Path;

use image::{ImageBuffer, Luma};
use qrcode::{Color, QrCode};
use serde::{Deserialize, Serialize};

/// QR code module size in pixels for PNG output.
const PNG_MODULE_SIZE: u32 = 8;

/// Quiet zone (border) size in modules.
const QUIET_ZONE: usize = 4;

const FULL_BLOCK: char = '\u{2588}';
const UPPER_HALF: char = '\u{2580}';
const LOWER_HALF: char = '\u{2584}';

/// How the terminal QR code is drawn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum QrStyle {
    /// No terminal QR code.
    #[default]
    #[serde(alias = "false")]
    #[value(alias = "false")]
    Off,
    /// Two characters per module, one module row per line.
    #[serde(alias = "true")]
    #[value(alias = "true")]
    Full,
    /// Half-block characters, two module rows per line.
    Small,
}

impl QrStyle {
    pub fn is_enabled(self) -> bool {
        self != QrStyle::Off
    }
}

/// A QR code as a square grid of dark/light modules, quiet zone included.
struct ModuleGrid {
    size: usize,
    dark: Vec<bool>,
}

impl ModuleGrid {
    fn encode(data: &str) -> anyhow::Result<Self> {
        let code = QrCode::new(data.as_bytes())?;
        let width = code.width();
        let colors = code.to_colors();
        let size = width + 2 * QUIET_ZONE;

        let mut dark = vec![false; size * size];
        for (idx, color) in colors.iter().enumerate() {
            let row = idx / width + QUIET_ZONE;
            let col = idx % width + QUIET_ZONE;
            dark[row * size + col] = *color == Color::Dark;
        }

        Ok(Self { size, dark })
    }

    fn is_dark(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size && self.dark[row * self.size + col]
    }
}

/// Renders `url` as a terminal QR code in the given style.
///
/// Returns an empty string for [`QrStyle::Off`].
///
/// # Errors
/// Returns an error if the data does not fit in a QR code.
pub fn generate_terminal_qr(url: &str, style: QrStyle) -> anyhow::Result<String> {
    match style {
        QrStyle::Off => Ok(String::new()),
        QrStyle::Full => Ok(render_full(&ModuleGrid::encode(url)?)),
        QrStyle::Small => Ok(render_small(&ModuleGrid::encode(url)?)),
    }
}

fn render_full(grid: &ModuleGrid) -> String {
    let mut output = String::new();
    for row in 0..grid.size {
        for col in 0..grid.size {
            if grid.is_dark(row, col) {
                output.push(FULL_BLOCK);
                output.push(FULL_BLOCK);
            } else {
                output.push_str("  ");
            }
        }
        output.push('\n');
    }
    output
}

fn render_small(grid: &ModuleGrid) -> String {
    let mut output = String::new();
    for row in (0..grid.size).step_by(2) {
        for col in 0..grid.size {
            let ch = match (grid.is_dark(row, col), grid.is_dark(row + 1, col)) {
                (true, true) => FULL_BLOCK,
                (true, false) => UPPER_HALF,
                (false, true) => LOWER_HALF,
                (false, false) => ' ',
            };
            output.push(ch);
        }
        output.push('\n');
    }
    output
}

/// Renders `url` as a grayscale PNG image.
pub fn generate_png_qr_image(url: &str) -> anyhow::Result<ImageBuffer<Luma<u8>, Vec<u8>>> {
    let grid = ModuleGrid::encode(url)?;
    let pixels = grid.size as u32 * PNG_MODULE_SIZE;

    let img = ImageBuffer::from_fn(pixels, pixels, |x, y| {
        let row = (y / PNG_MODULE_SIZE) as usize;
        let col = (x / PNG_MODULE_SIZE) as usize;
        if grid.is_dark(row, col) {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });

    Ok(img)
}

/// Renders `url` as a PNG QR code and saves it to `path`.
///
/// # Errors
/// Returns an error if the QR code cannot be generated or saved.
pub fn generate_png_qr(url: &str, path: &Path) -> anyhow::Result<()> {
    generate_png_qr_image(url)?.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
