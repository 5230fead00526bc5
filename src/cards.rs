//! Share card rasterization.
//!
//! Link-preview scrapers do not render SVG, so card artwork kept as SVG is
//! rasterized to a PNG of the configured size (1200×630 by default) written
//! next to its source:
//!
//! ```text
//! public/images/episode-2-card.svg  →  public/images/episode-2-card.png
//! ```
//!
//! The artwork is scaled to cover the canvas and centered; overflow on the
//! longer axis is cropped. Text is drawn with system fonts.
//!
//! Cards are independent, so they are rendered in parallel with rayon, the
//! same way [`crate::prerender`] writes pages.

use crate::config::{CardsConfig, ErrorPolicy, SiteConfig};
use log::{info, warn};
use rayon::prelude::*;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Card source not found: {0}")]
    NotFound(PathBuf),
    #[error("Invalid SVG {path}: {source}")]
    Svg { path: PathBuf, source: usvg::Error },
    #[error("Cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

/// A card that was written.
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// A card left out under `on_error = "skip"`.
#[derive(Debug, Clone)]
pub struct SkippedCard {
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CardReport {
    pub width: u32,
    pub height: u32,
    /// In configured order.
    pub cards: Vec<RenderedCard>,
    pub skipped: Vec<SkippedCard>,
}

/// PNG path for an SVG card: same directory and stem.
pub fn output_path(source: &Path) -> PathBuf {
    source.with_extension("png")
}

/// Font database with the fonts installed on this machine.
pub fn system_fonts() -> Arc<fontdb::Database> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
}

/// Scale-to-cover transform for an `svg_w`×`svg_h` drawing on a
/// `width`×`height` canvas, centered.
fn cover_transform(svg_w: f32, svg_h: f32, width: u32, height: u32) -> Transform {
    let (w, h) = (width as f32, height as f32);
    let scale = (w / svg_w).max(h / svg_h);
    let tx = (w - svg_w * scale) / 2.0;
    let ty = (h - svg_h * scale) / 2.0;
    Transform::from_row(scale, 0.0, 0.0, scale, tx, ty)
}

/// Rasterize SVG bytes to PNG bytes. `path` is only used in errors.
pub fn rasterize(
    path: &Path,
    svg: &[u8],
    width: u32,
    height: u32,
    fonts: &Arc<fontdb::Database>,
) -> Result<Vec<u8>, CardError> {
    let options = usvg::Options {
        fontdb: Arc::clone(fonts),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_data(svg, &options).map_err(|source| CardError::Svg {
        path: path.to_path_buf(),
        source,
    })?;
    let mut pixmap = Pixmap::new(width, height).ok_or(CardError::Canvas { width, height })?;
    let size = tree.size();
    let transform = cover_transform(size.width(), size.height(), width, height);
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|e| CardError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn render_card(
    source: &Path,
    cards: &CardsConfig,
    fonts: &Arc<fontdb::Database>,
) -> Result<RenderedCard, CardError> {
    if !source.is_file() {
        return Err(CardError::NotFound(source.to_path_buf()));
    }
    let svg = fs::read(source)?;
    let png = rasterize(source, &svg, cards.width, cards.height, fonts)?;
    let output = output_path(source);
    fs::write(&output, png)?;
    info!("Rendered card {}", output.display());
    Ok(RenderedCard {
        source: source.to_path_buf(),
        output,
    })
}

/// Rasterize every configured card, honoring `on_error`.
pub fn render_cards(root: &Path, site: &SiteConfig) -> Result<CardReport, CardError> {
    let cards = &site.cards;
    let mut report = CardReport {
        width: cards.width,
        height: cards.height,
        ..CardReport::default()
    };
    if cards.files.is_empty() {
        return Ok(report);
    }

    let fonts = system_fonts();
    let sources: Vec<PathBuf> = cards.files.iter().map(|f| root.join(f)).collect();
    let results: Vec<Result<RenderedCard, CardError>> = sources
        .par_iter()
        .map(|source| render_card(source, cards, &fonts))
        .collect();

    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(card) => report.cards.push(card),
            Err(e) if site.build.on_error == ErrorPolicy::Skip => {
                warn!("skipping card {}: {e}", source.display());
                report.skipped.push(SkippedCard {
                    source: source.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}
