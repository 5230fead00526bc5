//! # hint-site
//!
//! Build-time content tooling for the HINT single-page site: a markdown
//! indexer and a static prerenderer that gives every article its own HTML
//! file with link-preview metadata.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Index      src/content/blog/*.md       →  src/blogData.json
//!               public/content/series/*/    →  public/content/series/index.json
//! 2. Prerender  dist/index.html + indices   →  dist/{prefix}/{slug}/index.html
//! ```
//!
//! A side step, `cards`, rasterizes SVG share cards to PNG for scrapers that
//! cannot render SVG.
//!
//! The JSON index is the contract between the stages and is also consumed by
//! the client app at runtime. Each stage can be run alone; `build` chains them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`index`] | Stage 1: walks a collection, resolves metadata, writes the JSON index |
//! | [`prerender`] | Stage 2: renders one page per index entry from the SPA shell |
//! | [`cards`] | SVG share card → 1200×630 PNG rasterization (resvg) |
//! | [`frontmatter`] | `---` delimited `key: value` header parser |
//! | [`types`] | `ContentEntry`, the serialized index record, and localized strings |
//! | [`image`] | Share image lookup: entry, then part, then collection default |
//! | [`frame`] | `fc:frame` embed JSON plus Open Graph and Twitter tags (Maud) |
//! | [`rewrite`] | Root-relative asset path rewriting and `<head>` injection |
//! | [`config`] | `site.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting for both stages |
//!
//! # Design Decisions
//!
//! ## Stateless Between Runs
//!
//! Every run regenerates its outputs from scratch. Pages are always rendered
//! from the pristine shell, never from a previous page, so rewritten paths
//! cannot compound.
//!
//! ## Dates Never Block a Build
//!
//! A missing or unparsable `date` defaults to the time the run started and is
//! reported. `strict_dates = true` turns the fallback into an error.
//!
//! ## Text-Level Shell Rewriting
//!
//! The shell is a build artifact with a known shape, so asset rewriting is a
//! regex over `src="/` and `href="/` and meta tags are spliced before
//! `</head>`. The tags themselves are built with Maud, which escapes every
//! attribute value including the frame JSON.

pub mod cards;
pub mod config;
pub mod frame;
pub mod frontmatter;
pub mod image;
pub mod index;
pub mod output;
pub mod prerender;
pub mod rewrite;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
