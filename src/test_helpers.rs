//! Shared test utilities for the hint-site test suite.
//!
//! Builders for markdown sources, SPA shells, and index entries, plus small
//! extractors for asserting on generated HTML.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_post(tmp.path(), "hello", "2024-01-01");
//! let index = index_collection(tmp.path(), &options(Layout::Flat)).unwrap();
//! assert_eq!(slugs(&index.entries), vec!["hello"]);
//! ```

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;

use crate::config::{ErrorPolicy, Layout};
use crate::index::IndexOptions;
use crate::types::{ContentEntry, DEFAULT_AUTHOR, DEFAULT_CATEGORY, DEFAULT_READ_TIME};

// =========================================================================
// Source builders
// =========================================================================

/// Fixed "build time" so defaulted dates are predictable.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

/// Index options with `on_error = abort`, lenient dates, content included.
pub fn options(layout: Layout) -> IndexOptions {
    IndexOptions {
        layout,
        include_content: true,
        default_language: "en".to_string(),
        strict_dates: false,
        on_error: ErrorPolicy::Abort,
        now: fixed_now(),
    }
}

/// Write `contents` to `dir/rel`, creating parent directories.
pub fn write_md(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Write `dir/{slug}.md` with a title and date.
pub fn write_post(dir: &Path, slug: &str, date: &str) {
    write_md(
        dir,
        &format!("{slug}.md"),
        &format!("---\ntitle: {slug}\ndate: {date}\n---\nBody of {slug}.\n"),
    );
}

/// Minimal built SPA shell with root-relative asset references.
pub const SHELL: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <link rel="icon" href="/favicon.ico" />
    <title>HINT</title>
    <script type="module" crossorigin src="/assets/index-3f2a.js"></script>
    <link rel="stylesheet" crossorigin href="/assets/index-9c1d.css">
  </head>
  <body>
    <div id="root"></div>
    <a href="https://example.com/">external</a>
  </body>
</html>
"#;

/// An index entry with defaults for everything but slug, title, and date.
pub fn entry(slug: &str, title: &str, date: &str) -> ContentEntry {
    ContentEntry {
        slug: slug.to_string(),
        title: title.into(),
        date: date.to_string(),
        category: DEFAULT_CATEGORY.to_string(),
        author: DEFAULT_AUTHOR.to_string(),
        author_role: String::new(),
        read_time: DEFAULT_READ_TIME.to_string(),
        excerpt: format!("About {title}").into(),
        content: None,
        cover_image: None,
        part: None,
        languages: vec![],
        default_language: None,
    }
}

// =========================================================================
// Extractors
// =========================================================================

pub fn slugs(entries: &[ContentEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.slug.as_str()).collect()
}

/// Decode the `content` attribute of every `<meta name="fc:frame">` tag.
pub fn frame_contents(html: &str) -> Vec<serde_json::Value> {
    let marker = r#"<meta name="fc:frame" content=""#;
    html.match_indices(marker)
        .map(|(start, _)| {
            let rest = &html[start + marker.len()..];
            let end = rest.find('"').expect("unterminated content attribute");
            let json = rest[..end]
                .replace("&quot;", "\"")
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&amp;", "&");
            serde_json::from_str(&json).expect("fc:frame content is not JSON")
        })
        .collect()
}

/// Values of every `src="..."` / `href="..."` attribute, in document order.
pub fn asset_refs(html: &str) -> Vec<String> {
    let re = regex::Regex::new(r#"\b(?:src|href)="([^"]*)""#).unwrap();
    re.captures_iter(html).map(|c| c[1].to_string()).collect()
}
