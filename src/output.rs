//! CLI output formatting for both pipeline stages.
//!
//! Output is a content inventory: each entry leads with its position, date,
//! and title, with slugs and paths as indented context lines.
//!
//! # Output Format
//!
//! ## Index
//!
//! ```text
//! blog → src/blogData.json (2 entries)
//! 001 2024-03-01 Introducing Dotlanth
//!     Slug: introducing-dotlanth
//! 002 2025-06-15 Roadmap
//!     Slug: roadmap
//!     Date: defaulted (missing)
//! Skipped
//!     src/content/blog/broken.md: Invalid frontmatter in src/content/blog/broken.md: frontmatter opened on line 1 is never closed
//! ```
//!
//! ## Prerender
//!
//! ```text
//! blog/introducing-dotlanth → dist/blog/introducing-dotlanth/index.html
//!     Image: entry
//! series/the-qubit → dist/series/the-qubit/index.html
//!     Image: part 1
//!
//! Prerendered 2 pages
//! ```
//!
//! ## Cards
//!
//! ```text
//! public/images/episode-2-card.svg → public/images/episode-2-card.png
//!
//! Rendered 1 card (1200x630)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions do no I/O.

use crate::cards::CardReport;
use crate::image::ImageSource;
use crate::index::{CollectionIndex, DefaultReason};
use crate::prerender::PrerenderReport;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Calendar day of an ISO-8601 timestamp, or the raw value if it is shorter.
fn day_of(date: &str) -> &str {
    date.get(..10).unwrap_or(date)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn image_label(source: ImageSource) -> String {
    match source {
        ImageSource::Entry => "entry".to_string(),
        ImageSource::Part(n) => format!("part {n}"),
        ImageSource::Default => "default".to_string(),
    }
}

fn reason_label(reason: &DefaultReason) -> String {
    match reason {
        DefaultReason::Missing => "missing".to_string(),
        DefaultReason::Unparsable(raw) => format!("unparsable {raw:?}"),
    }
}

// ============================================================================
// Stage 1: Index output
// ============================================================================

/// Format the result of indexing one collection.
pub fn format_index_output(
    collection: &str,
    index: &CollectionIndex,
    index_path: &Path,
    default_language: &str,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} → {} ({})",
        collection,
        index_path.display(),
        plural(index.entries.len(), "entry", "entries")
    )];

    for (i, entry) in index.entries.iter().enumerate() {
        lines.push(format!(
            "{} {} {}",
            format_index(i + 1),
            day_of(&entry.date),
            entry.display_title(default_language)
        ));
        lines.push(format!("{}Slug: {}", indent(1), entry.slug));
        if let Some(defaulted) = index.defaulted_dates.iter().find(|d| d.slug == entry.slug) {
            lines.push(format!(
                "{}Date: defaulted ({})",
                indent(1),
                reason_label(&defaulted.reason)
            ));
        }
    }

    if !index.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for skipped in &index.skipped {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                skipped.path.display(),
                skipped.reason
            ));
        }
    }

    lines
}

pub fn print_index_output(
    collection: &str,
    index: &CollectionIndex,
    index_path: &Path,
    default_language: &str,
) {
    for line in format_index_output(collection, index, index_path, default_language) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Prerender output
// ============================================================================

/// Format prerender results. Paths are shown relative to `root` when possible.
pub fn format_prerender_output(report: &PrerenderReport, root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    for page in &report.pages {
        let path = page.path.strip_prefix(root).unwrap_or(&page.path);
        lines.push(format!("{} → {}", page.route, path.display()));
        lines.push(format!("{}Image: {}", indent(1), image_label(page.image)));
    }

    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for skipped in &report.skipped {
            lines.push(format!("{}{}: {}", indent(1), skipped.route, skipped.reason));
        }
    }

    lines.push(String::new());
    let mut summary = format!(
        "Prerendered {}",
        plural(report.pages.len(), "page", "pages")
    );
    if !report.skipped.is_empty() {
        summary.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    lines.push(summary);
    lines
}

pub fn print_prerender_output(report: &PrerenderReport, root: &Path) {
    for line in format_prerender_output(report, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Cards output
// ============================================================================

/// Format card results. Paths are shown relative to `root` when possible.
pub fn format_cards_output(report: &CardReport, root: &Path) -> Vec<String> {
    let rel = |path: &Path| path.strip_prefix(root).unwrap_or(path).display().to_string();
    let mut lines: Vec<String> = report
        .cards
        .iter()
        .map(|card| format!("{} → {}", rel(&card.source), rel(&card.output)))
        .collect();

    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for skipped in &report.skipped {
            lines.push(format!("{}{}: {}", indent(1), rel(&skipped.source), skipped.reason));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Rendered {} ({}x{})",
        plural(report.cards.len(), "card", "cards"),
        report.width,
        report.height
    ));
    lines
}

pub fn print_cards_output(report: &CardReport, root: &Path) {
    for line in format_cards_output(report, root) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{RenderedCard, SkippedCard};
    use crate::index::{DefaultedDate, SkippedFile};
    use crate::prerender::{RenderedPage, SkippedTarget};
    use crate::test_helpers::entry;
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn day_of_truncates_timestamps() {
        assert_eq!(day_of("2024-03-01T00:00:00.000Z"), "2024-03-01");
        assert_eq!(day_of("2024"), "2024");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "entry", "entries"), "1 entry");
        assert_eq!(plural(0, "entry", "entries"), "0 entries");
    }

    // =========================================================================
    // Index output
    // =========================================================================

    #[test]
    fn index_output_lists_entries_in_order() {
        let index = CollectionIndex {
            entries: vec![
                entry("newer", "Newer", "2024-03-01T00:00:00.000Z"),
                entry("older", "Older", "2023-01-01T00:00:00.000Z"),
            ],
            ..Default::default()
        };
        let lines = format_index_output("blog", &index, Path::new("src/blogData.json"), "en");
        assert_eq!(
            lines,
            vec![
                "blog → src/blogData.json (2 entries)",
                "001 2024-03-01 Newer",
                "    Slug: newer",
                "002 2023-01-01 Older",
                "    Slug: older",
            ]
        );
    }

    #[test]
    fn index_output_marks_defaulted_and_skipped() {
        let index = CollectionIndex {
            entries: vec![entry("roadmap", "Roadmap", "2025-06-15T12:00:00.000Z")],
            defaulted_dates: vec![DefaultedDate {
                slug: "roadmap".to_string(),
                reason: DefaultReason::Unparsable("soon".to_string()),
            }],
            skipped: vec![SkippedFile {
                path: PathBuf::from("blog/broken.md"),
                reason: "Invalid frontmatter in blog/broken.md: frontmatter opened on line 1 is never closed"
                    .to_string(),
            }],
        };
        let lines = format_index_output("blog", &index, Path::new("out.json"), "en");
        assert!(lines.contains(&"    Date: defaulted (unparsable \"soon\")".to_string()));
        assert!(lines.contains(&"Skipped".to_string()));
        assert!(lines.contains(
            &"    blog/broken.md: Invalid frontmatter in blog/broken.md: frontmatter opened on line 1 is never closed"
                .to_string()
        ));
    }

    #[test]
    fn index_output_empty_collection() {
        let lines = format_index_output(
            "series",
            &CollectionIndex::default(),
            Path::new("index.json"),
            "en",
        );
        assert_eq!(lines, vec!["series → index.json (0 entries)"]);
    }

    // =========================================================================
    // Prerender output
    // =========================================================================

    #[test]
    fn prerender_output_shows_routes_and_relative_paths() {
        let report = PrerenderReport {
            pages: vec![RenderedPage {
                route: "blog/my-post".to_string(),
                path: PathBuf::from("/site/dist/blog/my-post/index.html"),
                image: ImageSource::Part(2),
            }],
            skipped: vec![],
        };
        let lines = format_prerender_output(&report, Path::new("/site"));
        assert_eq!(
            lines,
            vec![
                "blog/my-post → dist/blog/my-post/index.html",
                "    Image: part 2",
                "",
                "Prerendered 1 page",
            ]
        );
    }

    #[test]
    fn prerender_output_counts_skipped() {
        let report = PrerenderReport {
            pages: vec![],
            skipped: vec![SkippedTarget {
                route: "blog/bad/slug".to_string(),
                reason: "invalid".to_string(),
            }],
        };
        let lines = format_prerender_output(&report, Path::new("/"));
        assert_eq!(lines.last().unwrap(), "Prerendered 0 pages, 1 skipped");
        assert!(lines.contains(&"    blog/bad/slug: invalid".to_string()));
    }

    // =========================================================================
    // Cards output
    // =========================================================================

    #[test]
    fn cards_output_lists_conversions_and_size() {
        let report = CardReport {
            width: 1200,
            height: 630,
            cards: vec![RenderedCard {
                source: PathBuf::from("/site/public/images/episode-2-card.svg"),
                output: PathBuf::from("/site/public/images/episode-2-card.png"),
            }],
            skipped: vec![SkippedCard {
                source: PathBuf::from("/site/images/missing.svg"),
                reason: "not found".to_string(),
            }],
        };
        assert_eq!(
            format_cards_output(&report, Path::new("/site")),
            vec![
                "public/images/episode-2-card.svg → public/images/episode-2-card.png",
                "Skipped",
                "    images/missing.svg: not found",
                "",
                "Rendered 1 card (1200x630)",
            ]
        );
    }
}
