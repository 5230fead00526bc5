//! Static prerendering of content pages.
//!
//! Stage 2 of the build pipeline. Takes the built SPA shell and the JSON
//! indices written by [`crate::index`], and writes one standalone HTML file per
//! entry so link previews work without running JavaScript.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                      # SPA shell (input, never modified)
//! ├── blog/
//! │   └── introducing-dotlanth/
//! │       └── index.html              # shell + meta tags, assets at ../../
//! └── series/
//!     └── the-qubit/
//!         └── index.html
//! ```
//!
//! ## Per-Page Changes
//!
//! Each page is the pristine shell with:
//! - root-relative `src`/`href` values rewritten for the page depth
//!   ([`crate::rewrite::rewrite_asset_paths`])
//! - Open Graph, Twitter, and `fc:frame` tags inserted before `</head>`
//!   ([`crate::frame::render_meta_tags`])
//!
//! ## Parallel Rendering
//!
//! Pages are independent, so they are rendered and written in parallel using
//! [rayon](https://docs.rs/rayon). The shell is shared read-only.

use crate::config::{CollectionConfig, ErrorPolicy, SiteConfig};
use crate::frame::{FrameEmbed, PageMeta, render_meta_tags};
use crate::image::{ImageSource, resolve_image};
use crate::rewrite::{inject_head, rewrite_asset_paths};
use crate::types::ContentEntry;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrerenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SPA shell not found: {0} (build the app first)")]
    TemplateNotFound(PathBuf),
    #[error("SPA shell {0} has no </head>")]
    MissingHead(PathBuf),
    #[error("Content index not found: {0} (run `index` first)")]
    IndexNotFound(PathBuf),
    #[error("Invalid content index {path}: {source}")]
    InvalidIndex {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Duplicate slug {slug:?} in collection {collection}")]
    DuplicateSlug { collection: String, slug: String },
    #[error("Slug {0:?} is not a single path segment")]
    InvalidSlug(String),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The built SPA entry document, validated to contain `</head>`.
#[derive(Debug, Clone)]
pub struct Shell {
    path: PathBuf,
    html: String,
}

impl Shell {
    pub fn load(path: &Path) -> Result<Self, PrerenderError> {
        if !path.is_file() {
            return Err(PrerenderError::TemplateNotFound(path.to_path_buf()));
        }
        let html = fs::read_to_string(path)?;
        Self::new(path, html)
    }

    pub fn new(path: &Path, html: String) -> Result<Self, PrerenderError> {
        if !html.contains("</head>") {
            return Err(PrerenderError::MissingHead(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            html,
        })
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// One entry to prerender under its collection's prefix.
#[derive(Debug)]
pub struct Target<'a> {
    pub collection: &'a CollectionConfig,
    pub entry: ContentEntry,
}

impl Target<'_> {
    /// Route without leading slash, e.g. `blog/my-post`.
    pub fn route(&self) -> String {
        format!("{}/{}", self.collection.prefix, self.entry.slug)
    }

    pub fn output_path(&self, dist: &Path) -> PathBuf {
        dist.join(&self.collection.prefix)
            .join(&self.entry.slug)
            .join("index.html")
    }
}

/// A page that was written.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub route: String,
    pub path: PathBuf,
    pub image: ImageSource,
}

/// A target left out under `on_error = "skip"`.
#[derive(Debug, Clone)]
pub struct SkippedTarget {
    pub route: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct PrerenderReport {
    /// Sorted by route.
    pub pages: Vec<RenderedPage>,
    pub skipped: Vec<SkippedTarget>,
}

/// Read a JSON index written by the indexer.
pub fn load_index(path: &Path) -> Result<Vec<ContentEntry>, PrerenderError> {
    if !path.is_file() {
        return Err(PrerenderError::IndexNotFound(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|source| PrerenderError::InvalidIndex {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_slug(slug: &str) -> Result<(), PrerenderError> {
    let invalid = slug.is_empty()
        || slug == "."
        || slug == ".."
        || slug.contains(['/', '\\'])
        || slug.chars().any(char::is_control);
    if invalid {
        return Err(PrerenderError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Render one page from the pristine shell.
///
/// `verify_in` is the dist directory when `verify_images` is on; without it
/// this function does no I/O.
pub fn render_page(
    shell: &Shell,
    site: &SiteConfig,
    target: &Target<'_>,
    verify_in: Option<&Path>,
) -> Result<(String, ImageSource), PrerenderError> {
    validate_slug(&target.entry.slug)?;

    let page_url = format!("{}/{}", site.base_url, target.route());
    let image = resolve_image(target.collection, &target.entry, &site.base_url, verify_in);
    let frame = FrameEmbed::new(&site.frame, &site.base_url, &image.url, &page_url);
    let tags = render_meta_tags(&PageMeta {
        title: target.entry.display_title(&site.default_language),
        description: target.entry.display_excerpt(&site.default_language),
        image_url: &image.url,
        page_url: &page_url,
        frame: &frame,
    })?;

    let rewritten = rewrite_asset_paths(shell.html(), target.collection.depth());
    let html = inject_head(&rewritten, &tags.into_string())
        .ok_or_else(|| PrerenderError::MissingHead(shell.path.clone()))?;
    Ok((html, image.source))
}

fn write_page(
    shell: &Shell,
    site: &SiteConfig,
    target: &Target<'_>,
    dist: &Path,
) -> Result<RenderedPage, PrerenderError> {
    let verify_in = site.build.verify_images.then_some(dist);
    let (html, image) = render_page(shell, site, target, verify_in)?;

    let path = target.output_path(dist);
    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, html.as_bytes())
    };
    write(&path).map_err(|source| PrerenderError::Write {
        path: path.clone(),
        source,
    })?;

    info!("Prerendered /{}", target.route());
    Ok(RenderedPage {
        route: target.route(),
        path,
        image,
    })
}

/// Load every collection's index and pair entries with their collection.
pub fn collect_targets<'a>(
    root: &Path,
    collections: &[&'a CollectionConfig],
) -> Result<Vec<Target<'a>>, PrerenderError> {
    let mut targets = Vec::new();
    for &collection in collections {
        let entries = load_index(&collection.index_path(root))?;
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.slug.clone()) {
                return Err(PrerenderError::DuplicateSlug {
                    collection: collection.name.clone(),
                    slug: entry.slug,
                });
            }
            targets.push(Target { collection, entry });
        }
    }
    Ok(targets)
}

/// Prerender every entry of the given collections into the dist directory.
pub fn prerender(
    root: &Path,
    site: &SiteConfig,
    collections: &[&CollectionConfig],
) -> Result<PrerenderReport, PrerenderError> {
    let shell = Shell::load(&site.template_path(root))?;
    let targets = collect_targets(root, collections)?;
    let dist = site.dist_path(root);

    let results: Vec<Result<RenderedPage, PrerenderError>> = targets
        .par_iter()
        .map(|target| write_page(&shell, site, target, &dist))
        .collect();

    let mut report = PrerenderReport::default();
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok(page) => report.pages.push(page),
            Err(e) if site.build.on_error == ErrorPolicy::Skip => {
                warn!("skipping /{}: {e}", target.route());
                report.skipped.push(SkippedTarget {
                    route: target.route(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    report.pages.sort_by(|a, b| a.route.cmp(&b.route));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::write_index;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn project() -> (TempDir, SiteConfig) {
        let tmp = TempDir::new().unwrap();
        let site = SiteConfig::default();
        write_md(tmp.path(), "dist/index.html", SHELL);
        (tmp, site)
    }

    fn write_entries(root: &Path, collection: &CollectionConfig, entries: &[ContentEntry]) {
        write_index(&collection.index_path(root), entries, collection.id_key).unwrap();
    }

    fn blog(site: &SiteConfig) -> &CollectionConfig {
        site.collection("blog").unwrap()
    }

    #[test]
    fn my_post_scenario() {
        let (tmp, site) = project();
        write_entries(
            tmp.path(),
            blog(&site),
            &[entry("my-post", "My Post", "2024-01-01T00:00:00.000Z")],
        );
        let report = prerender(tmp.path(), &site, &[blog(&site)]).unwrap();

        let out = tmp.path().join("dist/blog/my-post/index.html");
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].path, out);
        assert_eq!(report.pages[0].route, "blog/my-post");

        let html = fs::read_to_string(out).unwrap();
        assert!(html.contains(r#"src="../../assets/index-3f2a.js""#));
        assert!(html.contains(r#"href="../../favicon.ico""#));
        assert!(html.contains(r#"<meta property="og:title" content="My Post">"#));
    }

    #[test]
    fn frame_tag_present_once_with_urls() {
        let (tmp, site) = project();
        write_entries(
            tmp.path(),
            blog(&site),
            &[entry("my-post", "My Post", "2024-01-01T00:00:00.000Z")],
        );
        prerender(tmp.path(), &site, &[blog(&site)]).unwrap();

        let html = fs::read_to_string(tmp.path().join("dist/blog/my-post/index.html")).unwrap();
        let frames = frame_contents(&html);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0]["imageUrl"],
            "https://hint.synerthink.com/images/blog-card.svg"
        );
        assert_eq!(
            frames[0]["button"]["action"]["url"],
            "https://hint.synerthink.com/blog/my-post"
        );
    }

    #[test]
    fn meta_tags_land_inside_head() {
        let (tmp, site) = project();
        write_entries(
            tmp.path(),
            blog(&site),
            &[entry("a", "A", "2024-01-01T00:00:00.000Z")],
        );
        prerender(tmp.path(), &site, &[blog(&site)]).unwrap();
        let html = fs::read_to_string(tmp.path().join("dist/blog/a/index.html")).unwrap();
        let head_end = html.find("</head>").unwrap();
        let og = html.find("og:title").unwrap();
        assert!(og < head_end);
        assert_eq!(html.matches("</head>").count(), 1);
    }

    #[test]
    fn shell_left_untouched() {
        let (tmp, site) = project();
        write_entries(
            tmp.path(),
            blog(&site),
            &[entry("a", "A", "2024-01-01T00:00:00.000Z")],
        );
        prerender(tmp.path(), &site, &[blog(&site)]).unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("dist/index.html")).unwrap(),
            SHELL
        );
    }

    #[test]
    fn nested_prefix_uses_deeper_relative_paths() {
        let (tmp, mut site) = project();
        site.collections[0].prefix = "learn/blog".to_string();
        write_entries(
            tmp.path(),
            blog(&site),
            &[entry("deep", "Deep", "2024-01-01T00:00:00.000Z")],
        );
        prerender(tmp.path(), &site, &[blog(&site)]).unwrap();
        let html =
            fs::read_to_string(tmp.path().join("dist/learn/blog/deep/index.html")).unwrap();
        assert!(html.contains(r#"src="../../../assets/index-3f2a.js""#));
    }

    #[test]
    fn every_page_rewritten_from_pristine_shell() {
        let (tmp, site) = project();
        let entries: Vec<ContentEntry> = (0..12)
            .map(|i| entry(&format!("post-{i}"), "P", "2024-01-01T00:00:00.000Z"))
            .collect();
        write_entries(tmp.path(), blog(&site), &entries);
        let report = prerender(tmp.path(), &site, &[blog(&site)]).unwrap();
        assert_eq!(report.pages.len(), 12);
        for page in &report.pages {
            let html = fs::read_to_string(&page.path).unwrap();
            assert!(html.contains(r#"src="../../assets/"#));
            assert!(!html.contains(r#""../../../"#));
            assert_eq!(frame_contents(&html).len(), 1);
        }
    }

    #[test]
    fn series_uses_localized_title_and_part_image() {
        let (tmp, mut site) = project();
        site.collections[1]
            .part_images
            .insert("1".to_string(), "images/part-1.png".to_string());
        let series = site.collection("series").unwrap();
        let mut episode = entry("the-qubit", "ignored", "2024-01-01T00:00:00.000Z");
        episode.title = serde_json::from_str(r#"{"en":"The Qubit","tr":"Kubit"}"#).unwrap();
        episode.part = Some(1);
        write_entries(tmp.path(), series, &[episode]);

        let report = prerender(tmp.path(), &site, &[series]).unwrap();
        assert_eq!(report.pages[0].image, ImageSource::Part(1));
        let html =
            fs::read_to_string(tmp.path().join("dist/series/the-qubit/index.html")).unwrap();
        assert!(html.contains(r#"content="The Qubit""#));
        assert!(html.contains("https://hint.synerthink.com/images/part-1.png"));
    }

    #[test]
    fn rerun_overwrites_identically() {
        let (tmp, site) = project();
        write_entries(
            tmp.path(),
            blog(&site),
            &[entry("a", "A", "2024-01-01T00:00:00.000Z")],
        );
        prerender(tmp.path(), &site, &[blog(&site)]).unwrap();
        let out = tmp.path().join("dist/blog/a/index.html");
        let first = fs::read(&out).unwrap();
        prerender(tmp.path(), &site, &[blog(&site)]).unwrap();
        assert_eq!(first, fs::read(&out).unwrap());
    }

    #[test]
    fn missing_shell_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let site = SiteConfig::default();
        let result = prerender(tmp.path(), &site, &[blog(&site)]);
        assert!(matches!(result, Err(PrerenderError::TemplateNotFound(_))));
    }

    #[test]
    fn shell_without_head_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let site = SiteConfig::default();
        write_md(tmp.path(), "dist/index.html", "<html><body></body></html>");
        let result = prerender(tmp.path(), &site, &[blog(&site)]);
        assert!(matches!(result, Err(PrerenderError::MissingHead(_))));
    }

    #[test]
    fn missing_index_is_fatal() {
        let (tmp, site) = project();
        let result = prerender(tmp.path(), &site, &[blog(&site)]);
        assert!(matches!(result, Err(PrerenderError::IndexNotFound(_))));
    }

    #[test]
    fn malformed_index_is_fatal() {
        let (tmp, site) = project();
        write_md(tmp.path(), &blog(&site).index, "[{\"slug\": 1}]");
        let result = prerender(tmp.path(), &site, &[blog(&site)]);
        assert!(matches!(result, Err(PrerenderError::InvalidIndex { .. })));
    }

    #[test]
    fn duplicate_slug_is_fatal() {
        let (tmp, site) = project();
        write_entries(
            tmp.path(),
            blog(&site),
            &[
                entry("a", "A", "2024-01-01T00:00:00.000Z"),
                entry("a", "Again", "2024-02-01T00:00:00.000Z"),
            ],
        );
        let result = prerender(tmp.path(), &site, &[blog(&site)]);
        assert!(matches!(result, Err(PrerenderError::DuplicateSlug { .. })));
    }

    #[test]
    fn unsafe_slug_aborts_by_default() {
        let (tmp, site) = project();
        write_entries(
            tmp.path(),
            blog(&site),
            &[entry("../escape", "E", "2024-01-01T00:00:00.000Z")],
        );
        let result = prerender(tmp.path(), &site, &[blog(&site)]);
        assert!(matches!(result, Err(PrerenderError::InvalidSlug(_))));
        assert!(!tmp.path().join("dist/escape").exists());
    }

    #[test]
    fn unsafe_slug_skipped_under_skip_policy() {
        let (tmp, mut site) = project();
        site.build.on_error = ErrorPolicy::Skip;
        write_entries(
            tmp.path(),
            blog(&site),
            &[
                entry("ok", "Ok", "2024-01-01T00:00:00.000Z"),
                entry("bad/slug", "Bad", "2024-01-01T00:00:00.000Z"),
            ],
        );
        let report = prerender(tmp.path(), &site, &[blog(&site)]).unwrap();
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].route, "blog/bad/slug");
    }

    #[test]
    fn render_page_is_pure_without_verification() {
        let site = SiteConfig::default();
        let shell = Shell::new(Path::new("index.html"), SHELL.to_string()).unwrap();
        let target = Target {
            collection: blog(&site),
            entry: entry("x", "X", "2024-01-01T00:00:00.000Z"),
        };
        let (first, _) = render_page(&shell, &site, &target, None).unwrap();
        let (second, _) = render_page(&shell, &site, &target, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(shell.html(), SHELL);
    }
}
