//! Site configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. Stock defaults describe
//! the HINT site as it ships (a flat `blog` collection and a nested `series`
//! collection); a `site.toml` at the project root overrides any subset of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = "https://hint.synerthink.com"
//! dist_dir = "dist"          # Built SPA output, relative to the project root
//! template = "index.html"    # SPA shell, relative to dist_dir
//! default_language = "en"
//!
//! [frame]
//! version = "next"
//! button_title = "Read on HINT"
//! app_name = "HINT"
//! splash_image = "logo.svg"
//! splash_background_color = "#131313"
//!
//! [build]
//! on_error = "abort"         # "abort" | "skip"
//! strict_dates = false       # Unparsable dates fail the run instead of defaulting
//! verify_images = false      # Check image files exist before using them
//! # max_threads = 4          # Omit for auto = CPU cores
//!
//! [cards]
//! width = 1200
//! height = 630
//! files = ["public/images/episode-2-card.svg"]  # PNG written alongside
//!
//! [[collections]]
//! name = "blog"
//! prefix = "blog"
//! source = "src/content/blog"
//! layout = "flat"            # "flat" | "nested"
//! index = "src/blogData.json"
//! id_key = "slug"            # "slug" | "id": identifier key in the JSON index
//! include_content = true
//! default_image = "images/blog-card.svg"
//! ```
//!
//! ## Partial Configuration
//!
//! Override just the values you want. Tables merge key by key; arrays (such as
//! `collections`) replace the stock value wholesale.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `site.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site origin used for canonical and image URLs. Trailing `/` is trimmed.
    pub base_url: String,
    /// Directory holding the built SPA, relative to the project root.
    pub dist_dir: String,
    /// SPA shell document, relative to `dist_dir`.
    pub template: String,
    /// Language used when a localized field has to collapse to one string.
    pub default_language: String,
    /// Social frame embed settings.
    pub frame: FrameConfig,
    /// Failure policy and parallelism.
    pub build: BuildConfig,
    /// SVG share cards to rasterize.
    pub cards: CardsConfig,
    /// Content collections, each published under its own path prefix.
    pub collections: Vec<CollectionConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hint.synerthink.com".to_string(),
            dist_dir: "dist".to_string(),
            template: "index.html".to_string(),
            default_language: "en".to_string(),
            frame: FrameConfig::default(),
            build: BuildConfig::default(),
            cards: CardsConfig::default(),
            collections: vec![
                CollectionConfig {
                    name: "blog".to_string(),
                    prefix: "blog".to_string(),
                    source: "src/content/blog".to_string(),
                    layout: Layout::Flat,
                    index: "src/blogData.json".to_string(),
                    id_key: IdKey::Slug,
                    include_content: true,
                    default_image: "images/blog-card.svg".to_string(),
                    images: BTreeMap::new(),
                    part_images: BTreeMap::new(),
                },
                CollectionConfig {
                    name: "series".to_string(),
                    prefix: "series".to_string(),
                    source: "public/content/series".to_string(),
                    layout: Layout::Nested,
                    index: "public/content/series/index.json".to_string(),
                    id_key: IdKey::Id,
                    include_content: false,
                    default_image: "images/quantum-card.svg".to_string(),
                    images: BTreeMap::new(),
                    part_images: BTreeMap::new(),
                },
            ],
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.template.is_empty() {
            return Err(ConfigError::Validation("template must not be empty".into()));
        }
        if self.frame.splash_background_color.is_empty() {
            return Err(ConfigError::Validation(
                "frame.splash_background_color must not be empty".into(),
            ));
        }
        if self.cards.width == 0 || self.cards.height == 0 {
            return Err(ConfigError::Validation(
                "cards.width and cards.height must be positive".into(),
            ));
        }
        if let Some(file) = self.cards.files.iter().find(|f| {
            !Path::new(f)
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
        }) {
            return Err(ConfigError::Validation(format!(
                "cards.files entry {file:?} is not an .svg file"
            )));
        }

        let mut names = HashSet::new();
        for collection in &self.collections {
            if !names.insert(collection.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate collection name {:?}",
                    collection.name
                )));
            }
            validate_prefix(&collection.prefix)?;
            if collection.default_image.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "collection {:?} needs a default_image",
                    collection.name
                )));
            }
            if let Some(key) = collection
                .part_images
                .keys()
                .find(|k| k.parse::<u32>().is_err())
            {
                return Err(ConfigError::Validation(format!(
                    "collection {:?}: part_images key {key:?} is not a part number",
                    collection.name
                )));
            }
        }
        Ok(())
    }

    /// Absolute path of the built SPA directory.
    pub fn dist_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dist_dir)
    }

    /// Absolute path of the SPA shell document.
    pub fn template_path(&self, root: &Path) -> PathBuf {
        self.dist_path(root).join(&self.template)
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Collections named on the command line, or all of them when `names` is empty.
    pub fn select_collections(
        &self,
        names: &[String],
    ) -> Result<Vec<&CollectionConfig>, ConfigError> {
        if names.is_empty() {
            return Ok(self.collections.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.collection(name).ok_or_else(|| {
                    ConfigError::Validation(format!("unknown collection {name:?}"))
                })
            })
            .collect()
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    let invalid = prefix.is_empty()
        || prefix.starts_with('/')
        || prefix.ends_with('/')
        || prefix.split('/').any(|s| s.is_empty() || s == "." || s == "..");
    if invalid {
        return Err(ConfigError::Validation(format!(
            "collection prefix {prefix:?} must be a relative route like \"blog\" or \"docs/guides\""
        )));
    }
    Ok(())
}

/// Settings for the `fc:frame` embed written into every prerendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Embed schema version marker.
    pub version: String,
    /// Label of the single launch button.
    pub button_title: String,
    /// App name shown by the client while launching.
    pub app_name: String,
    /// Splash image, relative to `base_url` unless it is already absolute.
    pub splash_image: String,
    /// Splash background (CSS color).
    pub splash_background_color: String,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            version: "next".to_string(),
            button_title: "Read on HINT".to_string(),
            app_name: "HINT".to_string(),
            splash_image: "logo.svg".to_string(),
            splash_background_color: "#131313".to_string(),
        }
    }
}

/// What to do when a single file or entry fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Abort the whole run on the first failure.
    #[default]
    Abort,
    /// Log a warning, skip the failing file or entry, keep going.
    Skip,
}

/// Failure policy and parallelism settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub on_error: ErrorPolicy,
    /// Treat an unparsable frontmatter `date` as a fatal authoring error.
    pub strict_dates: bool,
    /// Check that resolved image files exist under `dist_dir`.
    pub verify_images: bool,
    /// Maximum number of prerender worker threads.
    /// When absent, defaults to the number of CPU cores.
    pub max_threads: Option<usize>,
}

/// SVG share cards rasterized to PNG by the `cards` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardsConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// SVG sources, relative to the project root. Each PNG is written next
    /// to its source.
    pub files: Vec<String>,
}

impl Default for CardsConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 630,
            files: Vec::new(),
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BuildConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// How a collection lays out its markdown sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `{source}/{slug}.md`
    #[default]
    Flat,
    /// `{source}/{slug}/index.{lang}.md`, one file per language.
    Nested,
}

/// JSON key holding an entry's identifier in a written index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKey {
    /// `"slug": "my-post"` (blog client)
    #[default]
    Slug,
    /// `"id": "the-qubit"` (series client)
    Id,
}

impl IdKey {
    pub fn as_str(self) -> &'static str {
        match self {
            IdKey::Slug => "slug",
            IdKey::Id => "id",
        }
    }
}

/// One content collection published under a path prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    pub name: String,
    /// Route segment(s) the entries are published under, e.g. `blog`.
    pub prefix: String,
    /// Markdown source directory, relative to the project root.
    pub source: String,
    #[serde(default)]
    pub layout: Layout,
    /// JSON index path, relative to the project root.
    pub index: String,
    /// Key the client reads each entry's identifier from.
    #[serde(default)]
    pub id_key: IdKey,
    /// Whether the index carries each entry's full markdown body.
    #[serde(default = "default_true")]
    pub include_content: bool,
    /// Fallback share image for the collection.
    pub default_image: String,
    /// Per-entry share images, keyed by slug.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    /// Per-part share images, keyed by part number.
    #[serde(default)]
    pub part_images: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl CollectionConfig {
    pub fn source_path(&self, root: &Path) -> PathBuf {
        root.join(&self.source)
    }

    pub fn index_path(&self, root: &Path) -> PathBuf {
        root.join(&self.index)
    }

    /// Number of directory levels a prerendered page sits below the site root.
    ///
    /// `blog` → `blog/<id>/index.html` → 2.
    pub fn depth(&self) -> usize {
        self.prefix.split('/').filter(|s| !s.is_empty()).count() + 1
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let mut config: SiteConfig = merged.try_into()?;
    config.base_url = config.base_url.trim_end_matches('/').to_string();
    config.validate()?;
    Ok(config)
}

/// Load config from the given `site.toml` path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(config_path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(config_path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `site.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# hint-site Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Paths are relative to the project root (--root).
# Unknown keys will cause an error.

# Site origin used for canonical page URLs and image URLs.
base_url = "https://hint.synerthink.com"

# Directory holding the built single-page app.
dist_dir = "dist"

# The SPA shell every prerendered page is derived from (relative to dist_dir).
template = "index.html"

# Language used when a multi-language title must collapse to one string.
default_language = "en"

# ---------------------------------------------------------------------------
# fc:frame embed
# ---------------------------------------------------------------------------
[frame]
version = "next"
button_title = "Read on HINT"
app_name = "HINT"
# Relative to base_url unless it is an absolute URL.
splash_image = "logo.svg"
splash_background_color = "#131313"

# ---------------------------------------------------------------------------
# Build behavior
# ---------------------------------------------------------------------------
[build]
# "abort" stops at the first broken file or entry; "skip" warns and continues.
on_error = "abort"

# Fail on unparsable frontmatter dates instead of substituting the build time.
strict_dates = false

# Check that share images exist under dist_dir; missing ones fall back to
# the next candidate (part image, then the collection default).
verify_images = false

# Maximum prerender worker threads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4

# ---------------------------------------------------------------------------
# Share cards
# ---------------------------------------------------------------------------
# Link-preview scrapers do not render SVG. Listed SVG cards are rasterized to
# PNG (scaled to cover, centered) next to their source by `hint-site cards`.
[cards]
width = 1200
height = 630
files = []
# files = ["public/images/episode-2-card.svg"]

# ---------------------------------------------------------------------------
# Collections
# ---------------------------------------------------------------------------
# Declaring any [[collections]] replaces this whole list.

[[collections]]
name = "blog"
prefix = "blog"
source = "src/content/blog"
# "flat": one <slug>.md per entry.
layout = "flat"
index = "src/blogData.json"
# JSON key the client reads the identifier from: "slug" or "id".
id_key = "slug"
include_content = true
default_image = "images/blog-card.svg"

[[collections]]
name = "series"
prefix = "series"
source = "public/content/series"
# "nested": <slug>/index.<lang>.md, one file per language.
layout = "nested"
index = "public/content/series/index.json"
id_key = "id"
# Episodes are fetched per language at runtime, keep the index light.
include_content = false
default_image = "images/quantum-card.svg"

# Per-episode share images, keyed by slug:
# [collections.images]
# "the-qubit" = "images/series/qubit.png"

# Per-part share images, keyed by part number:
# [collections.part_images]
# "1" = "images/series/part-1.png"
"##
}
