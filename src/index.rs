//! Content indexing: markdown collections to JSON.
//!
//! Stage 1 of the build pipeline. Reads a collection's markdown sources,
//! extracts their frontmatter, and produces a [`CollectionIndex`] whose entries
//! are written to the collection's JSON index for the client and the
//! prerenderer.
//!
//! ## Layouts
//!
//! ```text
//! src/content/blog/                    # layout = "flat"
//! ├── introducing-dotlanth.md          # slug = file stem
//! └── roadmap.md
//!
//! public/content/series/               # layout = "nested"
//! ├── the-qubit/                       # slug = directory name
//! │   ├── index.en.md                  # one file per language
//! │   └── index.tr.md
//! └── superposition/
//!     └── index.md                     # no language tag = default language
//! ```
//!
//! ## Field Resolution
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | title | `title:` | first `# heading`, then "Untitled Post" |
//! | date | `date:` | time the run started (logged as defaulted) |
//! | excerpt | `excerpt:` | first 150 characters of the body, `...` if cut |
//! | category / author / readTime | frontmatter | "Uncategorized" / "Anonymous" / "N/A" |
//!
//! ## Ordering
//!
//! Entries are sorted newest first; equal dates fall back to slug order so
//! the output never depends on directory enumeration order.

use crate::config::{CollectionConfig, ErrorPolicy, IdKey, Layout, SiteConfig};
use crate::frontmatter::{self, Document, FrontmatterError};
use crate::types::{
    ContentEntry, DEFAULT_AUTHOR, DEFAULT_CATEGORY, DEFAULT_READ_TIME, DEFAULT_TITLE, Localized,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use log::warn;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Content directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("Invalid frontmatter in {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        source: FrontmatterError,
    },
    #[error("Unparsable date {value:?} in {path}")]
    InvalidDate { path: PathBuf, value: String },
    #[error("Duplicate slug {0:?}")]
    DuplicateSlug(String),
}

/// Number of body characters kept in a derived excerpt.
pub const EXCERPT_CHARS: usize = 150;

/// Per-collection indexing settings.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub layout: Layout,
    pub include_content: bool,
    pub default_language: String,
    pub strict_dates: bool,
    pub on_error: ErrorPolicy,
    /// Substituted for missing or unparsable dates. Captured once per run.
    pub now: DateTime<Utc>,
}

impl IndexOptions {
    pub fn from_config(
        site: &SiteConfig,
        collection: &CollectionConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            layout: collection.layout,
            include_content: collection.include_content,
            default_language: site.default_language.clone(),
            strict_dates: site.build.strict_dates,
            on_error: site.build.on_error,
            now,
        }
    }
}

/// Result of indexing one collection.
#[derive(Debug, Default)]
pub struct CollectionIndex {
    /// Sorted newest first.
    pub entries: Vec<ContentEntry>,
    /// Slugs whose date fell back to the run start time.
    pub defaulted_dates: Vec<DefaultedDate>,
    /// Files left out under `on_error = "skip"`, or entry directories with no markdown.
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultedDate {
    pub slug: String,
    pub reason: DefaultReason,
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

// ============================================================================
// Dates
// ============================================================================

/// Outcome of reading a frontmatter `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateField {
    Parsed(DateTime<Utc>),
    Defaulted {
        value: DateTime<Utc>,
        reason: DefaultReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultReason {
    Missing,
    Unparsable(String),
}

impl DateField {
    pub fn value(&self) -> DateTime<Utc> {
        match self {
            DateField::Parsed(value) | DateField::Defaulted { value, .. } => *value,
        }
    }
}

/// Read an optional raw date, substituting `now` when absent or unparsable.
pub fn parse_date(raw: Option<&str>, now: DateTime<Utc>) -> DateField {
    match raw {
        None => DateField::Defaulted {
            value: now,
            reason: DefaultReason::Missing,
        },
        Some(raw) => match parse_timestamp(raw) {
            Some(value) => DateField::Parsed(value),
            None => DateField::Defaulted {
                value: now,
                reason: DefaultReason::Unparsable(raw.to_string()),
            },
        },
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Calendar dates, read as midnight UTC. `%B` also accepts abbreviations.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%d %B %Y"];

/// Parse RFC 3339, a calendar date (`2024-03-01`, `March 1, 2024`,
/// `1 Mar 2024`), or a naive date-time (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// `2024-01-01T00:00:00.000Z`
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Field derivation
// ============================================================================

/// First [`EXCERPT_CHARS`] characters of the trimmed body, plus `...` if cut.
pub fn derive_excerpt(body: &str) -> String {
    let text = body.trim();
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Text of the first level-1 heading, if any.
pub fn first_heading(body: &str) -> Option<String> {
    let mut inside = false;
    let mut title = String::new();
    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => inside = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if inside => break,
            Event::Text(text) | Event::Code(text) if inside => title.push_str(&text),
            _ => (),
        }
    }
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn title_of(doc: &Document) -> String {
    doc.get("title")
        .map(str::to_string)
        .or_else(|| first_heading(&doc.body))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

fn excerpt_of(doc: &Document) -> String {
    doc.get("excerpt")
        .map(str::to_string)
        .unwrap_or_else(|| derive_excerpt(&doc.body))
}

fn part_of(doc: &Document, path: &Path) -> Option<u32> {
    let raw = doc.get("part")?;
    match raw.parse::<u32>() {
        Ok(part) => Some(part),
        Err(_) => {
            warn!("{}: ignoring non-numeric part {raw:?}", path.display());
            None
        }
    }
}

/// A parsed entry before sorting.
struct Indexed {
    date: DateField,
    entry: ContentEntry,
}

/// Fields shared by both layouts, taken from the primary document.
fn build_entry(
    slug: &str,
    primary: &Document,
    path: &Path,
    title: Localized,
    excerpt: Localized,
    content: Option<Localized>,
    options: &IndexOptions,
) -> Result<Indexed, IndexError> {
    let date = parse_date(primary.get("date"), options.now);
    if let DateField::Defaulted {
        reason: DefaultReason::Unparsable(value),
        ..
    } = &date
        && options.strict_dates
    {
        return Err(IndexError::InvalidDate {
            path: path.to_path_buf(),
            value: value.clone(),
        });
    }

    let field = |key: &str, default: &str| primary.get(key).unwrap_or(default).to_string();
    Ok(Indexed {
        entry: ContentEntry {
            slug: slug.to_string(),
            title,
            date: format_timestamp(date.value()),
            category: field("category", DEFAULT_CATEGORY),
            author: field("author", DEFAULT_AUTHOR),
            author_role: field("authorRole", ""),
            read_time: field("readTime", DEFAULT_READ_TIME),
            excerpt,
            content,
            cover_image: primary.get("coverImage").map(str::to_string),
            part: part_of(primary, path),
            languages: vec![],
            default_language: None,
        },
        date,
    })
}

// ============================================================================
// Collection walking
// ============================================================================

/// Index a collection directory without writing anything.
pub fn index_collection(dir: &Path, options: &IndexOptions) -> Result<CollectionIndex, IndexError> {
    if !dir.is_dir() {
        return Err(IndexError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut result = CollectionIndex::default();
    let mut indexed = Vec::new();
    for child in sorted_children(dir)? {
        let outcome = match options.layout {
            Layout::Flat if is_markdown(&child) => index_flat_file(&child, options).map(Some),
            Layout::Nested if child.is_dir() => index_entry_dir(&child, options, &mut result),
            _ => continue,
        };
        match outcome {
            Ok(Some(item)) => indexed.push(item),
            Ok(None) => {}
            Err(e) => skip_or_abort(e, &child, options.on_error, &mut result)?,
        }
    }

    let mut seen = HashSet::new();
    for item in &indexed {
        if !seen.insert(item.entry.slug.as_str()) {
            return Err(IndexError::DuplicateSlug(item.entry.slug.clone()));
        }
        if let DateField::Defaulted { reason, .. } = &item.date {
            warn!(
                "{}: date {} - using build time {}",
                item.entry.slug,
                match reason {
                    DefaultReason::Missing => "missing".to_string(),
                    DefaultReason::Unparsable(raw) => format!("{raw:?} is unparsable"),
                },
                item.entry.date
            );
            result.defaulted_dates.push(DefaultedDate {
                slug: item.entry.slug.clone(),
                reason: reason.clone(),
            });
        }
    }

    indexed.sort_by(|a, b| {
        b.date
            .value()
            .cmp(&a.date.value())
            .then_with(|| a.entry.slug.cmp(&b.entry.slug))
    });
    result.entries = indexed.into_iter().map(|i| i.entry).collect();
    Ok(result)
}

fn skip_or_abort(
    error: IndexError,
    path: &Path,
    policy: ErrorPolicy,
    result: &mut CollectionIndex,
) -> Result<(), IndexError> {
    match policy {
        ErrorPolicy::Abort => Err(error),
        ErrorPolicy::Skip => {
            warn!("skipping {}: {error}", path.display());
            result.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: error.to_string(),
            });
            Ok(())
        }
    }
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let mut children = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if !name.starts_with('.') {
            children.push(entry.into_path());
        }
    }
    Ok(children)
}

fn is_markdown(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("md"))
            .unwrap_or(false)
}

fn read_document(path: &Path) -> Result<Document, IndexError> {
    let source = fs::read_to_string(path)?;
    let doc = frontmatter::parse(&source).map_err(|source| IndexError::Frontmatter {
        path: path.to_path_buf(),
        source,
    })?;
    if !doc.ignored_lines.is_empty() {
        warn!(
            "{}: ignoring nested frontmatter on lines {:?}",
            path.display(),
            doc.ignored_lines
        );
    }
    Ok(doc)
}

fn index_flat_file(path: &Path, options: &IndexOptions) -> Result<Indexed, IndexError> {
    let slug = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let doc = read_document(path)?;
    let content = options
        .include_content
        .then(|| Localized::Text(doc.body.clone()));
    build_entry(
        &slug,
        &doc,
        path,
        Localized::Text(title_of(&doc)),
        Localized::Text(excerpt_of(&doc)),
        content,
        options,
    )
}

/// Language tag of an entry file: `index.md` → `""`, `index.tr.md` → `"tr"`.
fn language_of(file_name: &str) -> Option<&str> {
    let rest = file_name.strip_prefix("index")?;
    let rest = rest
        .strip_suffix(".md")
        .or_else(|| rest.strip_suffix(".MD"))?;
    match rest {
        "" => Some(""),
        tagged => {
            let lang = tagged.strip_prefix('.')?;
            (!lang.is_empty() && !lang.contains('.')).then_some(lang)
        }
    }
}

fn index_entry_dir(
    dir: &Path,
    options: &IndexOptions,
    result: &mut CollectionIndex,
) -> Result<Option<Indexed>, IndexError> {
    let slug = dir
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut docs: BTreeMap<String, (PathBuf, Document)> = BTreeMap::new();
    for path in sorted_children(dir)? {
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(lang) = language_of(&file_name) else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        let lang = if lang.is_empty() {
            options.default_language.clone()
        } else {
            lang.to_string()
        };
        let doc = read_document(&path)?;
        // An explicit index.<default>.md wins over a bare index.md.
        if lang == options.default_language && file_name.eq_ignore_ascii_case("index.md") {
            docs.entry(lang).or_insert((path, doc));
        } else {
            docs.insert(lang, (path, doc));
        }
    }

    let default_language = if docs.contains_key(&options.default_language) {
        options.default_language.clone()
    } else if let Some(first) = docs.keys().next() {
        first.clone()
    } else {
        warn!("{}: no index.<lang>.md files, skipping", dir.display());
        result.skipped.push(SkippedFile {
            path: dir.to_path_buf(),
            reason: "no index.<lang>.md files".to_string(),
        });
        return Ok(None);
    };

    let per_language = |f: &dyn Fn(&Document) -> String| {
        Localized::ByLanguage(
            docs.iter()
                .map(|(lang, (_, doc))| (lang.clone(), f(doc)))
                .collect(),
        )
    };
    let title = per_language(&title_of);
    let excerpt = per_language(&excerpt_of);
    let content = options
        .include_content
        .then(|| per_language(&|doc: &Document| doc.body.clone()));

    let (primary_path, primary) = &docs[&default_language];
    let mut indexed = build_entry(
        &slug,
        primary,
        primary_path,
        title,
        excerpt,
        content,
        options,
    )?;
    indexed.entry.languages = docs.keys().cloned().collect();
    indexed.entry.default_language = Some(default_language);
    Ok(Some(indexed))
}

/// Write entries as a pretty-printed JSON array, creating parent directories.
///
/// Each entry's identifier is written under `id_key`.
pub fn write_index(path: &Path, entries: &[ContentEntry], id_key: IdKey) -> Result<(), IndexError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let records = entries
        .iter()
        .map(|entry| index_record(entry, id_key))
        .collect::<Result<Vec<_>, _>>()?;
    let json = serde_json::to_string_pretty(&records)?;
    fs::write(path, json)?;
    Ok(())
}

fn index_record(entry: &ContentEntry, id_key: IdKey) -> Result<Value, serde_json::Error> {
    let value = serde_json::to_value(entry)?;
    Ok(match value {
        Value::Object(fields) if id_key != IdKey::Slug => Value::Object(
            fields
                .into_iter()
                .map(|(key, v)| match key.as_str() {
                    "slug" => (id_key.as_str().to_string(), v),
                    _ => (key, v),
                })
                .collect(),
        ),
        other => other,
    })
}

/// Index one configured collection and write its JSON index.
pub fn build_index(
    root: &Path,
    site: &SiteConfig,
    collection: &CollectionConfig,
    now: DateTime<Utc>,
) -> Result<CollectionIndex, IndexError> {
    let options = IndexOptions::from_config(site, collection, now);
    let index = index_collection(&collection.source_path(root), &options)?;
    write_index(&collection.index_path(root), &index.entries, collection.id_key)?;
    Ok(index)
}
