//! Share image resolution for prerendered pages.
//!
//! Each page gets one representative image for `og:image` and the frame
//! embed. Candidates are tried in priority order and the first usable one wins:
//!
//! 1. **Entry image**: the collection's `images` table, keyed by slug.
//! 2. **Part image**: the `part_images` table, keyed by the entry's `part`.
//! 3. **Collection default**: `default_image`, always present.
//!
//! This is a table lookup. With `verify_images` on, candidates that are local
//! files are also checked against the dist directory and skipped when
//! missing; the collection default is used even if missing, with a warning.

use crate::config::CollectionConfig;
use crate::types::ContentEntry;
use log::{debug, warn};
use std::path::Path;

/// Which lookup table produced the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Entry,
    Part(u32),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub source: ImageSource,
    /// Absolute URL used in meta tags.
    pub url: String,
}

/// Join a site-relative path onto the base URL. Absolute URLs pass through.
pub fn absolute_url(base_url: &str, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Candidate images for an entry, highest priority first.
pub fn candidates<'a>(
    collection: &'a CollectionConfig,
    entry: &ContentEntry,
) -> Vec<(ImageSource, &'a str)> {
    let mut found = Vec::with_capacity(3);
    if let Some(file) = collection.images.get(&entry.slug) {
        found.push((ImageSource::Entry, file.as_str()));
    }
    if let Some(part) = entry.part
        && let Some(file) = collection.part_images.get(&part.to_string())
    {
        found.push((ImageSource::Part(part), file.as_str()));
    }
    found.push((ImageSource::Default, collection.default_image.as_str()));
    found
}

/// Pick the share image for an entry.
///
/// `verify_in` is the dist directory when `verify_images` is on.
pub fn resolve_image(
    collection: &CollectionConfig,
    entry: &ContentEntry,
    base_url: &str,
    verify_in: Option<&Path>,
) -> ResolvedImage {
    let candidates = candidates(collection, entry);
    let (source, file) = candidates
        .iter()
        .copied()
        .find(|&(source, file)| match verify_in {
            Some(dist) if source != ImageSource::Default && !is_absolute_url(file) => {
                let exists = dist.join(file.trim_start_matches('/')).is_file();
                if !exists {
                    warn!(
                        "{}/{}: image {file} not found in {}, trying next candidate",
                        collection.prefix,
                        entry.slug,
                        dist.display()
                    );
                }
                exists
            }
            _ => true,
        })
        .unwrap_or((ImageSource::Default, collection.default_image.as_str()));

    if let Some(dist) = verify_in
        && source == ImageSource::Default
        && !is_absolute_url(file)
        && !dist.join(file.trim_start_matches('/')).is_file()
    {
        warn!(
            "{}: default image {file} not found in {}",
            collection.name,
            dist.display()
        );
    }

    debug!(
        "{}/{}: image {file} ({source:?})",
        collection.prefix, entry.slug
    );
    ResolvedImage {
        source,
        url: absolute_url(base_url, file),
    }
}
