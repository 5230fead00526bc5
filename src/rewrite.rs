//! Text-level rewrites of the SPA shell.
//!
//! A prerendered page at `/blog/my-post/index.html` sits two levels below the
//! site root, so the shell's root-relative `src="/..."` and `href="/..."`
//! references are rewritten to `../../...`. Both functions here are pure: each
//! target starts from the pristine shell.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `src="/x"` or `href="/x"`, excluding protocol-relative `//host` values and
/// prefixed names such as `data-src`.
static ROOT_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<lead>^|\s)(?P<attr>src|href)="/(?P<next>[^/])"#).expect("static regex")
});

/// Rewrite root-relative asset references for a page `depth` levels deep.
///
/// `depth == 0` returns the template unchanged.
pub fn rewrite_asset_paths(template: &str, depth: usize) -> String {
    if depth == 0 {
        return template.to_string();
    }
    let up = "../".repeat(depth);
    ROOT_RELATIVE
        .replace_all(template, |caps: &Captures<'_>| {
            format!("{}{}=\"{up}{}", &caps["lead"], &caps["attr"], &caps["next"])
        })
        .into_owned()
}

/// Insert `tags` immediately before the first `</head>`.
///
/// Returns `None` if the document has no `</head>`.
pub fn inject_head(html: &str, tags: &str) -> Option<String> {
    let at = html.find("</head>")?;
    let mut out = String::with_capacity(html.len() + tags.len() + 8);
    out.push_str(&html[..at]);
    out.push_str(tags);
    out.push_str("\n  ");
    out.push_str(&html[at..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SHELL, asset_refs};

    #[test]
    fn depth_two_prefixes_root_relative_refs() {
        let out = rewrite_asset_paths(SHELL, 2);
        assert!(out.contains(r#"src="../../assets/index-3f2a.js""#));
        assert!(out.contains(r#"href="../../assets/index-9c1d.css""#));
        assert!(out.contains(r#"href="../../favicon.ico""#));
    }

    #[test]
    fn every_root_relative_ref_gets_exactly_depth_prefixes() {
        let originals = asset_refs(SHELL);
        for depth in 1..=4 {
            let rewritten = asset_refs(&rewrite_asset_paths(SHELL, depth));
            assert_eq!(originals.len(), rewritten.len());
            let up = "../".repeat(depth);
            for (before, after) in originals.iter().zip(&rewritten) {
                if let Some(rest) = before.strip_prefix('/') {
                    assert_eq!(after, &format!("{up}{rest}"));
                    assert!(!after[up.len()..].starts_with("../"));
                } else {
                    assert_eq!(after, before);
                }
            }
        }
    }

    #[test]
    fn absolute_and_protocol_relative_urls_untouched() {
        let html = r#"<a href="https://example.com/x"></a><script src="//cdn.example/x.js"></script>"#;
        assert_eq!(rewrite_asset_paths(html, 2), html);
    }

    #[test]
    fn bare_root_href_becomes_relative_dir() {
        assert_eq!(
            rewrite_asset_paths(r#"<a href="/">Home</a>"#, 2),
            r#"<a href="../../">Home</a>"#
        );
    }

    #[test]
    fn other_attributes_untouched() {
        let html = r#"<meta content="/not-an-asset"><form action="/submit"></form>"#;
        assert_eq!(rewrite_asset_paths(html, 3), html);
    }

    #[test]
    fn template_is_not_mutated_between_targets() {
        let first = rewrite_asset_paths(SHELL, 2);
        let second = rewrite_asset_paths(SHELL, 3);
        assert!(first.contains(r#"src="../../assets/"#));
        assert!(second.contains(r#"src="../../../assets/"#));
        assert!(!second.contains(r#""../../../../../"#));
    }

    #[test]
    fn data_attributes_untouched() {
        let html = r#"<img data-src="/lazy.png" src="/eager.png"><a data-href="/x" href="/y">"#;
        assert_eq!(
            rewrite_asset_paths(html, 2),
            r#"<img data-src="/lazy.png" src="../../eager.png"><a data-href="/x" href="../../y">"#
        );
    }

    #[test]
    fn attribute_after_newline_rewritten() {
        assert_eq!(
            rewrite_asset_paths("<script\n  src=\"/a.js\"></script>", 1),
            "<script\n  src=\"../a.js\"></script>"
        );
    }

    #[test]
    fn depth_zero_is_identity() {
        assert_eq!(rewrite_asset_paths(SHELL, 0), SHELL);
    }

    #[test]
    fn inject_head_places_tags_before_first_close() {
        let out = inject_head("<head><title>x</title></head><body></body>", "<meta a>").unwrap();
        assert_eq!(out, "<head><title>x</title><meta a>\n  </head><body></body>");
    }

    #[test]
    fn inject_head_requires_head() {
        assert_eq!(inject_head("<body></body>", "<meta a>"), None);
    }
}
