//! Social metadata for prerendered pages.
//!
//! Builds the `fc:frame` embed (a JSON object in a single `<meta>` tag that
//! tells Farcaster clients how to render the link as a launchable card) and
//! the Open Graph / Twitter tags that sit next to it.
//!
//! Tags are rendered with maud, so every attribute value, including the frame
//! JSON, is HTML-escaped.

use crate::config::FrameConfig;
use crate::image::absolute_url;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

/// Action type that opens the target URL inside the client.
pub const LAUNCH_ACTION: &str = "launch_frame";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEmbed {
    pub version: String,
    pub image_url: String,
    pub button: FrameButton,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameButton {
    pub title: String,
    pub action: FrameAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub name: String,
    pub splash_image_url: String,
    pub splash_background_color: String,
}

impl FrameEmbed {
    pub fn new(config: &FrameConfig, base_url: &str, image_url: &str, target_url: &str) -> Self {
        Self {
            version: config.version.clone(),
            image_url: image_url.to_string(),
            button: FrameButton {
                title: config.button_title.clone(),
                action: FrameAction {
                    kind: LAUNCH_ACTION.to_string(),
                    url: target_url.to_string(),
                    name: config.app_name.clone(),
                    splash_image_url: absolute_url(base_url, &config.splash_image),
                    splash_background_color: config.splash_background_color.clone(),
                },
            },
        }
    }
}

/// Everything a page's `<head>` needs for link previews.
#[derive(Debug)]
pub struct PageMeta<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub image_url: &'a str,
    pub page_url: &'a str,
    pub frame: &'a FrameEmbed,
}

/// Render the meta tag block injected before `</head>`.
pub fn render_meta_tags(meta: &PageMeta<'_>) -> Result<Markup, serde_json::Error> {
    let frame_json = serde_json::to_string(meta.frame)?;
    Ok(html! {
        meta property="og:title" content=(meta.title);
        @if !meta.description.is_empty() {
            meta property="og:description" content=(meta.description);
        }
        meta property="og:image" content=(meta.image_url);
        meta name="fc:frame" content=(frame_json);
        meta property="og:url" content=(meta.page_url);
        meta property="og:type" content="article";
        meta name="twitter:card" content="summary_large_image";
    })
}
