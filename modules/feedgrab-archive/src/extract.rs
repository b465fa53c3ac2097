// Structured extraction: rendered item nodes -> RawRecords.
//
// Each item is handled on its own. A node without a permalink, timestamp or
// text body yields nothing and never fails the run.

use std::collections::HashSet;

use feedgrab_common::{parse_timestamp, MediaRef, RawRecord};
use tracing::debug;

/// Item container on the profile stream.
pub const ITEM_SELECTOR: &str = "article[data-testid='tweet']";
/// The timestamp inside the item's permalink anchor.
pub const PERMALINK_TIME: &str = "a[href*='/status/'] time";
pub const TEXT_BODY: &str = "div[data-testid='tweetText']";
pub const VIDEO_PLAYER: &str = "div[data-testid='videoPlayer']";
/// An embedded (quoted) item.
pub const QUOTED_ITEM: &str = "div[role='link'][tabindex='0']";
pub const PHOTO_IMAGES: &str = "div[data-testid='tweetPhoto'] img";

/// Minimal read-only view of a rendered DOM node.
pub trait ItemNode: Sized {
    /// First descendant matching a CSS selector.
    fn select_first(&self, selector: &str) -> Option<Self>;

    /// All descendants matching a CSS selector, in document order.
    fn select_all(&self, selector: &str) -> Vec<Self>;

    /// Nearest inclusive ancestor matching a CSS selector.
    fn closest(&self, selector: &str) -> Option<Self>;

    fn attr(&self, name: &str) -> Option<String>;

    /// Absolute link target of an anchor.
    fn href(&self) -> Option<String>;

    /// Absolute source of an image.
    fn src(&self) -> Option<String>;

    /// Visible text, verbatim.
    fn text(&self) -> String;
}

/// Extract records from the first `cap` nodes, preserving document order.
pub fn extract_records<N: ItemNode>(nodes: &[N], cap: usize) -> Vec<RawRecord> {
    nodes.iter().take(cap).filter_map(extract_record).collect()
}

/// Extract one record, or `None` if the node is malformed.
pub fn extract_record<N: ItemNode>(node: &N) -> Option<RawRecord> {
    let Some(time) = node.select_first(PERMALINK_TIME) else {
        debug!("extract: skipping item without permalink timestamp");
        return None;
    };
    let published_at = time.attr("datetime").filter(|d| !d.trim().is_empty())?;
    if let Err(e) = parse_timestamp(&published_at) {
        debug!(error = %e, "extract: skipping item with unparseable timestamp");
        return None;
    }
    let Some(url) = time.closest("a").and_then(|a| a.href()).filter(|h| !h.is_empty()) else {
        debug!("extract: skipping item without permalink");
        return None;
    };
    let Some(body) = node.select_first(TEXT_BODY) else {
        debug!(%url, "extract: skipping item without text body");
        return None;
    };

    // Video wins over images: players also expose poster images.
    let media = if node.select_first(VIDEO_PLAYER).is_some() {
        let target = quoted_permalink(node).unwrap_or_else(|| url.clone());
        vec![MediaRef::video_post(target)]
    } else {
        images(node)
    };

    Some(RawRecord {
        text: body.text(),
        url,
        published_at,
        media,
    })
}

/// Permalink of the quoted item, when the item embeds one with its own timestamp link.
fn quoted_permalink<N: ItemNode>(node: &N) -> Option<String> {
    node.select_first(QUOTED_ITEM)?
        .select_first("time")?
        .closest("a")?
        .href()
        .filter(|h| !h.is_empty())
}

fn images<N: ItemNode>(node: &N) -> Vec<MediaRef> {
    let mut seen = HashSet::new();
    node.select_all(PHOTO_IMAGES)
        .iter()
        .filter_map(|img| img.src())
        .filter(|src| !src.is_empty() && seen.insert(src.clone()))
        .map(MediaRef::image)
        .collect()
}

/// Newest first. Compares timestamps as strings, which is only correct while
/// every timestamp uses the same fixed offset (the page renders UTC `Z`).
pub fn sort_newest_first(records: &mut [RawRecord]) {
    records.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
