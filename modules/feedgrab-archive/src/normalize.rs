// URL canonicalization: every url field of a record goes through the same
// host rewrite, so the permalink and nested media can never disagree.

use feedgrab_common::{MediaRef, NormalizedRecord, RawRecord};
use url::Url;

/// Source host -> canonical public host.
///
/// Canonical hosts must not themselves be source hosts, otherwise a second
/// pass would rewrite again.
#[derive(Debug, Clone)]
pub struct HostMap {
    entries: Vec<(String, String)>,
}

impl Default for HostMap {
    fn default() -> Self {
        Self::new([
            ("x.com", "twitter.com"),
            ("www.x.com", "twitter.com"),
            ("mobile.x.com", "twitter.com"),
        ])
    }
}

impl HostMap {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(from, to)| (from.to_ascii_lowercase(), to.to_ascii_lowercase()))
                .collect(),
        }
    }

    fn canonical_host(&self, host: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(host))
            .map(|(_, to)| to.as_str())
    }

    /// Rewrite the host of `raw` if it is a source host. Anything else,
    /// including strings that are not absolute URLs, comes back unchanged.
    pub fn canonical_url(&self, raw: &str) -> String {
        let Ok(mut url) = Url::parse(raw) else {
            return raw.to_string();
        };
        let Some(canonical) = url.host_str().and_then(|h| self.canonical_host(h)) else {
            return raw.to_string();
        };
        let canonical = canonical.to_string();
        match url.set_host(Some(&canonical)) {
            Ok(()) => url.to_string(),
            Err(_) => raw.to_string(),
        }
    }

    pub fn normalize(&self, record: RawRecord) -> NormalizedRecord {
        NormalizedRecord {
            text: record.text,
            url: self.canonical_url(&record.url),
            published_at: record.published_at,
            media: record
                .media
                .into_iter()
                .map(|m| MediaRef {
                    kind: m.kind,
                    url: self.canonical_url(&m.url),
                })
                .collect(),
        }
    }
}
