// ItemNode over parsed HTML fragments captured from the live page.

use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::extract::{extract_records, ItemNode, TEXT_BODY};
use crate::page::CapturedItems;
use feedgrab_common::RawRecord;

/// Elements whose contents never render as text.
const NON_RENDERED: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy)]
pub struct HtmlItem<'a> {
    el: ElementRef<'a>,
    base: Option<&'a Url>,
    /// Text the page rendered for one element of this item.
    rendered: Option<(ElementRef<'a>, &'a str)>,
}

impl<'a> HtmlItem<'a> {
    pub fn new(el: ElementRef<'a>, base: Option<&'a Url>) -> Self {
        Self {
            el,
            base,
            rendered: None,
        }
    }

    /// Report `text` instead of the markup's text when `body` is read.
    pub fn with_rendered_text(mut self, body: ElementRef<'a>, text: &'a str) -> Self {
        self.rendered = Some((body, text));
        self
    }

    fn wrap(&self, el: ElementRef<'a>) -> Self {
        Self { el, ..*self }
    }

    /// Resolve a link the way the browser's `href`/`src` properties do.
    fn resolve(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(url) => Some(url.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.base?.join(raw).ok().map(|u| u.to_string())
            }
            Err(_) => None,
        }
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(css, error = %e, "invalid selector");
            None
        }
    }
}

impl<'a> ItemNode for HtmlItem<'a> {
    fn select_first(&self, css: &str) -> Option<Self> {
        let sel = selector(css)?;
        self.el.select(&sel).next().map(|el| self.wrap(el))
    }

    fn select_all(&self, css: &str) -> Vec<Self> {
        let Some(sel) = selector(css) else {
            return Vec::new();
        };
        self.el.select(&sel).map(|el| self.wrap(el)).collect()
    }

    fn closest(&self, css: &str) -> Option<Self> {
        let sel = selector(css)?;
        std::iter::once(self.el)
            .chain(self.el.ancestors().filter_map(ElementRef::wrap))
            .find(|el| sel.matches(el))
            .map(|el| self.wrap(el))
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.el.value().attr(name).map(str::to_string)
    }

    fn href(&self) -> Option<String> {
        self.resolve(self.el.value().attr("href")?)
    }

    fn src(&self) -> Option<String> {
        self.resolve(self.el.value().attr("src")?)
    }

    fn text(&self) -> String {
        if let Some((body, text)) = self.rendered {
            if body == self.el {
                return text.to_string();
            }
        }
        let mut out = String::new();
        push_visible_text(self.el, &mut out);
        out
    }
}

/// Text of `el` as far as its markup shows: non-rendered and hidden
/// subtrees are skipped, `<br>` becomes a newline.
fn push_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let value = child_el.value();
            if value.name() == "br" {
                out.push('\n');
            } else if !is_hidden(value) {
                push_visible_text(child_el, out);
            }
        }
    }
}

fn is_hidden(el: &Element) -> bool {
    if NON_RENDERED.contains(&el.name()) || el.attr("hidden").is_some() {
        return true;
    }
    el.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

/// Parse captured item markup and extract records from the first `cap` items.
pub fn extract_captured(captured: &CapturedItems, cap: usize) -> Vec<RawRecord> {
    let base = captured.base_url.as_deref().and_then(|u| Url::parse(u).ok());
    let body_selector = selector(TEXT_BODY);
    let documents: Vec<(Html, Option<&str>)> = captured
        .items
        .iter()
        .take(cap)
        .map(|item| (Html::parse_fragment(&item.html), item.text.as_deref()))
        .collect();
    let nodes: Vec<HtmlItem<'_>> = documents
        .iter()
        .map(|(doc, text)| {
            let root = doc.root_element();
            let item = HtmlItem::new(root, base.as_ref());
            let body = body_selector
                .as_ref()
                .and_then(|sel| root.select(sel).next());
            match (body, *text) {
                (Some(body), Some(text)) => item.with_rendered_text(body, text),
                _ => item,
            }
        })
        .collect();

    let records = extract_records(&nodes, cap);
    debug!(
        captured = captured.items.len(),
        extracted = records.len(),
        "extract: parsed captured items"
    );
    records
}
