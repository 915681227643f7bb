use std::sync::Mutex;

use crease_core::PageExtractor;
use scraper::{ElementRef, Html, Selector};

/// Parsed HTML page evaluating rules as CSS selectors.
///
/// The document is parsed once on construction. `scraper::Html` is `Send`
/// with atomic tendrils but not `Sync`, so queries take a short lock.
pub struct HtmlPage {
    url: String,
    doc: Mutex<Html>,
}

impl HtmlPage {
    /// Parse a fetched document.
    pub fn new(url: impl Into<String>, body: &str) -> Self {
        Self {
            url: url.into(),
            doc: Mutex::new(Html::parse_document(body)),
        }
    }

    /// # Panics
    /// Panics if the internal mutex is poisoned.
    fn select_texts(&self, rule: &str, limit: Option<usize>) -> Vec<String> {
        let Ok(selector) = Selector::parse(rule) else {
            return Vec::new();
        };
        let doc = self.doc.lock().expect("mutex poisoned");
        doc.select(&selector)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }
}

impl std::fmt::Debug for HtmlPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlPage").field("url", &self.url).finish_non_exhaustive()
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl PageExtractor for HtmlPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn query_text(&self, rule: &str) -> String {
        self.select_texts(rule, Some(1)).pop().unwrap_or_default()
    }

    fn query_all(&self, rule: &str) -> Vec<String> {
        self.select_texts(rule, None)
    }
}
