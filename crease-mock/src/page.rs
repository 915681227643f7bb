use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crease_core::{CreaseError, FetchRequest, PageExtractor, PageFetcher};

use crate::MockBehavior;

/// In-memory page answering rule queries from a lookup table.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    url: String,
    texts: HashMap<String, String>,
    lists: HashMap<String, Vec<String>>,
}

impl FakePage {
    /// Empty page at `url`; every rule matches nothing.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Make `rule` match a single element with `text`.
    #[must_use]
    pub fn with_text(mut self, rule: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(rule.into(), text.into());
        self
    }

    /// Make `rule` match several elements.
    #[must_use]
    pub fn with_all<I, S>(mut self, rule: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists
            .insert(rule.into(), lines.into_iter().map(Into::into).collect());
        self
    }
}

impl PageExtractor for FakePage {
    fn url(&self) -> &str {
        &self.url
    }

    fn query_text(&self, rule: &str) -> String {
        self.texts
            .get(rule)
            .cloned()
            .or_else(|| self.lists.get(rule).and_then(|l| l.first().cloned()))
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    }

    fn query_all(&self, rule: &str) -> Vec<String> {
        match self.lists.get(rule) {
            Some(lines) => lines.iter().map(|l| l.trim().to_string()).collect(),
            None => self
                .texts
                .get(rule)
                .map(|t| vec![t.trim().to_string()])
                .unwrap_or_default(),
        }
    }
}

/// Page fetcher serving [`FakePage`]s by URL and logging every request.
///
/// Unknown URLs fail with a network error, like a 404 from a real site.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<String, MockBehavior<FakePage>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl FakeFetcher {
    /// Fetcher with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` at its own URL.
    #[must_use]
    pub fn with_page(self, page: FakePage) -> Self {
        self.set_page(page);
        self
    }

    /// Serve `page` at its own URL, replacing any previous route.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn set_page(&self, page: FakePage) {
        self.set_behavior(page.url.clone(), MockBehavior::Return(page));
    }

    /// Configure the behavior of one URL.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn set_behavior(&self, url: impl Into<String>, behavior: MockBehavior<FakePage>) {
        self.routes
            .lock()
            .expect("mutex poisoned")
            .insert(url.into(), behavior);
    }

    /// Every request received so far.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<Box<dyn PageExtractor>, CreaseError> {
        let behavior = {
            self.requests
                .lock()
                .expect("mutex poisoned")
                .push(req.clone());
            self.routes
                .lock()
                .expect("mutex poisoned")
                .get(&req.url)
                .cloned()
        };
        match behavior {
            Some(MockBehavior::Return(page)) => Ok(Box::new(page)),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => std::future::pending().await,
            None => Err(CreaseError::network(
                req.source.clone(),
                format!("HTTP 404 for {}", req.url),
            )),
        }
    }
}
