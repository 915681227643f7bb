use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use crease_core::{CreaseError, FetchRequest, PageExtractor, PageFetcher, ProxyRecord};

use crate::html::HtmlPage;

const DIRECT: &str = "direct";

/// Production page fetcher backed by `reqwest`.
///
/// `reqwest` binds proxies to a client, so one client is kept per proxy
/// endpoint and reused across requests.
pub struct HttpFetcher {
    connect_timeout: Duration,
    clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Fetcher with a 5 second connect timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connect_timeout(Duration::from_secs(5))
    }

    /// Fetcher with a custom connect timeout.
    #[must_use]
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn build_client(&self, proxy: Option<&ProxyRecord>, req: &FetchRequest) -> Result<reqwest::Client, CreaseError> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.connect_timeout);
        if let Some(p) = proxy {
            let mut rp = reqwest::Proxy::all(p.url())
                .map_err(|e| CreaseError::InvalidConfig(format!("proxy {}: {e}", p.endpoint())))?;
            if let Some(c) = &p.credentials {
                rp = rp.basic_auth(&c.username, &c.password);
            }
            builder = builder.proxy(rp);
        } else {
            builder = builder.no_proxy();
        }
        builder
            .build()
            .map_err(|e| CreaseError::network(req.source.clone(), format!("client setup: {e}")))
    }

    /// # Panics
    /// Panics if the internal mutex is poisoned.
    fn client_for(&self, req: &FetchRequest) -> Result<reqwest::Client, CreaseError> {
        let key = req
            .proxy
            .as_ref()
            .map_or_else(|| DIRECT.to_string(), ProxyRecord::endpoint);
        if let Some(c) = self.clients.lock().expect("mutex poisoned").get(&key) {
            return Ok(c.clone());
        }
        let client = self.build_client(req.proxy.as_ref(), req)?;
        self.clients
            .lock()
            .expect("mutex poisoned")
            .insert(key, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<Box<dyn PageExtractor>, CreaseError> {
        let client = self.client_for(req)?;
        let net = |e: reqwest::Error| CreaseError::network(req.source.clone(), e.to_string());
        let resp = client
            .get(&req.url)
            .header(reqwest::header::USER_AGENT, &req.user_agent)
            .timeout(req.timeout)
            .send()
            .await
            .map_err(net)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CreaseError::network(
                req.source.clone(),
                format!("HTTP {} for {}", status.as_u16(), req.url),
            ));
        }
        let body = resp.text().await.map_err(net)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(source = %req.source, url = %req.url, bytes = body.len(), "page fetched");
        Ok(Box::new(HtmlPage::new(req.url.clone(), &body)))
    }
}
