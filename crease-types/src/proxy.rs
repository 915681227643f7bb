//! Egress proxy records.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Basic-auth credentials for a proxy.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCredentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One egress proxy with an operator-seeded reliability prior and runtime counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRecord {
    /// Host name or address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Optional credentials.
    #[serde(default)]
    pub credentials: Option<ProxyCredentials>,
    /// ISO country code of the exit node.
    #[serde(default)]
    pub country: String,
    /// Static reliability prior in `[0, 1]`.
    pub reliability: f64,
    /// Successes since the last reset.
    #[serde(default)]
    pub success_count: u32,
    /// Failures since the last reset.
    #[serde(default)]
    pub failure_count: u32,
}

impl ProxyRecord {
    /// New proxy without credentials and with zeroed counters.
    pub fn new(host: impl Into<String>, port: u16, country: impl Into<String>, reliability: f64) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
            country: country.into(),
            reliability: reliability.clamp(0.0, 1.0),
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Attach basic-auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(ProxyCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// `host:port` identity used to match runtime reports back to the pool entry.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Runtime success rate; `0.0` when there is no data yet.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count.saturating_add(self.failure_count);
        if total == 0 {
            0.0
        } else {
            f64::from(self.success_count) / f64::from(total)
        }
    }

    /// Proxy URL suitable for an HTTP client (`http://host:port`).
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
