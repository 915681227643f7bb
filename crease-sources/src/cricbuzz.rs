use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crease_core::{
    CreaseError, Field, QuotaConfig, Snapshot, SourceAdapter, SourceBindings, SourceId,
};
use crease_middleware::SourceBuilder;

use crate::session::{ScrapeContext, ScrapeSession, SiteProfile};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

fn match_path(match_id: &str) -> String {
    format!("live-cricket-scores/{match_id}")
}

fn clean(field: Field, text: &str) -> String {
    let text = text.trim();
    match field {
        // Ball-by-ball rows carry a trailing "Live" badge.
        Field::Commentary => text
            .strip_suffix("Live")
            .unwrap_or(text)
            .trim_end()
            .to_string(),
        _ => text.to_string(),
    }
}

/// Cricbuzz live score pages.
pub struct CricbuzzSource {
    session: ScrapeSession,
}

impl CricbuzzSource {
    /// Identifier and rule document key.
    pub const KEY: &'static str = "cricbuzz";

    /// Static reliability prior.
    pub const RELIABILITY: f64 = 0.9;

    /// Site profile with the default pacing of one request every ~1.5 seconds.
    #[must_use]
    pub fn profile() -> SiteProfile {
        SiteProfile {
            id: SourceId::new(Self::KEY),
            name: "Cricbuzz",
            reliability: Self::RELIABILITY,
            user_agents: USER_AGENTS,
            rate_limit: Duration::from_millis(1500),
            match_path,
            clean,
        }
    }

    /// Build the raw adapter over shared collaborators.
    #[must_use]
    pub fn new(ctx: ScrapeContext) -> Self {
        Self::with_profile(Self::profile(), ctx)
    }

    /// Build with a customized profile (pacing, reliability, user agents).
    #[must_use]
    pub const fn with_profile(profile: SiteProfile, ctx: ScrapeContext) -> Self {
        Self {
            session: ScrapeSession::new(profile, ctx),
        }
    }

    /// Returns a builder with a budget of 30 scrapes per minute.
    ///
    /// Users can further customize before calling `.build()`.
    #[must_use]
    pub fn rate_limited(ctx: ScrapeContext) -> SourceBuilder {
        let raw: Arc<dyn SourceAdapter> = Arc::new(Self::new(ctx));
        SourceBuilder::new(raw).with_quota(&QuotaConfig {
            limit: 30,
            window: Duration::from_secs(60),
        })
    }
}

#[async_trait]
impl SourceAdapter for CricbuzzSource {
    fn id(&self) -> SourceId {
        self.session.profile().id.clone()
    }

    fn name(&self) -> String {
        self.session.profile().name.to_string()
    }

    fn reliability(&self) -> f64 {
        self.session.profile().reliability
    }

    fn bindings(&self) -> Option<SourceBindings> {
        Some(self.session.context().bindings())
    }

    async fn scrape(&self, match_id: &str) -> Result<Snapshot, CreaseError> {
        self.session.scrape(match_id).await
    }
}
