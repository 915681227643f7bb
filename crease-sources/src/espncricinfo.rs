use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crease_core::{
    CreaseError, Field, QuotaConfig, Snapshot, SourceAdapter, SourceBindings, SourceId,
};
use crease_middleware::SourceBuilder;

use crate::session::{ScrapeContext, ScrapeSession, SiteProfile};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
];

fn match_path(match_id: &str) -> String {
    format!("live-cricket-score/{match_id}")
}

fn clean(field: Field, text: &str) -> String {
    let text = text.trim();
    match field {
        // Overs render as "(17.5 ov)" or "17.5/20 ov".
        Field::Team1Overs | Field::Team2Overs => {
            let inner = text.trim_start_matches('(').trim_end_matches(')');
            let inner = inner.trim_end_matches("ov").trim();
            inner.split('/').next().unwrap_or("").trim().to_string()
        }
        Field::Commentary => text.trim_start_matches('•').trim().to_string(),
        _ => text.to_string(),
    }
}

/// ESPNcricinfo live score pages.
pub struct EspnCricinfoSource {
    session: ScrapeSession,
}

impl EspnCricinfoSource {
    /// Identifier and rule document key.
    pub const KEY: &'static str = "espncricinfo";

    /// Static reliability prior.
    pub const RELIABILITY: f64 = 0.85;

    /// Site profile with the default pacing of one request every ~2 seconds.
    #[must_use]
    pub fn profile() -> SiteProfile {
        SiteProfile {
            id: SourceId::new(Self::KEY),
            name: "ESPNcricinfo",
            reliability: Self::RELIABILITY,
            user_agents: USER_AGENTS,
            rate_limit: Duration::from_secs(2),
            match_path,
            clean,
        }
    }

    /// Build the raw adapter over shared collaborators.
    #[must_use]
    pub fn new(ctx: ScrapeContext) -> Self {
        Self::with_profile(Self::profile(), ctx)
    }

    /// Build with a customized profile.
    #[must_use]
    pub const fn with_profile(profile: SiteProfile, ctx: ScrapeContext) -> Self {
        Self {
            session: ScrapeSession::new(profile, ctx),
        }
    }

    /// Returns a builder with a budget of 20 scrapes per minute.
    #[must_use]
    pub fn rate_limited(ctx: ScrapeContext) -> SourceBuilder {
        let raw: Arc<dyn SourceAdapter> = Arc::new(Self::new(ctx));
        SourceBuilder::new(raw).with_quota(&QuotaConfig {
            limit: 20,
            window: Duration::from_secs(60),
        })
    }
}

#[async_trait]
impl SourceAdapter for EspnCricinfoSource {
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
