use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crease_core::{
    CreaseError, Field, QuotaConfig, Snapshot, SourceAdapter, SourceBindings, SourceId,
};
use crease_middleware::SourceBuilder;

use crate::session::{ScrapeContext, ScrapeSession, SiteProfile};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0",
];

fn match_path(match_id: &str) -> String {
    format!("scoreboard/{match_id}/live")
}

fn clean(field: Field, text: &str) -> String {
    let text = text.trim();
    match field {
        // Batting side is marked with a trailing asterisk.
        Field::Team1Name | Field::Team2Name => text.trim_end_matches('*').trim_end().to_string(),
        _ => text.to_string(),
    }
}

/// CREX live score pages.
pub struct CrexSource {
    session: ScrapeSession,
}

impl CrexSource {
    /// Identifier and rule document key.
    pub const KEY: &'static str = "crex";

    /// Static reliability prior.
    pub const RELIABILITY: f64 = 0.75;

    /// Site profile with the default pacing of one request every ~1 second.
    #[must_use]
    pub fn profile() -> SiteProfile {
        SiteProfile {
            id: SourceId::new(Self::KEY),
            name: "CREX",
            reliability: Self::RELIABILITY,
            user_agents: USER_AGENTS,
            rate_limit: Duration::from_secs(1),
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

    /// Returns a builder with a budget of 40 scrapes per minute.
    #[must_use]
    pub fn rate_limited(ctx: ScrapeContext) -> SourceBuilder {
        let raw: Arc<dyn SourceAdapter> = Arc::new(Self::new(ctx));
        SourceBuilder::new(raw).with_quota(&QuotaConfig {
            limit: 40,
            window: Duration::from_secs(60),
        })
    }
}

#[async_trait]
impl SourceAdapter for CrexSource {
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
