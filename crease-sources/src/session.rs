use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;

use crease_core::parse::{parse_count, parse_overs, parse_score, parse_team_name};
use crease_core::{
    CreaseError, FailureReport, FetchRequest, Field, PageExtractor, PageFetcher, ProxyPool,
    ProxyRecord, RuleSnapshot, RuleStore, SelectorHealthTracker, Snapshot,
    SourceBindings, SourceId, TeamScore, Teams, check_structure, mark_network_issued,
};

/// Commentary lines kept per snapshot unless overridden.
pub const DEFAULT_MAX_COMMENTARY_LINES: usize = 10;

/// Shared collaborators every source adapter is composed with.
#[derive(Clone)]
pub struct ScrapeContext {
    /// Extraction rules.
    pub rules: Arc<RuleStore>,
    /// Egress proxies.
    pub proxies: Arc<ProxyPool>,
    /// Failure log and auto-repair.
    pub selector_health: Arc<SelectorHealthTracker>,
    /// Page transport.
    pub fetcher: Arc<dyn PageFetcher>,
    /// Timeout of a single page fetch.
    pub request_timeout: Duration,
    /// Cap on commentary lines per snapshot.
    pub max_commentary_lines: usize,
}

impl ScrapeContext {
    /// Context with a 10 second fetch timeout and the default commentary cap.
    pub fn new(
        rules: Arc<RuleStore>,
        proxies: Arc<ProxyPool>,
        selector_health: Arc<SelectorHealthTracker>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            rules,
            proxies,
            selector_health,
            fetcher,
            request_timeout: Duration::from_secs(10),
            max_commentary_lines: DEFAULT_MAX_COMMENTARY_LINES,
        }
    }

    /// The shared components, for an engine to administer.
    #[must_use]
    pub fn bindings(&self) -> SourceBindings {
        SourceBindings {
            rules: Arc::clone(&self.rules),
            proxies: Arc::clone(&self.proxies),
            selector_health: Arc::clone(&self.selector_health),
        }
    }

    /// Override the per-fetch timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the commentary cap.
    #[must_use]
    pub const fn with_max_commentary_lines(mut self, lines: usize) -> Self {
        self.max_commentary_lines = lines;
        self
    }
}

/// Site-specific knobs of one source.
#[derive(Clone)]
pub struct SiteProfile {
    /// Source identifier, also the key into the rule document.
    pub id: SourceId,
    /// Display name.
    pub name: &'static str,
    /// Static reliability prior.
    pub reliability: f64,
    /// User-agent pool; one is picked at random per request.
    pub user_agents: &'static [&'static str],
    /// Nominal delay before each request, jittered by ±25%.
    pub rate_limit: Duration,
    /// Match page path relative to the configured base URL.
    pub match_path: fn(&str) -> String,
    /// Site-specific cleanup applied to every extracted text.
    pub clean: fn(Field, &str) -> String,
}

/// Common scrape pipeline shared by every source.
pub struct ScrapeSession {
    profile: SiteProfile,
    ctx: ScrapeContext,
}

/// Records a proxy failure if a fetch is dropped before it completes.
struct ProxyGuard {
    pool: Arc<ProxyPool>,
    proxy: Option<ProxyRecord>,
}

impl ProxyGuard {
    fn disarm(mut self) -> Option<ProxyRecord> {
        self.proxy.take()
    }
}

impl Drop for ProxyGuard {
    fn drop(&mut self) {
        if let Some(p) = self.proxy.take() {
            self.pool.record_failure(&p, "request cancelled");
        }
    }
}

impl ScrapeSession {
    /// Bind a site profile to the shared collaborators.
    #[must_use]
    pub const fn new(profile: SiteProfile, ctx: ScrapeContext) -> Self {
        Self { profile, ctx }
    }

    /// Site profile in use.
    #[must_use]
    pub const fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Shared collaborators in use.
    #[must_use]
    pub const fn context(&self) -> &ScrapeContext {
        &self.ctx
    }

    /// Absolute match page URL under the currently configured base URL.
    ///
    /// # Errors
    /// Returns `UnknownSource` when the rule document has no entry for this
    /// source and `InvalidConfig` when the base URL does not parse.
    pub fn match_url(&self, match_id: &str) -> Result<String, CreaseError> {
        let base = self
            .ctx
            .rules
            .base_url(&self.profile.id)
            .ok_or_else(|| CreaseError::UnknownSource(self.profile.id.to_string()))?;
        let base = url::Url::parse(&base)
            .map_err(|e| CreaseError::InvalidConfig(format!("{}: base url: {e}", self.profile.id)))?;
        let path = (self.profile.match_path)(match_id);
        let joined = base
            .join(&path)
            .map_err(|e| CreaseError::InvalidConfig(format!("{}: match url: {e}", self.profile.id)))?;
        Ok(joined.into())
    }

    /// Fetch the match page and turn it into a structurally valid snapshot.
    ///
    /// # Errors
    /// `NoProxyAvailable` when no proxy is eligible and direct connections are
    /// not allowed, `Network` on transport failure, and `InvalidData` when the
    /// extracted snapshot is structurally impossible.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "crease_sources::scrape",
            skip(self),
            fields(source = %self.profile.id),
        )
    )]
    pub async fn scrape(&self, match_id: &str) -> Result<Snapshot, CreaseError> {
        let id = &self.profile.id;
        let proxy = self.ctx.proxies.next();
        if proxy.is_none() && !self.ctx.proxies.allows_direct() {
            return Err(CreaseError::no_proxy(id.clone()));
        }
        let url = self.match_url(match_id)?;

        let (user_agent, delay) = {
            let mut rng = rand::rng();
            let ua = self
                .profile
                .user_agents
                .choose(&mut rng)
                .copied()
                .unwrap_or("Mozilla/5.0");
            let delay = if self.profile.rate_limit.is_zero() {
                Duration::ZERO
            } else {
                self.profile.rate_limit.mul_f64(rng.random_range(0.75..=1.25))
            };
            (ua.to_string(), delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let req = FetchRequest {
            source: id.clone(),
            url,
            proxy: proxy.clone(),
            user_agent,
            timeout: self.ctx.request_timeout,
        };
        let guard = ProxyGuard {
            pool: Arc::clone(&self.ctx.proxies),
            proxy,
        };
        mark_network_issued();
        let fetched = self.ctx.fetcher.fetch(&req).await;
        let proxy = guard.disarm();
        let page = match fetched {
            Ok(page) => {
                if let Some(p) = &proxy {
                    self.ctx.proxies.record_success(p);
                }
                page
            }
            Err(e) => {
                if let Some(p) = &proxy
                    && e.is_network()
                {
                    self.ctx.proxies.record_failure(p, &e.to_string());
                }
                return Err(e);
            }
        };

        let snapshot = self.extract(match_id, page.as_ref());
        let violations = check_structure(&snapshot, None);
        if !violations.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(source = %id, match_id, count = violations.len(), "scraped data rejected");
            return Err(CreaseError::invalid_data(
                id.clone(),
                violations.into_iter().map(|(_, detail)| detail).collect(),
            ));
        }
        Ok(snapshot)
    }

    fn extract(&self, match_id: &str, page: &dyn PageExtractor) -> Snapshot {
        let rules = self.ctx.rules.snapshot();
        let text = |field: Field| self.field_text(&rules, field, page);

        let team1 = team_score(
            text(Field::Team1Name),
            text(Field::Team1Score),
            text(Field::Team1Wickets),
            text(Field::Team1Overs),
        );
        let team2 = team_score(
            text(Field::Team2Name),
            text(Field::Team2Score),
            text(Field::Team2Wickets),
            text(Field::Team2Overs),
        );
        let commentary_lines = self.commentary(&rules, page);

        Snapshot {
            match_id: match_id.to_string(),
            source: self.profile.id.clone(),
            teams: Teams { team1, team2 },
            commentary_lines,
            captured_at: Utc::now(),
            reliability: self.profile.reliability,
            format: crease_core::MatchFormat::default(),
        }
    }

    /// First non-empty text along the field's rule chain, or `None` after the
    /// failure has been reported.
    fn field_text(&self, rules: &RuleSnapshot, field: Field, page: &dyn PageExtractor) -> Option<String> {
        let chain = rules.chain(&self.profile.id, field);
        let hit = chain.iter().find_map(|rule| {
            let cleaned = (self.profile.clean)(field, &page.query_text(rule));
            (!cleaned.is_empty()).then_some(cleaned)
        });
        match hit {
            Some(text) => {
                self.ctx.selector_health.record_success(&self.profile.id, field);
                Some(text)
            }
            None => {
                self.report_failure(rules, field, page, &chain);
                None
            }
        }
    }

    fn commentary(&self, rules: &RuleSnapshot, page: &dyn PageExtractor) -> Vec<String> {
        let field = Field::Commentary;
        let chain = rules.chain(&self.profile.id, field);
        for rule in &chain {
            let lines: Vec<String> = page
                .query_all(rule)
                .iter()
                .map(|l| (self.profile.clean)(field, l))
                .filter(|l| !l.is_empty())
                .take(self.ctx.max_commentary_lines)
                .collect();
            if !lines.is_empty() {
                self.ctx.selector_health.record_success(&self.profile.id, field);
                return lines;
            }
        }
        self.report_failure(rules, field, page, &chain);
        Vec::new()
    }

    fn report_failure(
        &self,
        rules: &RuleSnapshot,
        field: Field,
        page: &dyn PageExtractor,
        attempted: &[String],
    ) {
        let report = FailureReport {
            source: &self.profile.id,
            field,
            url: page.url(),
            rule: rules.primary(&self.profile.id, field).unwrap_or(""),
            attempted,
        };
        let outcome = self.ctx.selector_health.record_failure(report, Some(page));
        #[cfg(feature = "tracing")]
        tracing::debug!(source = %self.profile.id, field = %field, ?outcome, "selector failure recorded");
        #[cfg(not(feature = "tracing"))]
        let _ = outcome;
    }
}

fn team_score(
    name: Option<String>,
    score: Option<String>,
    wickets: Option<String>,
    overs: Option<String>,
) -> TeamScore {
    let (name, short_name) = name.as_deref().map(parse_team_name).unwrap_or_default();
    let (runs, embedded_wickets) = score.as_deref().map_or((0, None), parse_score);
    let wickets = wickets
        .as_deref()
        .map(parse_count)
        .or(embedded_wickets)
        .unwrap_or(0);
    TeamScore {
        name,
        short_name,
        runs,
        wickets,
        overs: overs.as_deref().map_or(0.0, parse_overs),
    }
}
