// Shared fixtures for the engine tests.
#![allow(dead_code)]
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crease::{Crease, CreaseBuilder, SourceAdapter, SourceId, Snapshot};
use crease_mock::fixtures::snapshots;
use crease_mock::{DynamicMockController, DynamicMockSource, MockSource, RecordingBackend};

pub const CRICBUZZ: &str = "cricbuzz";
pub const ESPN: &str = "espncricinfo";
pub const CREX: &str = "crex";
pub const IND_AUS: &str = "IND-AUS";

/// Static fixture source.
pub fn fixture_source(id: &str, reliability: f64) -> Arc<dyn SourceAdapter> {
    Arc::new(MockSource::new(id, reliability))
}

/// Scripted source and its controller.
pub fn scripted(id: &str, reliability: f64) -> (Arc<dyn SourceAdapter>, DynamicMockController) {
    DynamicMockSource::new_with_controller(id, reliability)
}

/// Builder with the given sources and a fresh recording backend.
pub fn builder(sources: Vec<Arc<dyn SourceAdapter>>) -> (CreaseBuilder, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::new());
    let mut b = Crease::builder()
        .backend(backend.clone())
        .scrape_timeout(Duration::from_millis(100));
    for s in sources {
        b = b.with_source(s);
    }
    (b, backend)
}

/// Built engine with the given sources.
pub fn engine(sources: Vec<Arc<dyn SourceAdapter>>) -> (Crease, Arc<RecordingBackend>) {
    let (b, backend) = builder(sources);
    (b.build().expect("valid engine"), backend)
}

/// India vs Australia as reported by `source`, captured now.
pub fn live(source: &str, reliability: f64) -> Snapshot {
    snapshots::live(IND_AUS, &SourceId::new(source), reliability)
}

/// [`live`] captured `secs_ago` seconds in the past.
pub fn live_at(source: &str, reliability: f64, secs_ago: i64) -> Snapshot {
    let mut s = live(source, reliability);
    s.captured_at = Utc::now() - chrono::Duration::seconds(secs_ago);
    s
}

pub fn id(s: &str) -> SourceId {
    SourceId::new(s)
}
