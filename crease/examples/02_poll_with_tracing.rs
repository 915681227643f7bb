mod common;

use std::sync::Arc;
use std::time::Duration;

use common::build_engine;
use crease_mock::RecordingBackend;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,crease=debug,crease_sources=debug
    // (build with --features tracing to see engine spans)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    let backend = Arc::new(RecordingBackend::new());
    let crease = Arc::new(build_engine(backend.clone())?);

    let (handle, mut rx) = crease.poll_match("IND-AUS", Duration::from_secs(5));
    for _ in 0..3 {
        match rx.recv().await {
            Some(Ok(s)) => println!(
                "{} {}/{} ({} ov) via {}",
                s.teams.team1.short_name,
                s.teams.team1.runs,
                s.teams.team1.wickets,
                s.teams.team1.overs,
                s.source
            ),
            Some(Err(e)) => println!("acquisition failed: {e}"),
            None => break,
        }
    }
    handle.stop().await;

    println!("{:#?}", crease.metrics());
    Ok(())
}
