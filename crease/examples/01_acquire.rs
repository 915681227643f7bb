mod common;

use std::sync::Arc;

use common::build_engine;
use crease_mock::RecordingBackend;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. A backend that keeps every accepted snapshot in memory.
    let backend = Arc::new(RecordingBackend::new());

    // 2. Build the engine over the configured sources.
    let crease = build_engine(backend.clone())?;

    // 3. Acquire one match. Failover and cross-checking happen inside.
    let match_id = std::env::args().nth(1).unwrap_or_else(|| "IND-AUS".to_string());
    println!("Acquiring {match_id}...");
    let snapshot = crease.acquire(&match_id).await?;
    println!("{snapshot:#?}");

    // 4. What the engine saw along the way.
    println!("{}", serde_json::to_string_pretty(&crease.health_report())?);
    Ok(())
}
