/// Snapshot fixtures.
pub mod snapshots;
