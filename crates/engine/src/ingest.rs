//! Ingestion boundary: materialized activity snapshots.
//!
//! The engine does not fetch or page through remote sources itself — an
//! external collaborator materializes activity records, and this module is
//! the seam where those records enter: a JSON snapshot file on disk, parsed
//! and validated into strongly-typed [`TokenActivity`] records. Malformed
//! records are skipped with a warning; one bad row never aborts a batch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::types::{RawTokenActivity, TokenActivity};

/// Source of the latest materialized activity snapshot.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    async fn latest(&self) -> Result<Vec<TokenActivity>>;
}

/// Load and validate an activity snapshot file (JSON array of raw token
/// records). Malformed tokens and buyer sub-records are dropped with a
/// warning; the valid remainder is returned.
pub fn load_activity_snapshot(path: &Path) -> Result<Vec<TokenActivity>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read activity snapshot: {}", path.display()))?;

    let raw: Vec<RawTokenActivity> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse activity snapshot: {}", path.display()))?;

    let total = raw.len();
    let mut records = Vec::with_capacity(total);
    for raw_token in raw {
        match TokenActivity::from_raw(raw_token) {
            Ok(token) => records.push(token),
            Err(e) => warn!(error = %e, "skipping malformed token record"),
        }
    }

    debug!(
        path = %path.display(),
        total,
        valid = records.len(),
        "activity snapshot loaded"
    );
    Ok(records)
}

/// [`ActivityFeed`] that re-reads a snapshot file on every call, picking up
/// whatever the external ingestion process last wrote.
pub struct SnapshotFeed {
    path: PathBuf,
}

impl SnapshotFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ActivityFeed for SnapshotFeed {
    async fn latest(&self) -> Result<Vec<TokenActivity>> {
        let path = self.path.clone();
        // File parse is synchronous; keep it off the async executor threads.
        tokio::task::spawn_blocking(move || load_activity_snapshot(&path))
            .await
            .context("snapshot load task panicked")?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_snapshot(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const VALID_TOKEN: &str = r#"{
        "token_address": "Tok1",
        "name": "Test Coin",
        "symbol": "TEST",
        "kols_count": 1,
        "first_kol_buy": 1700000000,
        "last_kol_buy": 1700000100,
        "kol_buyers": [{
            "name": "alpha",
            "wallet_address": "W1",
            "avg_buy_price": 1.0,
            "avg_sell_price": 1.5,
            "avg_hold_time_seconds": 3600,
            "first_buy_at": 1700000000,
            "last_action": "sell",
            "position_status": "fully_sold",
            "realized_pnl_percent": 50.0,
            "realized_pnl_sol": 0.5,
            "total_buys": 1,
            "total_sells": 1,
            "total_volume_sol": 2.0
        }]
    }"#;

    #[test]
    fn loads_valid_snapshot() {
        let file = write_snapshot(&format!("[{VALID_TOKEN}]"));
        let records = load_activity_snapshot(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kol_buyers.len(), 1);
        assert_eq!(records[0].kol_buyers[0].name, "alpha");
    }

    #[test]
    fn malformed_token_skipped_batch_continues() {
        // Second record is missing token_address — dropped, not fatal.
        let file = write_snapshot(&format!(
            "[{VALID_TOKEN}, {{\"name\": \"broken\", \"symbol\": \"BRK\"}}]"
        ));
        let records = load_activity_snapshot(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn unparseable_file_errors() {
        let file = write_snapshot("not json");
        assert!(load_activity_snapshot(file.path()).is_err());
    }

    #[test]
    fn missing_file_errors_with_path() {
        let err = load_activity_snapshot(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(err.to_string().contains("snapshot"));
    }

    #[tokio::test]
    async fn snapshot_feed_rereads_file() {
        let file = write_snapshot("[]");
        let feed = SnapshotFeed::new(file.path());
        assert!(feed.latest().await.unwrap().is_empty());

        std::fs::write(file.path(), format!("[{VALID_TOKEN}]")).unwrap();
        assert_eq!(feed.latest().await.unwrap().len(), 1);
    }
}
