//! Recurring alert-scan task with explicit lifecycle and single-flight
//! suppression.
//!
//! Replaces a bare interval timer: the scheduler runs under a
//! `CancellationToken`, and a scan started while another is in flight (a
//! manual trigger racing the timer) is suppressed rather than stacked, so
//! the same watch config can never race itself into duplicate alerts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::alerts::AlertMatcher;
use crate::ingest::ActivityFeed;
use crate::types::{AlertEvent, WatchConfig};

/// Recurring scheduler driving [`AlertMatcher`] scans.
pub struct AlertScheduler {
    matcher: Arc<AlertMatcher>,
    feed: Arc<dyn ActivityFeed>,
    watches: Vec<WatchConfig>,
    interval: Duration,
    event_tx: mpsc::Sender<AlertEvent>,
    shutdown: CancellationToken,
    in_flight: AtomicBool,
}

impl AlertScheduler {
    pub fn new(
        matcher: Arc<AlertMatcher>,
        feed: Arc<dyn ActivityFeed>,
        watches: Vec<WatchConfig>,
        interval: Duration,
        event_tx: mpsc::Sender<AlertEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            matcher,
            feed,
            watches,
            interval,
            event_tx,
            shutdown,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Main scan loop. Runs until the CancellationToken is cancelled.
    pub async fn run(&self) -> Result<()> {
        info!(
            interval_s = self.interval.as_secs(),
            watches = self.watches.len(),
            "alert scheduler started"
        );

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("alert scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.scan_now().await;
                }
            }
        }

        Ok(())
    }

    /// Run one scan immediately.
    ///
    /// Returns `false` if another scan was already in flight (the invocation
    /// was suppressed). Safe to call concurrently with the timer loop.
    pub async fn scan_now(&self) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("alert scan already in progress — suppressing overlapping run");
            return false;
        }

        let outcome = self.scan_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);

        if let Err(e) = outcome {
            error!(error = %e, "alert scan failed");
        }
        true
    }

    async fn scan_inner(&self) -> Result<()> {
        let records = self.feed.latest().await?;
        let now = now_unix();

        let events = self.matcher.check_alerts(&self.watches, &records, now);
        debug!(records = records.len(), events = events.len(), "alert scan tick");

        for event in events {
            if self.event_tx.send(event).await.is_err() {
                warn!("alert channel closed — dropping remaining events");
                break;
            }
        }
        Ok(())
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertsConfig;
    use crate::types::TokenActivity;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Feed that blocks until released, to hold a scan in flight.
    struct GatedFeed {
        gate: Notify,
    }

    #[async_trait]
    impl ActivityFeed for GatedFeed {
        async fn latest(&self) -> Result<Vec<TokenActivity>> {
            self.gate.notified().await;
            Ok(Vec::new())
        }
    }

    fn scheduler(feed: Arc<dyn ActivityFeed>) -> (Arc<AlertScheduler>, mpsc::Receiver<AlertEvent>) {
        let config = AlertsConfig {
            enabled: true,
            interval_seconds: 30,
            recency_window_seconds: 300,
            max_tokens_per_scan: 50,
            channel_capacity: 8,
            watches: Vec::new(),
        };
        let (tx, rx) = mpsc::channel(8);
        let sched = AlertScheduler::new(
            Arc::new(AlertMatcher::new(config)),
            feed,
            Vec::new(),
            Duration::from_secs(30),
            tx,
            CancellationToken::new(),
        );
        (Arc::new(sched), rx)
    }

    #[tokio::test]
    async fn overlapping_scan_is_suppressed() {
        let feed = Arc::new(GatedFeed { gate: Notify::new() });
        let (sched, _rx) = scheduler(feed.clone());

        // First scan blocks inside the feed.
        let first = {
            let sched = sched.clone();
            tokio::spawn(async move { sched.scan_now().await })
        };
        tokio::task::yield_now().await;

        // Second scan must be suppressed while the first is in flight.
        assert!(!sched.scan_now().await);

        // Release the first scan; it completes and reports that it ran.
        feed.gate.notify_one();
        assert!(first.await.unwrap());

        // With the guard released, a new scan runs again.
        feed.gate.notify_one();
        assert!(sched.scan_now().await);
    }

    #[tokio::test]
    async fn cancelled_scheduler_stops() {
        struct EmptyFeed;

        #[async_trait]
        impl ActivityFeed for EmptyFeed {
            async fn latest(&self) -> Result<Vec<TokenActivity>> {
                Ok(Vec::new())
            }
        }

        let (sched, _rx) = scheduler(Arc::new(EmptyFeed));
        sched.shutdown.cancel();
        // run() observes the cancelled token and returns promptly.
        sched.run().await.unwrap();
    }
}
