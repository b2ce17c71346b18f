use std::sync::Arc;
use std::time::Duration;

use rentscan_protocol::{RentalStatus, StatusResponse};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::sink::ResponseSink;
use crate::store::RentalStore;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Result of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub pushed: usize,
    pub failed: usize,
}

/// Periodically expires overdue rentals and pushes their new status to the
/// gateway without a preceding request.
pub struct ExpirationMonitor {
    store: RentalStore,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ResponseSink>,
    interval: Duration,
}

impl ExpirationMonitor {
    pub fn new(store: RentalStore, clock: Arc<dyn Clock>, sink: Arc<dyn ResponseSink>) -> Self {
        Self { store, clock, sink, interval: DEFAULT_SWEEP_INTERVAL }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Move every `RENTED` record past its deadline to `EXPIRED`.
    ///
    /// All transitions happen under one store lock; the returned pushes carry
    /// the rent timestamp and duration.
    pub fn expire_overdue(&self, now: u64) -> Vec<StatusResponse> {
        let mut table = self.store.table();
        let pushes: Vec<StatusResponse> = table
            .iter_mut()
            .filter(|(_, record)| record.is_overdue(now))
            .map(|(tag, record)| {
                record.status = RentalStatus::Expired;
                log::info!(
                    "expiry: expired tag={} rented_at={} duration={} now={}",
                    tag,
                    record.rent_timestamp,
                    record.duration,
                    now
                );
                StatusResponse {
                    status: RentalStatus::Expired,
                    tag: tag.clone(),
                    timestamp: record.rent_timestamp,
                    duration: record.duration,
                }
            })
            .collect();
        pushes
    }

    /// Expire as of `now` and push each expiration. A failed push is logged
    /// and the remaining pushes still go out.
    pub async fn sweep_at(&self, now: u64) -> SweepReport {
        let pushes = self.expire_overdue(now);
        let mut report = SweepReport { expired: pushes.len(), ..SweepReport::default() };

        for push in &pushes {
            match self.sink.send(push).await {
                Ok(()) => report.pushed += 1,
                Err(err) => {
                    report.failed += 1;
                    log::warn!("expiry: push failed tag={} err={}", push.tag, err);
                }
            }
        }
        report
    }

    pub async fn tick(&self) -> SweepReport {
        self.sweep_at(self.clock.now_secs()).await
    }

    /// Sweep on every interval until `cancel` fires. The first sweep runs
    /// immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        log::info!("expiry: monitor started interval={:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // Transitions commit before the first push; a cancelled sweep only
            // drops pushes.
            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                report = self.tick() => report,
            };
            if report.expired > 0 {
                log::debug!(
                    "expiry: sweep expired={} pushed={} failed={}",
                    report.expired,
                    report.pushed,
                    report.failed
                );
            }
        }
        log::info!("expiry: monitor stopped");
    }
}
