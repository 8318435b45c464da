//! Statistics poller
//!
//! Periodic task that asks every registered switch for its flow statistics.
//! Requests are fire-and-forget and wildcarded; the classifier filters the
//! replies. The poller never waits for replies and keeps ticking whatever
//! individual switches do.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fabric_common::SwitchMessage;

use crate::config::ControllerConfig;
use crate::registry::DatapathRegistry;

/// The periodic flow-statistics poller.
pub struct StatsPoller {
    registry: Arc<DatapathRegistry>,
    interval: Duration,
    cancel: CancellationToken,
}

impl StatsPoller {
    pub fn new(
        registry: Arc<DatapathRegistry>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            interval,
            cancel,
        }
    }

    pub fn from_config(
        registry: Arc<DatapathRegistry>,
        config: &ControllerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(
            registry,
            Duration::from_secs(config.poll_interval_secs),
            cancel,
        )
    }

    /// One polling pass over the current registry snapshot.
    ///
    /// A switch whose send fails is skipped; the rest of the snapshot is
    /// still polled.
    pub fn poll_once(&self) {
        for dp in self.registry.active() {
            if let Err(e) = dp.send(SwitchMessage::FlowStatsRequest) {
                warn!("Stats request not delivered: dpid={}: {}", dp.id(), e);
            } else {
                debug!("Stats request sent: dpid={}", dp.id());
            }
        }
    }

    /// Runs until cancelled. The timer sleep is the only suspension point.
    pub async fn run(self) {
        info!(
            "Stats poller started: interval={}s",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Stats poller stopped");
                    return;
                }
                _ = ticker.tick() => self.poll_once(),
            }
        }
    }
}
