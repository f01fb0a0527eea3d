//! Background task that runs the alert check on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::service::AlertService;

pub struct Poller {
    service: Arc<AlertService>,
    period: Duration,
    shutdown: Arc<Notify>,
}

impl Poller {
    pub fn new(service: Arc<AlertService>, period: Duration) -> Self {
        Self { service, period, shutdown: Arc::new(Notify::new()) }
    }

    /// Call `notify_one` on the returned handle to stop the loop after the current check.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// The first check runs immediately. A failed check is logged and the loop keeps going.
    pub fn start(self) -> JoinHandle<()> {
        let Self { service, period, shutdown } = self;

        tokio::spawn(async move {
            info!(
                event_name = "alerting.poller.started",
                period_secs = period.as_secs(),
                channel = service.notifier_channel(),
                "alert poller started"
            );

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        info!(event_name = "alerting.poller.stopped", "alert poller received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(error) = service.check_and_alert(Utc::now()).await {
                            error!(
                                event_name = "alerting.poller.check_failed",
                                error = %error,
                                "alert check failed"
                            );
                        }
                    }
                }
            }
        })
    }
}
