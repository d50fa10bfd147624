//! Dispatcher implementation

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

use super::config::DispatcherConfig;
use crate::event::Event;
use crate::github::RepositoryApi;
use crate::monitor::{FetchError, Novelty, RepositoryMonitor};
use crate::notification::Backend;

/// Counts from one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Monitors whose fetch was attempted
    pub polled: usize,
    pub fetch_failures: usize,
    pub notifications_sent: usize,
    pub delivery_failures: usize,
    /// Shutdown was requested during the cycle
    pub interrupted: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: MonitorOutcome) {
        self.polled += 1;
        match outcome {
            MonitorOutcome::FetchFailed => self.fetch_failures += 1,
            MonitorOutcome::Baseline => {}
            MonitorOutcome::Delivered { sent, failed } => {
                self.notifications_sent += sent;
                self.delivery_failures += failed;
            }
        }
    }
}

/// What happened to one monitor in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorOutcome {
    FetchFailed,
    Baseline,
    Delivered { sent: usize, failed: usize },
}

/// Drives every repository monitor through fetch, diff, notify and advance
pub struct Dispatcher {
    config: DispatcherConfig,
    monitors: Vec<RepositoryMonitor>,
    api: Arc<dyn RepositoryApi>,
    backend: Arc<dyn Backend>,
}

impl Dispatcher {
    /// Create a new Dispatcher
    pub fn new(
        config: DispatcherConfig,
        monitors: Vec<RepositoryMonitor>,
        api: Arc<dyn RepositoryApi>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            config,
            monitors,
            api,
            backend,
        }
    }

    pub fn monitors(&self) -> &[RepositoryMonitor] {
        &self.monitors
    }

    /// Run one full cycle over every monitor
    pub async fn run_cycle(&mut self) -> CycleReport {
        let report = self.poll_cycle(None).await;
        log_report(&report);
        report
    }

    /// Run cycles until shutdown
    ///
    /// A message on `shutdown_rx`, or every sender being dropped, stops the
    /// loop. A shutdown during a cycle takes effect once the in-flight batch
    /// of monitors is done; a shutdown during the sleep takes effect at once.
    pub async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            interval_secs = self.config.poll_interval_secs,
            monitors = self.monitors.len(),
            backend = self.backend.name(),
            "Dispatcher started"
        );

        loop {
            let report = self.poll_cycle(Some(&mut shutdown_rx)).await;
            log_report(&report);
            if report.interrupted {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
                _ = shutdown_rx.recv() => {
                    debug!("Dispatcher::run: shutdown during sleep");
                    break;
                }
            }
        }

        info!("Dispatcher stopped");
    }

    /// Fetch monitors in batches of `max_concurrent_fetches`, then process
    /// each fetched monitor in turn
    async fn poll_cycle(&mut self, mut shutdown_rx: Option<&mut mpsc::Receiver<()>>) -> CycleReport {
        let mut report = CycleReport::default();
        let batch_size = self.config.max_concurrent_fetches.max(1);
        let baseline_first_poll = self.config.baseline_first_poll;
        let api = self.api.as_ref();
        let backend = self.backend.as_ref();

        let total = self.monitors.len();
        for batch in self.monitors.chunks_mut(batch_size) {
            let results = join_all(batch.iter().map(|m| m.fetch_current_events(api))).await;

            for (monitor, result) in batch.iter_mut().zip(results) {
                let outcome = process_monitor(monitor, result, backend, baseline_first_poll).await;
                report.record(outcome);
            }

            if let Some(rx) = shutdown_rx.as_deref_mut() {
                if shutdown_requested(rx) {
                    if report.polled < total {
                        info!(polled = report.polled, total, "Shutdown requested, stopping mid-cycle");
                    }
                    report.interrupted = true;
                    break;
                }
            }
        }

        report
    }
}

fn shutdown_requested(rx: &mut mpsc::Receiver<()>) -> bool {
    match rx.try_recv() {
        Ok(()) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

/// Diff, notify and advance one monitor with the result of its fetch
async fn process_monitor(
    monitor: &mut RepositoryMonitor,
    result: Result<HashSet<Event>, FetchError>,
    backend: &dyn Backend,
    baseline_first_poll: bool,
) -> MonitorOutcome {
    let events = match result {
        Ok(events) => events,
        Err(e) => {
            warn!(
                package = %monitor.package(),
                repository = %monitor.repository(),
                error = %e,
                "Fetch failed, skipping repository this cycle"
            );
            return MonitorOutcome::FetchFailed;
        }
    };

    if baseline_first_poll && !monitor.is_primed() {
        info!(
            repository = %monitor.repository(),
            events = events.len(),
            "Recorded baseline snapshot"
        );
        monitor.advance(events);
        return MonitorOutcome::Baseline;
    }

    let novelty = monitor.novelty(&events);
    debug!(
        repository = %monitor.repository(),
        issues = novelty.issues.len(),
        pushes = novelty.pushes.len(),
        pull_requests = novelty.pull_requests.len(),
        "process_monitor: novelty"
    );

    let (sent, failed) = deliver_novelty(monitor, &novelty, backend).await;
    monitor.advance(events);
    MonitorOutcome::Delivered { sent, failed }
}

/// Send every notification for `novelty`, returning (sent, failed)
async fn deliver_novelty(
    monitor: &RepositoryMonitor,
    novelty: &Novelty,
    backend: &dyn Backend,
) -> (usize, usize) {
    let mut sent = 0;
    let mut failed = 0;

    for notification in novelty.notifications(monitor.package(), monitor.repository()) {
        let payload = match notification.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!(repository = %monitor.repository(), error = %e, "Failed to encode notification");
                failed += 1;
                continue;
            }
        };

        match backend.notify(&payload).await {
            Ok(()) => {
                info!(
                    package = %monitor.package(),
                    repository = %monitor.repository(),
                    event = %notification.event,
                    "Notification sent"
                );
                sent += 1;
            }
            Err(e) => {
                error!(
                    package = %monitor.package(),
                    repository = %monitor.repository(),
                    backend = backend.name(),
                    error = %e,
                    "Notification delivery failed"
                );
                failed += 1;
            }
        }
    }

    (sent, failed)
}

fn log_report(report: &CycleReport) {
    info!(
        polled = report.polled,
        fetch_failures = report.fetch_failures,
        notifications_sent = report.notifications_sent,
        delivery_failures = report.delivery_failures,
        interrupted = report.interrupted,
        "Poll cycle complete"
    );
}
