use crate::channel::{CommandChannel, Delivery};
use crate::errors::{ErrorKind, Result};
use crate::metrics_defs::{
    COMMANDS_RECEIVED, COMMANDS_REJECTED, RUN_DURATION, RUNS_COMPLETED, RUNS_IN_FLIGHT,
};
use crate::pipeline::{Discovery, RunOutcome};
use crate::types::Sol;
use shared::{counter, gauge, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Result of one discovery run, for callers that want to observe completions.
#[derive(Debug)]
pub struct RunReport {
    pub sol: Sol,
    pub result: Result<RunOutcome>,
}

/// Pulls sol commands off the channel and runs discovery for each of them.
pub struct Consumer {
    channel: Arc<dyn CommandChannel>,
    discovery: Arc<Discovery>,
    reports: Option<mpsc::Sender<RunReport>>,
    tracker: TaskTracker,
    // Parent of every run's probe scope. Only cancelled once the grace period is over.
    runs: CancellationToken,
    // Used by the readiness probe. True while the intake loop is running.
    ready: Arc<AtomicBool>,
}

impl Consumer {
    pub fn new(channel: Arc<dyn CommandChannel>, discovery: Arc<Discovery>) -> Self {
        Consumer {
            channel,
            discovery,
            reports: None,
            tracker: TaskTracker::new(),
            runs: CancellationToken::new(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Every finished run is also sent to `reports`. Sending waits for capacity.
    pub fn with_reports(mut self, reports: mpsc::Sender<RunReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    /// Runs until `shutdown` is cancelled or the channel is closed, then waits
    /// up to `grace` for in-flight runs before cancelling them.
    pub async fn run(self, shutdown: CancellationToken, grace: Duration) {
        tracing::info!("Command consumer started");
        self.ready.store(true, Ordering::Relaxed);

        loop {
            let delivery = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                delivery = self.channel.receive() => delivery,
            };
            match delivery {
                Some(delivery) => self.dispatch(delivery),
                None => {
                    tracing::info!("Command channel closed");
                    break;
                }
            }
        }

        self.ready.store(false, Ordering::Relaxed);
        self.drain(grace).await;
        tracing::info!("Command consumer stopped");
    }

    fn dispatch(&self, delivery: Delivery) {
        counter!(COMMANDS_RECEIVED).increment(1);

        let sol = match Sol::from_payload(&delivery.body) {
            Ok(sol) => sol,
            Err(e) => {
                counter!(COMMANDS_REJECTED).increment(1);
                tracing::warn!(
                    payload = %String::from_utf8_lossy(&delivery.body),
                    error = %e,
                    "Rejected command"
                );
                return;
            }
        };

        let discovery = self.discovery.clone();
        let scope = self.runs.child_token();
        let reports = self.reports.clone();
        self.tracker.spawn(async move {
            gauge!(RUNS_IN_FLIGHT).increment(1.0);
            let started = Instant::now();
            let result = discovery.run(sol, &scope).await;
            gauge!(RUNS_IN_FLIGHT).decrement(1.0);
            histogram!(RUN_DURATION).record(started.elapsed().as_secs_f64());

            report(sol, &result);
            if let Some(reports) = reports {
                // Nobody listening is fine
                let _ = reports.send(RunReport { sol, result }).await;
            }
        });
    }

    async fn drain(&self, grace: Duration) {
        self.tracker.close();
        if self.tracker.is_empty() {
            return;
        }

        tracing::info!(in_flight = self.tracker.len(), "Waiting for in-flight discovery runs");
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                in_flight = self.tracker.len(),
                "Grace period elapsed, cancelling discovery runs"
            );
            self.runs.cancel();
            self.tracker.wait().await;
        }
    }
}

fn report(sol: Sol, result: &Result<RunOutcome>) {
    match result {
        Ok(outcome) => {
            counter!(RUNS_COMPLETED, "outcome" => outcome.as_str()).increment(1);
            match outcome {
                RunOutcome::AlreadyResolved => {
                    tracing::info!(%sol, "Sol already resolved, skipping discovery")
                }
                RunOutcome::Committed(picture) => {
                    tracing::info!(
                        %sol,
                        url = %picture.url,
                        size = picture.size,
                        "Stored largest picture"
                    )
                }
            }
        }
        Err(e) if e.kind() == ErrorKind::Cancelled => {
            counter!(RUNS_COMPLETED, "outcome" => "cancelled").increment(1);
            tracing::warn!(%sol, error = %e, "Discovery run cancelled");
        }
        Err(e) => {
            counter!(RUNS_COMPLETED, "outcome" => "failed").increment(1);
            let stage = e.stage().map(|s| s.as_str()).unwrap_or("unknown");
            tracing::error!(%sol, stage, error = %e, "Discovery run failed");
        }
    }
}
