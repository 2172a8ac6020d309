//! Fan-out/fan-in size probing for all photos of one sol.
//!
//! Every URL gets its own task. The tasks share a cancellation scope that is
//! a child of the run's scope: the first failure cancels it, the remaining
//! probes stop promptly and their results are dropped. The caller either gets
//! one candidate per URL, in input order, or an error.
use crate::errors::{DiscoveryError, Result, Stage, StageContext};
use crate::metrics_defs::{PROBE_DURATION, PROBES_FAILED};
use crate::types::{PhotoCandidate, Sol};
use crate::upstream::SizeProber;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub async fn probe_all(
    prober: Arc<dyn SizeProber>,
    sol: Sol,
    urls: Vec<String>,
    scope: &CancellationToken,
) -> Result<Vec<PhotoCandidate>> {
    let started = Instant::now();
    let result = gather(prober, sol, urls, scope).await;
    histogram!(PROBE_DURATION).record(started.elapsed().as_secs_f64());
    result.stage(Stage::Probe, sol)
}

async fn gather(
    prober: Arc<dyn SizeProber>,
    sol: Sol,
    urls: Vec<String>,
    scope: &CancellationToken,
) -> Result<Vec<PhotoCandidate>> {
    let probes = scope.child_token();
    // Filled by position, so completion order does not matter
    let mut slots: Vec<Option<PhotoCandidate>> = vec![None; urls.len()];

    let mut join_set = JoinSet::new();
    for (index, url) in urls.into_iter().enumerate() {
        let prober = prober.clone();
        let probes = probes.clone();
        join_set.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = probes.cancelled() => Err(DiscoveryError::Cancelled),
                size = prober.size_of(&url) => size.map_err(DiscoveryError::from),
            };
            (index, url, result)
        });
    }

    let mut failure: Option<DiscoveryError> = None;
    while let Some(joined) = join_set.join_next().await {
        let (index, url, result) = match joined {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(%sol, error = %e, "Probe task failed");
                if failure.is_none() {
                    failure = Some(DiscoveryError::Internal(format!("probe task failed: {e}")));
                    probes.cancel();
                }
                continue;
            }
        };

        match result {
            Ok(size) if failure.is_none() => {
                slots[index] = Some(PhotoCandidate { sol, url, size });
            }
            Ok(_) => {}
            Err(DiscoveryError::Cancelled) => {
                if failure.is_none() {
                    failure = Some(DiscoveryError::Cancelled);
                }
            }
            Err(e) => {
                counter!(PROBES_FAILED).increment(1);
                tracing::debug!(%sol, %url, error = %e, "Probe failed");
                if failure.is_none() {
                    failure = Some(e);
                    probes.cancel();
                }
            }
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }

    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| DiscoveryError::Internal("probe finished without a result".into()))
}
