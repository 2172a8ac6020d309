use crate::commit::commit;
use crate::errors::{DiscoveryError, Result, Stage, StageContext};
use crate::guard::should_run;
use crate::prober::probe_all;
use crate::selector::select_largest;
use crate::store::ResultStore;
use crate::types::{Picture, Sol};
use crate::upstream::{PhotoSource, SizeProber, UpstreamError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// A picture was already stored for the sol, nothing was recomputed.
    AlreadyResolved,
    Committed(Picture),
}

impl RunOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::AlreadyResolved => "already_resolved",
            RunOutcome::Committed(_) => "committed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Received,
    Guarded,
    Discovering,
    Selecting,
    Committing,
    Done,
    Skipped,
    Failed,
}

struct Run {
    sol: Sol,
    path: Vec<RunState>,
}

impl Run {
    fn new(sol: Sol) -> Self {
        Run {
            sol,
            path: vec![RunState::Received],
        }
    }

    fn state(&self) -> RunState {
        self.path.last().copied().unwrap_or(RunState::Received)
    }

    fn advance(&mut self, next: RunState) {
        tracing::debug!(
            sol = %self.sol,
            from = ?self.state(),
            to = ?next,
            "Discovery run state changed"
        );
        self.path.push(next);
    }
}

/// Runs discovery for one sol: guard, list photos, probe, select, commit.
pub struct Discovery {
    source: Arc<dyn PhotoSource>,
    prober: Arc<dyn SizeProber>,
    store: Arc<dyn ResultStore>,
}

impl Discovery {
    pub fn new(
        source: Arc<dyn PhotoSource>,
        prober: Arc<dyn SizeProber>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Discovery {
            source,
            prober,
            store,
        }
    }

    /// Cancelling `scope` stops outstanding photo listing and probes. The run
    /// then fails with `Cancelled`.
    pub async fn run(&self, sol: Sol, scope: &CancellationToken) -> Result<RunOutcome> {
        self.run_traced(sol, scope).await.1
    }

    async fn run_traced(
        &self,
        sol: Sol,
        scope: &CancellationToken,
    ) -> (Vec<RunState>, Result<RunOutcome>) {
        let mut run = Run::new(sol);
        let result = self.drive(&mut run, scope).await;
        if result.is_err() {
            run.advance(RunState::Failed);
        }
        (run.path, result)
    }

    async fn drive(&self, run: &mut Run, scope: &CancellationToken) -> Result<RunOutcome> {
        let sol = run.sol;

        run.advance(RunState::Guarded);
        if !should_run(self.store.as_ref(), sol).await? {
            run.advance(RunState::Skipped);
            return Ok(RunOutcome::AlreadyResolved);
        }

        run.advance(RunState::Discovering);
        let listed = tokio::select! {
            biased;
            _ = scope.cancelled() => Err(DiscoveryError::Cancelled),
            urls = self.source.list_photos(sol) => urls.map_err(DiscoveryError::from),
        };
        let urls = listed.stage(Stage::ListPhotos, sol)?;
        if urls.is_empty() {
            return Err(UpstreamError::NoPhotos(sol)).stage(Stage::ListPhotos, sol);
        }
        let candidates = probe_all(self.prober.clone(), sol, urls, scope).await?;

        run.advance(RunState::Selecting);
        let winner = select_largest(&candidates)
            .cloned()
            .ok_or(UpstreamError::NoPhotos(sol))
            .stage(Stage::ListPhotos, sol)?;

        run.advance(RunState::Committing);
        let picture = commit(self.store.as_ref(), sol, winner).await?;

        run.advance(RunState::Done);
        Ok(RunOutcome::Committed(picture))
    }
}
