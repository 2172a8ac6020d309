use crate::channel::CommandChannel;
use crate::errors::{DiscoveryError, Result, Stage, StageContext};
use crate::store::{ResultStore, StoreError};
use crate::types::{Picture, Sol};
use std::sync::Arc;

/// Entry points for clients: enqueue a sol for discovery and read back results.
#[derive(Clone)]
pub struct PictureService {
    channel: Arc<dyn CommandChannel>,
    store: Arc<dyn ResultStore>,
}

impl PictureService {
    pub fn new(channel: Arc<dyn CommandChannel>, store: Arc<dyn ResultStore>) -> Self {
        PictureService { channel, store }
    }

    /// Publishes `sol` for asynchronous discovery. Returns as soon as the
    /// command is enqueued.
    pub async fn submit(&self, sol: Sol) -> Result<()> {
        self.channel
            .publish(sol.to_payload())
            .await
            .stage(Stage::Submit, sol)?;
        tracing::debug!(%sol, "Submitted discovery command");
        Ok(())
    }

    pub async fn lookup(&self, sol: Sol) -> Result<Picture> {
        match self.store.find_by_sol(sol).await {
            Ok(picture) => Ok(picture),
            Err(StoreError::NotFound) => Err(DiscoveryError::NotFound(sol)),
            Err(e) => Err(e).stage(Stage::Lookup, sol),
        }
    }
}
