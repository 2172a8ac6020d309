use crate::errors::{Result, Stage, StageContext};
use crate::store::ResultStore;
use crate::types::{PhotoCandidate, Picture, Sol};

/// Persists the winner for `sol`, overwriting any row a concurrent run left behind.
pub async fn commit(store: &dyn ResultStore, sol: Sol, winner: PhotoCandidate) -> Result<Picture> {
    let picture = Picture {
        sol,
        ..Picture::from(winner)
    };
    store.upsert(&picture).await.stage(Stage::Commit, sol)?;
    Ok(picture)
}
