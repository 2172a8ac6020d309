use crate::errors::{Result, Stage, StageContext};
use crate::store::{ResultStore, StoreError};
use crate::types::Sol;

/// Returns whether discovery has to run for `sol`.
///
/// Advisory only: two concurrent callers can both be told to run. Store
/// failures other than `NotFound` fail closed.
pub async fn should_run(store: &dyn ResultStore, sol: Sol) -> Result<bool> {
    match store.exists(sol).await {
        Ok(exists) => Ok(!exists),
        Err(StoreError::NotFound) => Ok(true),
        Err(e) => Err(e).stage(Stage::Guard, sol),
    }
}
