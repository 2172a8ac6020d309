use crate::channel::ChannelError;
use crate::store::StoreError;
use crate::types::Sol;
use crate::upstream::UpstreamError;
use std::fmt;
use thiserror::Error;

pub type Result<T, E = DiscoveryError> = std::result::Result<T, E>;

/// Pipeline stage an error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Guard,
    ListPhotos,
    Probe,
    Commit,
    Lookup,
    Submit,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::Guard => "guard",
            Stage::ListPhotos => "list_photos",
            Stage::Probe => "probe",
            Stage::Commit => "commit",
            Stage::Lookup => "lookup",
            Stage::Submit => "submit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification used by callers, independent of the context an
/// error picked up on its way out of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    UpstreamUnavailable,
    StoreUnavailable,
    ChannelUnavailable,
    Cancelled,
    Internal,
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("no picture found for sol {0}")]
    NotFound(Sol),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("command channel unavailable: {0}")]
    Channel(#[from] ChannelError),

    #[error("discovery was cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{stage} failed for sol {sol}: {source}")]
    Stage {
        stage: Stage,
        sol: Sol,
        #[source]
        source: Box<DiscoveryError>,
    },
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::NotFound(_) => ErrorKind::NotFound,
            DiscoveryError::InvalidInput(_) => ErrorKind::InvalidInput,
            DiscoveryError::Upstream(_) => ErrorKind::UpstreamUnavailable,
            DiscoveryError::Store(StoreError::NotFound) => ErrorKind::NotFound,
            DiscoveryError::Store(_) => ErrorKind::StoreUnavailable,
            DiscoveryError::Channel(_) => ErrorKind::ChannelUnavailable,
            DiscoveryError::Cancelled => ErrorKind::Cancelled,
            DiscoveryError::Internal(_) => ErrorKind::Internal,
            DiscoveryError::Stage { source, .. } => source.kind(),
        }
    }

    /// The innermost stage that wrapped this error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DiscoveryError::Stage { stage, source, .. } => source.stage().or(Some(*stage)),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn in_stage(self, stage: Stage, sol: Sol) -> Self {
        DiscoveryError::Stage {
            stage,
            sol,
            source: Box::new(self),
        }
    }
}

/// Attaches stage context to any error convertible into a `DiscoveryError`.
pub(crate) trait StageContext<T> {
    fn stage(self, stage: Stage, sol: Sol) -> Result<T>;
}

impl<T, E> StageContext<T> for std::result::Result<T, E>
where
    E: Into<DiscoveryError>,
{
    fn stage(self, stage: Stage, sol: Sol) -> Result<T> {
        self.map_err(|e| e.into().in_stage(stage, sol))
    }
}
