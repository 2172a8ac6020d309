use crate::errors::DiscoveryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Mars-rover mission day. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Sol(u32);

impl Sol {
    pub fn new(value: i64) -> Result<Self, DiscoveryError> {
        match u32::try_from(value) {
            Ok(v) if v > 0 => Ok(Sol(v)),
            _ => Err(DiscoveryError::InvalidInput(format!(
                "sol must be a positive integer, got {value}"
            ))),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Wire encoding used on the command channel.
    pub fn to_payload(self) -> Vec<u8> {
        self.0.to_string().into_bytes()
    }

    /// Decodes a command channel payload. The payload is the decimal text
    /// encoding of the sol; surrounding ASCII whitespace is ignored.
    pub fn from_payload(payload: &[u8]) -> Result<Self, DiscoveryError> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| DiscoveryError::InvalidInput("payload is not valid UTF-8".into()))?;
        text.parse()
    }
}

impl TryFrom<i64> for Sol {
    type Error = DiscoveryError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Sol::new(value)
    }
}

impl From<Sol> for u32 {
    fn from(sol: Sol) -> Self {
        sol.0
    }
}

impl FromStr for Sol {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| DiscoveryError::InvalidInput(format!("invalid sol: {trimmed:?}")))?;
        Sol::new(value)
    }
}

impl fmt::Display for Sol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One probed photo, only alive for the duration of a discovery run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoCandidate {
    pub sol: Sol,
    pub url: String,
    pub size: u64,
}

/// The persisted winner for a sol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub sol: Sol,
    pub url: String,
    pub size: u64,
}

impl From<PhotoCandidate> for Picture {
    fn from(candidate: PhotoCandidate) -> Self {
        Picture {
            sol: candidate.sol,
            url: candidate.url,
            size: candidate.size,
        }
    }
}
