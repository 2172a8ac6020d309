use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Timeout for {0} must be greater than 0")]
    InvalidTimeout(&'static str),

    #[error("Command channel capacity must be greater than 0")]
    InvalidChannelCapacity,

    #[error("Filesystem result store requires a base_dir")]
    EmptyBaseDir,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum ResultStoreType {
    Memory,
    Filesystem { base_dir: String },
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ResultStore {
    #[serde(flatten)]
    pub r#type: ResultStoreType,
}

impl Default for ResultStore {
    fn default() -> Self {
        ResultStore {
            r#type: ResultStoreType::Memory,
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct PhotoSource {
    /// Photo listing endpoint. The sol and api key are added as query params.
    pub url: Url,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct SizeProber {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SizeProber {
    fn default() -> Self {
        SizeProber {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct CommandChannel {
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,
}

impl Default for CommandChannel {
    fn default() -> Self {
        CommandChannel {
            capacity: default_channel_capacity(),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 8081,
    }
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_channel_capacity() -> usize {
    64
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    pub photo_source: PhotoSource,
    #[serde(default)]
    pub size_prober: SizeProber,
    #[serde(default)]
    pub result_store: ResultStore,
    #[serde(default)]
    pub command_channel: CommandChannel,
    /// How long in-flight discovery runs may keep going after shutdown starts.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.photo_source.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("photo_source"));
        }
        if self.size_prober.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("size_prober"));
        }
        if self.command_channel.capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        if let ResultStoreType::Filesystem { base_dir } = &self.result_store.r#type
            && base_dir.is_empty()
        {
            return Err(ValidationError::EmptyBaseDir);
        }

        Ok(())
    }
}
