//! Finds the largest Mars rover photo of a sol.
//!
//! Sols are submitted through [`service::PictureService`] and travel over a
//! [`channel::CommandChannel`] to the [`consumer::Consumer`], which runs one
//! [`pipeline::Discovery`] per command.

pub mod api;
pub mod channel;
pub mod commit;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod guard;
pub mod metrics_defs;
pub mod photo_source;
pub mod pipeline;
pub mod prober;
pub mod selector;
pub mod service;
pub mod size_prober;
pub mod store;
pub mod types;
pub mod upstream;

#[cfg(test)]
mod testutils;

use crate::channel::InProcessChannel;
use crate::config::{Config, ValidationError};
use crate::consumer::Consumer;
use crate::photo_source::NasaPhotoSource;
use crate::pipeline::Discovery;
use crate::service::PictureService;
use crate::size_prober::HttpSizeProber;
use crate::store::StoreError;
use crate::upstream::UpstreamError;
use shared::admin_service::AdminService;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryRunError {
    #[error("invalid config: {0}")]
    Config(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not open result store: {0}")]
    Store(#[from] StoreError),

    #[error("could not build http client: {0}")]
    Client(#[from] UpstreamError),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs the API, the admin endpoints and the command consumer until `shutdown`
/// is cancelled.
pub async fn run(config: Config, shutdown: CancellationToken) -> Result<(), DiscoveryRunError> {
    config.validate()?;

    let api_listener =
        TcpListener::bind((config.listener.host.as_str(), config.listener.port)).await?;
    let admin_listener = TcpListener::bind((
        config.admin_listener.host.as_str(),
        config.admin_listener.port,
    ))
    .await?;

    run_with_listeners(config, api_listener, admin_listener, shutdown).await
}

async fn run_with_listeners(
    config: Config,
    api_listener: TcpListener,
    admin_listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), DiscoveryRunError> {
    let store = store::get_store(config.result_store.r#type.clone()).await?;
    let source = Arc::new(NasaPhotoSource::new(&config.photo_source)?);
    let prober = Arc::new(HttpSizeProber::new(config.size_prober.timeout_secs)?);
    let channel = Arc::new(InProcessChannel::new(config.command_channel.capacity));

    let discovery = Arc::new(Discovery::new(source, prober, store.clone()));
    let consumer = Consumer::new(channel.clone(), discovery);
    let ready = consumer.ready_flag();

    let intake = CancellationToken::new();
    let grace = Duration::from_secs(config.shutdown_grace_secs);
    let consumer_handle = tokio::spawn(consumer.run(intake.clone(), grace));

    // Health checks keep answering until in-flight runs have drained
    let admin_shutdown = CancellationToken::new();
    let admin_service =
        AdminService::<_, DiscoveryRunError>::new(move || ready.load(Ordering::Relaxed));
    let admin_handle = tokio::spawn(shared::http::serve(
        admin_listener,
        admin_service,
        admin_shutdown.clone().cancelled_owned(),
    ));

    tracing::info!("Discovery service started");
    let service = PictureService::new(channel.clone(), store);
    let api_result = api::serve(api_listener, service, shutdown.clone()).await;

    // The API is down, so nothing can be submitted anymore
    shutdown.cancel();
    intake.cancel();
    let drained = consumer_handle.await;
    channel.close();
    admin_shutdown.cancel();
    admin_handle.await??;
    drained?;
    api_result?;

    tracing::info!("Discovery service stopped");
    Ok(())
}
