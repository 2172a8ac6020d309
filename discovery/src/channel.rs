//! Transport that decouples submission from processing. Delivery is
//! at-least-once; payloads are opaque bytes (the decimal text of a sol).
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("command channel is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub body: Vec<u8>,
}

#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), ChannelError>;

    /// Waits for the next delivery. Returns `None` once the channel is closed
    /// and drained.
    async fn receive(&self) -> Option<Delivery>;
}

/// Bounded in-process queue. Publishing waits for capacity.
///
/// Not durable: payloads live only in memory, so anything still queued when
/// the process exits is lost and never redelivered. A durable broker that
/// keeps at-least-once delivery across restarts belongs behind
/// [`CommandChannel`] instead.
pub struct InProcessChannel {
    tx: parking_lot::Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    rx: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl InProcessChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        InProcessChannel {
            tx: parking_lot::Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }

    /// Stops accepting new payloads. Already queued payloads can still be received.
    pub fn close(&self) {
        self.tx.lock().take();
    }
}

#[async_trait]
impl CommandChannel for InProcessChannel {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), ChannelError> {
        let tx = self.tx.lock().clone().ok_or(ChannelError::Closed)?;
        tx.send(payload).await.map_err(|_| ChannelError::Closed)
    }

    async fn receive(&self) -> Option<Delivery> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.map(|body| Delivery { body })
    }
}
