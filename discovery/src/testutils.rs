use crate::store::{MemoryResultStore, ResultStore, StoreError};
use crate::types::{Picture, Sol};
use crate::upstream::{PhotoSource, SizeProber, UpstreamError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Serves `router` on an ephemeral local port for the lifetime of the test runtime.
pub async fn spawn_mock_server(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Photo source answering from a fixed script. Sols without a script have no photos.
///
/// A sol scripted more than once returns each listing in turn and then keeps
/// repeating the last one.
#[derive(Default)]
pub struct ScriptedPhotoSource {
    listings: parking_lot::Mutex<HashMap<Sol, VecDeque<Vec<String>>>>,
    unavailable: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedPhotoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_photos(self, sol: i64, urls: &[&str]) -> Self {
        self.listings
            .lock()
            .entry(Sol::new(sol).unwrap())
            .or_default()
            .push_back(urls.iter().map(|u| u.to_string()).collect());
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoSource for ScriptedPhotoSource {
    async fn list_photos(&self, sol: Sol) -> Result<Vec<String>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UpstreamError::UnexpectedStatus {
                url: "scripted".into(),
                status: 503,
            });
        }

        let mut listings = self.listings.lock();
        let urls = match listings.get_mut(&sol) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        if urls.is_empty() {
            return Err(UpstreamError::NoPhotos(sol));
        }
        Ok(urls)
    }
}

/// Size prober with per-URL sizes, failures, delays and URLs that never answer.
#[derive(Default)]
pub struct ScriptedProber {
    sizes: HashMap<String, u64>,
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    hangs: HashSet<String>,
    pub calls: AtomicUsize,
    /// Probes that were dropped before they produced a result.
    pub abandoned: AtomicUsize,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, url: &str, size: u64) -> Self {
        self.sizes.insert(url.into(), size);
        self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
        self.failures.insert(url.into());
        self
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    /// The probe for `url` blocks until it is cancelled.
    pub fn with_hang(mut self, url: &str) -> Self {
        self.hangs.insert(url.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn abandoned_count(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

struct AbandonGuard<'a> {
    counter: &'a AtomicUsize,
    finished: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl SizeProber for ScriptedProber {
    async fn size_of(&self, url: &str) -> Result<u64, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = AbandonGuard {
            counter: &self.abandoned,
            finished: false,
        };

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.hangs.contains(url) {
            std::future::pending::<()>().await;
        }

        guard.finished = true;
        if self.failures.contains(url) {
            return Err(UpstreamError::UnexpectedStatus {
                url: url.into(),
                status: 500,
            });
        }
        self.sizes
            .get(url)
            .copied()
            .ok_or_else(|| UpstreamError::MissingContentLength(url.into()))
    }
}

/// In-memory store whose operations can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryResultStore,
    pub fail_exists: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fail_find: AtomicBool,
    pub upserts: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable(op: &str) -> StoreError {
        StoreError::Unavailable(format!("{op} is switched off"))
    }
}

#[async_trait]
impl ResultStore for FlakyStore {
    async fn exists(&self, sol: Sol) -> Result<bool, StoreError> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(Self::unavailable("exists"));
        }
        self.inner.exists(sol).await
    }

    async fn upsert(&self, picture: &Picture) -> Result<(), StoreError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(Self::unavailable("upsert"));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(picture).await
    }

    async fn find_by_sol(&self, sol: Sol) -> Result<Picture, StoreError> {
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(Self::unavailable("find_by_sol"));
        }
        self.inner.find_by_sol(sol).await
    }
}

/// Store whose existence check answers `NotFound` as an error instead of `false`.
#[derive(Default)]
pub struct NotFoundOnExistsStore {
    pub inner: MemoryResultStore,
}

#[async_trait]
impl ResultStore for NotFoundOnExistsStore {
    async fn exists(&self, sol: Sol) -> Result<bool, StoreError> {
        match self.inner.exists(sol).await? {
            true => Ok(true),
            false => Err(StoreError::NotFound),
        }
    }

    async fn upsert(&self, picture: &Picture) -> Result<(), StoreError> {
        self.inner.upsert(picture).await
    }

    async fn find_by_sol(&self, sol: Sol) -> Result<Picture, StoreError> {
        self.inner.find_by_sol(sol).await
    }
}

pub fn sol(value: i64) -> Sol {
    Sol::new(value).unwrap()
}
