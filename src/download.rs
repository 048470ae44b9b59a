//! Media downloads: the transfer abstraction and the bounded, retrying pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::Reporter;
use crate::fs::{FileSystem, TokioFileSystem};
use crate::stats::{DownloadStats, DownloadStatsTracker};

/// One media file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Direct media URL.
    pub url: String,
    /// Final location of the file.
    pub path: PathBuf,
    /// Attempts still allowed after the next one fails.
    pub retries_left: u32,
}

impl DownloadTask {
    #[must_use]
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>, retries: u32) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            retries_left: retries,
        }
    }

    /// File name used in status messages.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        )
    }
}

/// Returns the `.part` file path for a given final path.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Copies a remote resource to a local file.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Fetches `url` into `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// HTTP transfer using atomic `.part` file semantics.
///
/// Writes to `{dest}.part` while streaming, then renames to `{dest}` on
/// success. The `.part` file is removed when the transfer fails.
pub struct HttpTransfer<F: FileSystem = TokioFileSystem> {
    client: reqwest::Client,
    fs: F,
}

impl HttpTransfer<TokioFileSystem> {
    /// Creates a transfer with timeouts taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_fs(build_http_client(config)?, TokioFileSystem))
    }
}

impl<F: FileSystem> HttpTransfer<F> {
    /// Creates a transfer with a custom client and file system.
    #[must_use]
    pub const fn with_fs(client: reqwest::Client, fs: F) -> Self {
        Self { client, fs }
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let mut file = self.fs.create_file(part).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl<F: FileSystem> Transfer for HttpTransfer<F> {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }
        let part = part_path(dest);
        match self.stream_to(url, &part).await {
            Ok(written) => {
                self.fs.rename_file(&part, dest).await?;
                Ok(written)
            }
            Err(e) => {
                let _ = self.fs.remove_file(&part).await;
                Err(e)
            }
        }
    }
}

/// Builds the HTTP client used for media downloads.
fn build_http_client(config: &EngineConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .read_timeout(config.read_timeout())
        .pool_max_idle_per_host(config.concurrent_downloads)
        .build()
}

/// A fixed number of concurrent workers fed from an unbounded queue.
///
/// [`submit`](Self::submit) never waits. Tasks start in submission order as
/// workers free up. Outcomes are reported only through the [`Reporter`] and
/// the pool's [`DownloadStats`]; nothing the orchestrator awaits.
#[derive(Debug)]
pub struct DownloadPool {
    tx: mpsc::UnboundedSender<DownloadTask>,
    dispatcher: JoinHandle<()>,
    stats: Arc<DownloadStatsTracker>,
    submitted: usize,
}

impl DownloadPool {
    /// Starts the pool on the current tokio runtime.
    #[must_use]
    pub fn spawn(
        transfer: Arc<dyn Transfer>,
        concurrency: usize,
        reporter: Reporter,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(DownloadStatsTracker::new());
        let worker = Worker {
            transfer,
            reporter,
            stats: Arc::clone(&stats),
            cancel,
        };
        let dispatcher = tokio::spawn(dispatch(rx, worker, concurrency.max(1)));
        Self {
            tx,
            dispatcher,
            stats,
            submitted: 0,
        }
    }

    /// Queues `task` for a worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool's dispatcher is no longer running.
    pub fn submit(&mut self, task: DownloadTask) -> Result<()> {
        self.tx
            .send(task)
            .map_err(|e| Error::Download(format!("pool closed, dropped {}", e.0.file_name())))?;
        self.submitted += 1;
        Ok(())
    }

    /// Number of tasks accepted so far.
    #[must_use]
    pub const fn submitted(&self) -> usize {
        self.submitted
    }

    /// Counters as they are right now.
    #[must_use]
    pub fn stats(&self) -> DownloadStats {
        self.stats.snapshot()
    }

    /// Signals that no more work is coming. Queued and running tasks keep going.
    #[must_use]
    pub fn shutdown(self) -> PoolDrain {
        drop(self.tx);
        PoolDrain {
            dispatcher: self.dispatcher,
            stats: self.stats,
            submitted: self.submitted,
        }
    }

    /// Shuts the pool down and waits for every task to finish.
    pub async fn drain_and_wait(self) -> DownloadStats {
        self.shutdown().wait().await
    }
}

/// A pool that accepts no more work but may still be downloading.
#[derive(Debug)]
pub struct PoolDrain {
    dispatcher: JoinHandle<()>,
    stats: Arc<DownloadStatsTracker>,
    submitted: usize,
}

impl PoolDrain {
    /// Number of tasks the pool accepted.
    #[must_use]
    pub const fn submitted(&self) -> usize {
        self.submitted
    }

    /// Counters as they are right now.
    #[must_use]
    pub fn stats(&self) -> DownloadStats {
        self.stats.snapshot()
    }

    /// Waits until every accepted task succeeded or was given up on.
    pub async fn wait(self) -> DownloadStats {
        if let Err(e) = self.dispatcher.await {
            log::error!("Download dispatcher failed: {e}");
        }
        self.stats.snapshot()
    }
}

#[derive(Clone)]
struct Worker {
    transfer: Arc<dyn Transfer>,
    reporter: Reporter,
    stats: Arc<DownloadStatsTracker>,
    cancel: CancellationToken,
}

async fn dispatch(mut rx: mpsc::UnboundedReceiver<DownloadTask>, worker: Worker, concurrency: usize) {
    let slots = Arc::new(Semaphore::new(concurrency));
    let mut running = JoinSet::new();

    while let Some(task) = rx.recv().await {
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };
        let worker = worker.clone();
        running.spawn(async move {
            worker.run(task).await;
            drop(permit);
        });
    }

    while let Some(joined) = running.join_next().await {
        if let Err(e) = joined {
            log::error!("Download worker panicked: {e}");
        }
    }
}

impl Worker {
    async fn run(&self, mut task: DownloadTask) {
        let name = task.file_name();
        loop {
            if self.cancel.is_cancelled() {
                self.reporter.warn(format!("Download cancelled: {name}"));
                self.stats.record_failure();
                return;
            }

            self.stats.record_attempt();
            let result = tokio::select! {
                res = self.transfer.fetch(&task.url, &task.path) => res,
                () = self.cancel.cancelled() => Err(Error::Cancelled),
            };

            match result {
                Ok(bytes) => {
                    self.stats.record_success(bytes);
                    self.reporter.trace(format!("Downloaded {name}"));
                    return;
                }
                Err(Error::Cancelled) => {
                    let _ = tokio::fs::remove_file(part_path(&task.path)).await;
                    self.reporter.warn(format!("Download cancelled: {name}"));
                    self.stats.record_failure();
                    return;
                }
                Err(e) if task.retries_left > 0 => {
                    task.retries_left -= 1;
                    self.reporter
                        .warn(format!("Retrying video download: {name} ({e})"));
                }
                Err(e) => {
                    self.reporter
                        .warn(format!("Could not download video: {name} ({e})"));
                    self.stats.record_failure();
                    return;
                }
            }
        }
    }
}
