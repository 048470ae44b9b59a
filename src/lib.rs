//! tut-dl - bulk downloader for the video lessons of a tutorial platform.
//!
//! The [`Engine`] logs in once through a browser [`Session`], walks a queue
//! of tutorial URLs, works out which of the platform's two video players
//! serves each lesson, and hands the media URLs to a bounded
//! [`DownloadPool`]. Status goes to an [`Observer`]; progress is tracked in
//! tutorial-sized units so it stays consistent when tutorials are skipped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tut_dl::{AppConfig, ChannelObserver, Credentials, Engine, RunParams, WebDriverSession};
//!
//! # async fn example() -> tut_dl::Result<()> {
//! let config = AppConfig::default();
//! let session = WebDriverSession::connect(&config.webdriver_url).await?;
//! let params = RunParams::new(Credentials::from_env(), "videos", "queue.txt");
//!
//! let (observer, mut messages) = ChannelObserver::new();
//! tokio::spawn(async move {
//!     while let Some(message) = messages.recv().await {
//!         println!("{message:?}");
//!     }
//! });
//!
//! let mut engine = Engine::new(session, params, config.engine, config.site)?
//!     .with_observer(Arc::new(observer));
//! let outcome = engine.run().await?;
//! let stats = outcome.downloads.wait().await;
//! println!("{} videos downloaded", stats.succeeded);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod fs;
pub mod player;
pub mod progress;
pub mod queue;
pub mod session;
pub mod site;
pub mod stats;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, EngineConfig};
pub use download::{DownloadPool, DownloadTask, HttpTransfer, PoolDrain, Transfer};
pub use engine::{
    Credentials, Engine, EngineState, LessonDescriptor, PASSWORD_ENV, RunOutcome, RunParams,
    TutorialJob, USERNAME_ENV,
};
pub use error::{Error, Result};
pub use events::{ChannelObserver, EngineMessage, Event, NoObserver, Observer, Reporter, Severity};
pub use format::{download_summary, format_bytes, format_duration, format_percent};
pub use fs::{FileSystem, TokioFileSystem, sanitize_file_name};
pub use player::{Extraction, PlayerMode, PlayerModeResolver};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use queue::{QueueEntry, QueueStore, Validity};
pub use session::{ElementRef, Locator, Session, WebDriverSession};
pub use site::SiteProfile;
pub use stats::{DownloadStats, DownloadStatsTracker};
