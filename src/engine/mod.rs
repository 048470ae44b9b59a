//! The orchestrator: walks the queue, drives the browser session and feeds the download pool.
//!
//! A run is a small state machine owned by a single task:
//!
//! ```text
//! Idle -> Authenticating -> IteratingQueue -> PreparingTutorial
//!      -> EnumeratingLessons -> Dispatching -> IteratingQueue ... -> Draining -> Done
//! ```
//!
//! Any state can end in `Aborted`. Recoverable problems (bad URL, tutorial
//! already on disk, missing player) are logged and skipped; everything else
//! ends the run and is reported in [`RunOutcome`].

mod job;

pub use job::{Credentials, LessonDescriptor, PASSWORD_ENV, RunParams, TutorialJob, USERNAME_ENV};

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::download::{DownloadPool, DownloadTask, HttpTransfer, PoolDrain, Transfer};
use crate::error::{Error, Result};
use crate::events::{Observer, Reporter};
use crate::fs::{FileSystem, TokioFileSystem, sanitize_file_name};
use crate::player::{PlayerMode, PlayerModeResolver};
use crate::progress::{ProgressSnapshot, ProgressTracker, UNITS_PER_TUTORIAL};
use crate::queue::{QueueEntry, QueueStore};
use crate::session::{Locator, Session};
use crate::site::SiteProfile;

/// Name of the subdirectory created next to each tutorial's videos.
pub const REFERENCES_DIR: &str = "References";

/// Where the orchestrator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Authenticating,
    IteratingQueue,
    PreparingTutorial,
    EnumeratingLessons,
    Dispatching,
    Draining,
    Done,
    Aborted,
}

impl EngineState {
    /// Whether the run is over.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// What a finished (or aborted) run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    /// Identifies the run in logs.
    pub run_id: Uuid,
    /// `Done` or `Aborted`.
    pub state: EngineState,
    /// Progress when the queue loop ended.
    pub progress: ProgressSnapshot,
    /// The error that ended the run early, if any.
    pub aborted: Option<Error>,
    /// Downloads still running in the background.
    pub downloads: PoolDrain,
}

/// Drives one download run over a [`Session`].
pub struct Engine<S: Session> {
    session: S,
    params: RunParams,
    config: EngineConfig,
    site: SiteProfile,
    fs: Arc<dyn FileSystem>,
    transfer: Arc<dyn Transfer>,
    reporter: Reporter,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
    state: EngineState,
}

impl<S: Session> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("params", &self.params)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S: Session> Engine<S> {
    /// Creates an engine that downloads over HTTP into the local file system.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(session: S, params: RunParams, config: EngineConfig, site: SiteProfile) -> Result<Self> {
        let transfer = Arc::new(HttpTransfer::new(&config)?);
        let reporter = Reporter::default();
        Ok(Self {
            session,
            params,
            config,
            site,
            fs: Arc::new(TokioFileSystem::new()),
            transfer,
            progress: Arc::new(ProgressTracker::new(reporter.clone())),
            reporter,
            cancel: CancellationToken::new(),
            state: EngineState::Idle,
        })
    }

    /// Sends events and progress to `observer`.
    ///
    /// Handles already taken from [`progress`](Self::progress) keep tracking this engine.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.reporter = Reporter::new(observer);
        self.progress.set_reporter(self.reporter.clone());
        self
    }

    /// Replaces the HTTP transfer used by the download pool.
    #[must_use]
    pub fn with_transfer(mut self, transfer: Arc<dyn Transfer>) -> Self {
        self.transfer = transfer;
        self
    }

    /// Replaces the file system used for tutorial directories.
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Stops the run at the next state transition once `token` is cancelled.
    /// Downloads not yet finished are abandoned.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Shared progress counters; clone the handle to watch a run from elsewhere.
    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Ends the browser session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails to close.
    pub async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }

    /// Processes the whole queue.
    ///
    /// Returns once every tutorial has been dispatched; downloads may still be
    /// running in [`RunOutcome::downloads`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] before touching the session if a
    /// start parameter is missing, and [`Error::InvalidState`] if this engine
    /// already ran. Failures during the run are reported in
    /// [`RunOutcome::aborted`] instead.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        if self.state != EngineState::Idle {
            return Err(Error::InvalidState("engine has already run"));
        }
        self.params.check(self.fs.as_ref()).await?;

        let run_id = Uuid::new_v4();
        log::debug!("Starting run {run_id}");
        let mut pool = DownloadPool::spawn(
            Arc::clone(&self.transfer),
            self.config.concurrent_downloads,
            self.reporter.clone(),
            self.cancel.child_token(),
        );

        let aborted = match self.drive(&mut pool).await {
            Ok(()) => {
                self.state = EngineState::Draining;
                None
            }
            Err(e) => {
                self.reporter.severe(format!("Run aborted: {e}"));
                self.state = EngineState::Aborted;
                Some(e)
            }
        };

        let downloads = pool.shutdown();
        let progress = self.progress.snapshot();
        if aborted.is_none() {
            self.state = EngineState::Done;
            self.reporter.info(format!(
                "Finished URL queue: {} tutorials, {} videos queued",
                progress.label,
                downloads.submitted()
            ));
        }
        log::debug!("Run {run_id} ended in {:?}", self.state);

        Ok(RunOutcome {
            run_id,
            state: self.state,
            progress,
            aborted,
            downloads,
        })
    }

    fn enter(&mut self, next: EngineState) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        log::trace!("{:?} -> {next:?}", self.state);
        self.state = next;
        Ok(())
    }

    async fn drive(&mut self, pool: &mut DownloadPool) -> Result<()> {
        self.reporter.info("Populating tutorial queue");
        let mut queue = QueueStore::load(&self.params.queue_file, &self.site)?;
        self.reporter
            .trace(format!("Added {} tutorial URLs to queue", queue.len()));
        self.progress.set_total(queue.len());

        self.enter(EngineState::Authenticating)?;
        self.login().await?;

        loop {
            self.enter(EngineState::IteratingQueue)?;
            let Some(entry) = queue.next_entry() else {
                break;
            };
            if !entry.is_valid() {
                self.reporter.warn(format!("Bad URL: {}", entry.url));
                self.progress.advance_tutorial();
                continue;
            }

            self.enter(EngineState::PreparingTutorial)?;
            let Some(mut job) = self.prepare_tutorial(&entry).await? else {
                self.progress.advance_tutorial();
                continue;
            };
            queue.record_title(entry.index, &job.title);

            self.enter(EngineState::EnumeratingLessons)?;
            let lessons = self.enumerate_lessons(&mut job).await?;
            if lessons.is_empty() {
                self.abandon_tutorial(&job).await;
                self.progress.advance_tutorial();
                continue;
            }

            self.enter(EngineState::Dispatching)?;
            self.dispatch(&mut job, lessons, pool).await?;
            self.progress.advance_tutorial();
            self.reporter
                .info(format!("Dispatched tutorial: {}", job.title));
        }
        Ok(())
    }

    async fn login(&mut self) -> Result<()> {
        let wait = self.config.wait_timeout();
        self.reporter.info("Logging in");

        self.session.open(&self.site.home_url).await?;
        let sign_in = self
            .session
            .wait_for_element(&self.site.sign_in_link, wait)
            .await?
            .ok_or_else(|| Error::UnexpectedPage("sign-in link not found".to_string()))?;
        self.session.click(&sign_in).await?;
        if !self
            .session
            .wait_for_title(&self.site.login_title, wait)
            .await?
        {
            return Err(Error::UnexpectedPage("login page did not load".to_string()));
        }

        let email = require(&mut self.session, &self.site.email_field, "email field").await?;
        let password =
            require(&mut self.session, &self.site.password_field, "password field").await?;
        let submit = require(&mut self.session, &self.site.login_button, "login button").await?;

        self.session
            .send_keys(&email, &self.params.credentials.username)
            .await?;
        self.session
            .send_keys(&password, &self.params.credentials.password)
            .await?;
        if self.config.keep_login {
            let keep =
                require(&mut self.session, &self.site.keep_login_box, "keep-login box").await?;
            self.session.click(&keep).await?;
        }
        self.session.click(&submit).await?;

        if !self
            .session
            .wait_for_title(&self.site.home_title, wait)
            .await?
        {
            return Err(Error::UnexpectedPage(
                "login was not accepted".to_string(),
            ));
        }
        self.reporter.trace("Logged in");
        Ok(())
    }

    /// Opens the tutorial page and creates its directories.
    ///
    /// `None` means the entry is skipped: no series title, or already downloaded.
    async fn prepare_tutorial(&mut self, entry: &QueueEntry) -> Result<Option<TutorialJob>> {
        self.reporter.info("Going to next tutorial");
        self.session.open(&entry.url).await?;
        let source_url = self.session.current_url().await?;
        let page_title = self.session.title().await?;

        let Some(series) = self.site.series_title(&page_title) else {
            self.reporter.warn(format!(
                "No tutorial name in page title \"{page_title}\": {}",
                entry.url
            ));
            return Ok(None);
        };
        self.reporter.info(format!("Tutorial name: {series}"));

        let title = sanitize_file_name(&series);
        let dir = self.params.output_dir.join(&title);
        if self.fs.dir_exists(&dir).await {
            self.reporter.warn(format!(
                "Tutorial folder already exists, skipping: {}",
                dir.display()
            ));
            return Ok(None);
        }

        self.reporter.trace("Creating folder");
        let references_dir = dir.join(REFERENCES_DIR);
        self.fs.create_dir_all(&references_dir).await?;

        Ok(Some(TutorialJob {
            source_url,
            title,
            dir,
            references_dir,
            lesson_count: 0,
            mode: PlayerMode::Cloud,
        }))
    }

    async fn enumerate_lessons(&mut self, job: &mut TutorialJob) -> Result<Vec<LessonDescriptor>> {
        self.reporter.trace("Going to video player");
        let Some(player_link) = self.session.find_element(&self.site.player_link).await? else {
            self.reporter
                .warn(format!("No video player link on {}", job.source_url));
            return Ok(Vec::new());
        };
        self.session.click(&player_link).await?;

        let resolver = PlayerModeResolver::new(&self.site, &self.config, &self.reporter);
        job.mode = resolver.detect_initial_mode(&mut self.session).await?;

        let entries = self
            .session
            .wait_for_all_elements(&self.site.lesson_list, self.config.wait_timeout())
            .await?;
        let mut lessons = Vec::with_capacity(entries.len());
        for element in &entries {
            let title = present(
                self.session
                    .attribute(element, &self.site.lesson_title_attr)
                    .await?,
            );
            let position = present(
                self.session
                    .attribute(element, &self.site.lesson_position_attr)
                    .await?,
            );
            let id = present(
                self.session
                    .attribute(element, &self.site.lesson_id_attr)
                    .await?,
            );
            match (title, position, id) {
                (Some(title), Some(position), Some(id)) => lessons.push(LessonDescriptor {
                    title,
                    position,
                    id,
                    media_url: None,
                }),
                _ => self
                    .reporter
                    .warn("Skipping lesson entry without title, position or id"),
            }
        }

        if lessons.is_empty() {
            self.reporter
                .warn(format!("No lessons found for {}", job.title));
        } else {
            self.reporter
                .info(format!("Downloading {} videos", lessons.len()));
        }
        job.lesson_count = lessons.len();
        Ok(lessons)
    }

    async fn dispatch(
        &mut self,
        job: &mut TutorialJob,
        lessons: Vec<LessonDescriptor>,
        pool: &mut DownloadPool,
    ) -> Result<()> {
        let share = UNITS_PER_TUTORIAL / job.lesson_count.max(1) as u64;

        for mut lesson in lessons {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.reporter.trace(format!(
                "Navigating to video page: ({}) {}",
                lesson.position, lesson.title
            ));

            let resolver = PlayerModeResolver::new(&self.site, &self.config, &self.reporter);
            let (link, mode) = resolver
                .resolve_lesson_link(&mut self.session, &lesson.id, &job.source_url, job.mode)
                .await?;
            job.mode = mode;
            lesson.media_url = link;

            match &lesson.media_url {
                Some(url) => {
                    let file_name = lesson.file_name();
                    pool.submit(DownloadTask::new(
                        url.clone(),
                        job.dir.join(&file_name),
                        self.config.max_retries,
                    ))?;
                    self.reporter.trace(format!("Downloading {file_name}"));
                }
                None => self.reporter.warn(format!(
                    "Skipping lesson ({}) {}: no video link",
                    lesson.position, lesson.title
                )),
            }
            self.progress.advance_current(share);
        }
        Ok(())
    }

    /// Removes a tutorial directory that will not be filled, so a later run retries it.
    async fn abandon_tutorial(&self, job: &TutorialJob) {
        if let Err(e) = self.fs.remove_dir_all(&job.dir).await {
            self.reporter.warn(format!(
                "Could not remove {}: {e}",
                job.dir.display()
            ));
        }
    }
}

/// An attribute that is absent or blank counts as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn require<S: Session>(session: &mut S, locator: &Locator, what: &str) -> Result<S::Element> {
    session
        .find_element(locator)
        .await?
        .ok_or_else(|| Error::UnexpectedPage(format!("{what} not found ({locator})")))
}
