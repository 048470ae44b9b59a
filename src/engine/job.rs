//! Inputs of a run and the per-tutorial work the engine builds from them.

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::fs::{FileSystem, sanitize_file_name};
use crate::player::PlayerMode;

/// Environment variable holding the account name.
pub const USERNAME_ENV: &str = "TUT_DL_USERNAME";
/// Environment variable holding the account password.
pub const PASSWORD_ENV: &str = "TUT_DL_PASSWORD";

/// Account credentials for the platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads credentials from `TUT_DL_USERNAME` and `TUT_DL_PASSWORD`.
    /// Unset variables come back as empty strings.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            username: std::env::var(USERNAME_ENV).unwrap_or_default(),
            password: std::env::var(PASSWORD_ENV).unwrap_or_default(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a run needs besides the session and configuration.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub credentials: Credentials,
    /// Root under which one directory per tutorial is created.
    pub output_dir: PathBuf,
    /// Text file with one tutorial URL per line.
    pub queue_file: PathBuf,
}

impl RunParams {
    #[must_use]
    pub fn new(
        credentials: Credentials,
        output_dir: impl Into<PathBuf>,
        queue_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            credentials,
            output_dir: output_dir.into(),
            queue_file: queue_file.into(),
        }
    }

    /// Checks that no parameter is blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] naming the first blank parameter.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.trim().is_empty() {
            return Err(Error::MissingParameter("username"));
        }
        if self.credentials.password.is_empty() {
            return Err(Error::MissingParameter("password"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::MissingParameter("output directory"));
        }
        if self.queue_file.as_os_str().is_empty() {
            return Err(Error::MissingParameter("queue file"));
        }
        Ok(())
    }

    /// Full start precondition: no blank parameter, a readable queue file and
    /// an output directory that exists or can be created through `fs`.
    ///
    /// Touches only the local file system, so it can run before a browser is started.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] naming the first parameter that is
    /// blank or unusable.
    pub async fn check(&self, fs: &dyn FileSystem) -> Result<()> {
        self.validate()?;

        let queue_readable = tokio::fs::metadata(&self.queue_file)
            .await
            .is_ok_and(|m| m.is_file());
        if !queue_readable {
            return Err(Error::MissingParameter("queue file"));
        }
        if !fs.dir_exists(&self.output_dir).await {
            fs.create_dir_all(&self.output_dir).await.map_err(|e| {
                log::debug!("Cannot create {}: {e}", self.output_dir.display());
                Error::MissingParameter("output directory")
            })?;
        }
        Ok(())
    }
}

/// A tutorial being worked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialJob {
    /// Page URL as reported by the browser after navigation.
    pub source_url: String,
    /// Sanitized series title; also the directory name.
    pub title: String,
    pub dir: PathBuf,
    pub references_dir: PathBuf,
    /// Lessons found in the player's lesson list.
    pub lesson_count: usize,
    /// Player mode the next lesson is tried with first.
    pub mode: PlayerMode,
}

/// One lesson from the player's lesson list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDescriptor {
    pub title: String,
    /// Ordinal as shown in the lesson list, used as the file name prefix.
    pub position: String,
    pub id: String,
    pub media_url: Option<String>,
}

impl LessonDescriptor {
    /// `"<position> - <title>.mp4"`, safe as a file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{} - {}.mp4",
            sanitize_file_name(&self.position),
            sanitize_file_name(&self.title)
        )
    }
}
