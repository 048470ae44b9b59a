//! Player mode detection and media URL extraction.
//!
//! A lesson's video is served by one of two players. The cloud player is
//! part of the page and exposes a `<source>` element; the frame player lives
//! in an iframe and only reveals its video element after its play control is
//! clicked. Each has its own extraction strategy, and a lesson is tried with
//! the mode that worked last, then once with the other.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::Reporter;
use crate::session::Session;
use crate::site::SiteProfile;

/// The two mutually exclusive player UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerMode {
    Cloud,
    Frame,
}

impl PlayerMode {
    /// The mode to fall back to.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Cloud => Self::Frame,
            Self::Frame => Self::Cloud,
        }
    }
}

impl fmt::Display for PlayerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud => f.write_str("cloud"),
            Self::Frame => f.write_str("frame"),
        }
    }
}

/// Outcome of one extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Direct media URL.
    Found(String),
    /// The player did not show up in time or had no media URL.
    NotFound,
}

impl Extraction {
    /// Turns a media element's `src` into an absolute URL, resolving a
    /// relative one against `page_url`.
    fn from_src(src: Option<String>, page_url: &str) -> Self {
        let Some(src) = src.filter(|s| !s.trim().is_empty()) else {
            return Self::NotFound;
        };
        if Url::parse(&src).is_ok() {
            return Self::Found(src);
        }
        match Url::parse(page_url).and_then(|base| base.join(&src)) {
            Ok(url) => Self::Found(url.into()),
            Err(e) => {
                log::debug!("Cannot resolve media URL {src} against {page_url}: {e}");
                Self::NotFound
            }
        }
    }
}

/// Reads the media URL of `element`.
async fn media_src<S: Session>(session: &mut S, element: &S::Element) -> Result<Extraction> {
    let src = session.property(element, "src").await?;
    let page_url = session.current_url().await?;
    Ok(Extraction::from_src(src, &page_url))
}

/// Stateless resolver; everything it needs is borrowed per call.
#[derive(Debug, Clone, Copy)]
pub struct PlayerModeResolver<'a> {
    site: &'a SiteProfile,
    reporter: &'a Reporter,
    wait: Duration,
    player_wait: Duration,
}

impl<'a> PlayerModeResolver<'a> {
    #[must_use]
    pub const fn new(site: &'a SiteProfile, config: &EngineConfig, reporter: &'a Reporter) -> Self {
        Self {
            site,
            reporter,
            wait: config.wait_timeout(),
            player_wait: config.player_wait_timeout(),
        }
    }

    /// Opens lesson `lesson_id` of the tutorial at `base_url` and extracts its media URL.
    ///
    /// Tries `assumed` first and, if that player does not appear, the other
    /// mode once. Returns the URL (or `None`) and the mode later lessons
    /// should assume.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session itself fails; a missing player is `None`.
    pub async fn resolve_lesson_link<S: Session>(
        &self,
        session: &mut S,
        lesson_id: &str,
        base_url: &str,
        assumed: PlayerMode,
    ) -> Result<(Option<String>, PlayerMode)> {
        session.open(&self.site.lesson_url(base_url, lesson_id)).await?;

        if let Extraction::Found(url) = self.extract(session, assumed).await? {
            return Ok((Some(url), assumed));
        }

        let fallback = assumed.other();
        self.reporter.warn(format!(
            "Could not find {assumed} player. Trying {fallback} player"
        ));
        match self.extract(session, fallback).await? {
            Extraction::Found(url) => Ok((Some(url), fallback)),
            Extraction::NotFound => {
                self.reporter
                    .warn(format!("Could not find player for lesson {lesson_id}"));
                Ok((None, fallback))
            }
        }
    }

    /// Runs the strategy for `mode` on the current page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails.
    pub async fn extract<S: Session>(&self, session: &mut S, mode: PlayerMode) -> Result<Extraction> {
        match mode {
            PlayerMode::Cloud => self.extract_cloud(session).await,
            PlayerMode::Frame => self.extract_frame(session).await,
        }
    }

    async fn extract_cloud<S: Session>(&self, session: &mut S) -> Result<Extraction> {
        if session
            .wait_for_element(&self.site.cloud_pause_control, self.player_wait)
            .await?
            .is_none()
        {
            return Ok(Extraction::NotFound);
        }
        let Some(source) = session.find_element(&self.site.cloud_media_source).await? else {
            return Ok(Extraction::NotFound);
        };
        media_src(session, &source).await
    }

    async fn extract_frame<S: Session>(&self, session: &mut S) -> Result<Extraction> {
        let Some(frame) = session
            .wait_for_element(&self.site.frame_player, self.player_wait)
            .await?
        else {
            return Ok(Extraction::NotFound);
        };

        session.switch_to_frame(&frame).await?;
        let inside = self.extract_inside_frame(session).await;
        // Leave the frame whatever happened inside it.
        let restored = session.switch_to_parent().await;
        let extraction = inside?;
        restored?;
        Ok(extraction)
    }

    async fn extract_inside_frame<S: Session>(&self, session: &mut S) -> Result<Extraction> {
        let Some(play) = session.find_element(&self.site.frame_play_control).await? else {
            return Ok(Extraction::NotFound);
        };
        session.click(&play).await?;
        self.reporter.trace("Waiting on video");
        let Some(video) = session
            .wait_for_element(&self.site.frame_media, self.wait)
            .await?
        else {
            return Ok(Extraction::NotFound);
        };
        media_src(session, &video).await
    }

    /// Decides which mode to assume for a freshly opened player page.
    ///
    /// Prefers the cloud player: if it is not live, toggles the player once
    /// and probes again. Falls back to the frame player when the cloud player
    /// never appears.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails.
    pub async fn detect_initial_mode<S: Session>(&self, session: &mut S) -> Result<PlayerMode> {
        if self.cloud_present(session).await? {
            self.reporter.trace("Cloud player found");
            return Ok(PlayerMode::Cloud);
        }

        self.reporter
            .warn("Could not find cloud player. Trying to switch");
        if self.switch_player(session).await? && self.cloud_present(session).await? {
            self.reporter.trace("Cloud player found");
            return Ok(PlayerMode::Cloud);
        }

        self.reporter
            .warn("Switching to cloud player failed. Using frame player");
        Ok(PlayerMode::Frame)
    }

    async fn cloud_present<S: Session>(&self, session: &mut S) -> Result<bool> {
        Ok(session
            .wait_for_element(&self.site.cloud_pause_control, self.wait)
            .await?
            .is_some())
    }

    /// Toggles between the players through the video help menu.
    ///
    /// The menu holds several switch links and only the visible one accepts a
    /// click. Returns whether any click went through.
    async fn switch_player<S: Session>(&self, session: &mut S) -> Result<bool> {
        let Some(help) = session.find_element(&self.site.video_help_link).await? else {
            self.reporter.warn("Video help link not found");
            return Ok(false);
        };
        session.click(&help).await?;

        let links = session
            .wait_for_all_elements(&self.site.switch_player_links, self.wait)
            .await?;
        let mut switched = false;
        for link in &links {
            match session.click(link).await {
                Ok(()) => switched = true,
                Err(e) => log::debug!("Switch link not clickable: {e}"),
            }
        }
        if !switched {
            self.reporter.warn("No switch player link could be clicked");
        }
        Ok(switched)
    }
}
