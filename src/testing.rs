//! Test doubles shared by the unit tests: a scripted platform behind the
//! [`Session`] trait, a scripted [`Transfer`] and an observer that records
//! everything it is told.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::download::Transfer;
use crate::error::{Error, Result};
use crate::events::{Event, Observer};
use crate::player::PlayerMode;
use crate::progress::ProgressSnapshot;
use crate::session::{Locator, Session};
use crate::site::SiteProfile;

pub const USERNAME: &str = "student@example.com";
pub const PASSWORD: &str = "hunter2";

/// Site profile pointing at the fake platform.
pub fn test_site() -> SiteProfile {
    SiteProfile {
        home_url: "https://platform.example".to_string(),
        domain_token: "platform".to_string(),
        ..SiteProfile::default()
    }
}

/// Records events and progress snapshots in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
    progress: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<ProgressSnapshot> {
        self.progress.lock().unwrap().clone()
    }

    /// Number of events whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message.contains(needle))
            .count()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_progress(&self, progress: &ProgressSnapshot) {
        self.progress.lock().unwrap().push(progress.clone());
    }
}

/// Fails the first `n` attempts for each URL, then writes a small file.
#[derive(Debug)]
pub struct ScriptedTransfer {
    fail_first: usize,
    attempts: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransfer {
    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn attempts_for(&self, url: &str) -> usize {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().values().sum()
    }

    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.attempts.lock().unwrap().keys().cloned().collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl Transfer for ScriptedTransfer {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if attempt <= self.fail_first {
            return Err(Error::Download(format!("scripted failure {attempt}")));
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, b"video").await?;
        Ok(5)
    }
}

/// One lesson of a fake tutorial.
#[derive(Debug, Clone)]
pub struct FakeLesson {
    pub position: String,
    pub title: String,
    pub id: String,
    /// Served by the cloud player.
    pub cloud: bool,
    /// Served by the frame player.
    pub frame: bool,
    pub relative_src: bool,
}

impl FakeLesson {
    pub fn new(position: &str, title: &str, id: &str) -> Self {
        Self {
            position: position.to_string(),
            title: title.to_string(),
            id: id.to_string(),
            cloud: true,
            frame: true,
            relative_src: false,
        }
    }

    pub fn frame_only(mut self) -> Self {
        self.cloud = false;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.cloud = false;
        self.frame = false;
        self
    }

    /// Drops the id attribute from the lesson list entry.
    pub fn without_id(mut self) -> Self {
        self.id = String::new();
        self
    }

    /// Lesson list entry carries the id attribute, but blank.
    pub fn with_blank_id(mut self) -> Self {
        self.id = " ".to_string();
        self
    }

    /// The player's `src` is written relative to the site root.
    pub fn with_relative_src(mut self) -> Self {
        self.relative_src = true;
        self
    }

    fn media_url(&self) -> String {
        if self.relative_src {
            format!("/media/{}.mp4", self.id)
        } else {
            format!("https://cdn.example/{}.mp4", self.id)
        }
    }
}

/// A tutorial page and its player.
#[derive(Debug, Clone)]
pub struct FakeTutorial {
    pub page_title: String,
    pub lessons: Vec<FakeLesson>,
    pub has_player: bool,
}

impl FakeTutorial {
    pub fn new(page_title: &str, lessons: Vec<FakeLesson>) -> Self {
        Self {
            page_title: page_title.to_string(),
            lessons,
            has_player: true,
        }
    }

    pub fn without_player(mut self) -> Self {
        self.has_player = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Blank,
    Home,
    Login,
    Tutorial(String),
    Player(String),
    Lesson { tutorial: String, id: String },
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeElement {
    SignIn,
    Email,
    Password,
    KeepLogin,
    LoginButton,
    PlayerLink,
    Lesson(usize),
    PauseControl,
    Source,
    Frame,
    PlayControl,
    Video,
    HelpLink,
    SwitchLink { visible: bool },
}

/// The tutorial platform, scripted.
///
/// Clicking a switch link toggles which player the whole site serves, the
/// way the real player preference is stored per account.
#[derive(Debug)]
pub struct FakeSession {
    site: SiteProfile,
    tutorials: HashMap<String, FakeTutorial>,
    page: Page,
    in_frame: bool,
    played: bool,
    help_open: bool,
    cloud_active: bool,
    switch_works: bool,
    frame_play_control: bool,
    typed_email: String,
    typed_password: String,
    keep_login_ticked: bool,
    logged_in: bool,
    closed: bool,
    calls: usize,
    opened: Vec<String>,
    probes: Vec<PlayerMode>,
}

impl FakeSession {
    pub fn new(site: SiteProfile) -> Self {
        Self {
            site,
            tutorials: HashMap::new(),
            page: Page::Blank,
            in_frame: false,
            played: false,
            help_open: false,
            cloud_active: true,
            switch_works: true,
            frame_play_control: true,
            typed_email: String::new(),
            typed_password: String::new(),
            keep_login_ticked: false,
            logged_in: false,
            closed: false,
            calls: 0,
            opened: Vec::new(),
            probes: Vec::new(),
        }
    }

    pub fn add_tutorial(&mut self, url: &str, tutorial: FakeTutorial) {
        self.tutorials.insert(url.to_string(), tutorial);
    }

    pub fn set_cloud_active(&mut self, active: bool) {
        self.cloud_active = active;
    }

    pub fn set_switch_works(&mut self, works: bool) {
        self.switch_works = works;
    }

    pub fn set_frame_play_control(&mut self, present: bool) {
        self.frame_play_control = present;
    }

    /// Jumps straight to the player page of `url`.
    pub fn open_player(&mut self, url: &str) {
        self.page = Page::Player(url.to_string());
    }

    pub fn cloud_active(&self) -> bool {
        self.cloud_active
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn keep_login_ticked(&self) -> bool {
        self.keep_login_ticked
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    /// Number of session calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn opened(&self) -> &[String] {
        &self.opened
    }

    /// Player probes made on lesson or player pages, in order.
    pub fn probes(&self) -> Vec<PlayerMode> {
        self.probes.clone()
    }

    fn tutorial(&self) -> Option<&FakeTutorial> {
        match &self.page {
            Page::Tutorial(url) | Page::Player(url) | Page::Lesson { tutorial: url, .. } => {
                self.tutorials.get(url)
            }
            _ => None,
        }
    }

    fn lesson(&self) -> Option<&FakeLesson> {
        let Page::Lesson { id, .. } = &self.page else {
            return None;
        };
        self.tutorial()?.lessons.iter().find(|l| &l.id == id)
    }

    fn lookup(&self, locator: &Locator) -> Vec<FakeElement> {
        let site = &self.site;
        let one = |present: bool, element: FakeElement| {
            if present { vec![element] } else { Vec::new() }
        };

        if self.in_frame {
            if *locator == site.frame_play_control {
                return one(self.frame_play_control, FakeElement::PlayControl);
            }
            if *locator == site.frame_media {
                return one(self.played, FakeElement::Video);
            }
            return Vec::new();
        }

        match &self.page {
            Page::Home if *locator == site.sign_in_link => vec![FakeElement::SignIn],
            Page::Login if *locator == site.email_field => vec![FakeElement::Email],
            Page::Login if *locator == site.password_field => vec![FakeElement::Password],
            Page::Login if *locator == site.keep_login_box => vec![FakeElement::KeepLogin],
            Page::Login if *locator == site.login_button => vec![FakeElement::LoginButton],
            Page::Tutorial(_) if *locator == site.player_link => one(
                self.tutorial().is_some_and(|t| t.has_player),
                FakeElement::PlayerLink,
            ),
            Page::Player(_) if *locator == site.lesson_list => self
                .tutorial()
                .map(|t| (0..t.lessons.len()).map(FakeElement::Lesson).collect())
                .unwrap_or_default(),
            Page::Player(_) if *locator == site.cloud_pause_control => {
                one(self.cloud_active, FakeElement::PauseControl)
            }
            Page::Player(_) | Page::Lesson { .. } if *locator == site.video_help_link => {
                vec![FakeElement::HelpLink]
            }
            Page::Player(_) | Page::Lesson { .. } if *locator == site.switch_player_links => {
                if self.help_open {
                    vec![
                        FakeElement::SwitchLink { visible: false },
                        FakeElement::SwitchLink { visible: true },
                        FakeElement::SwitchLink { visible: false },
                    ]
                } else {
                    Vec::new()
                }
            }
            Page::Lesson { .. } => {
                let cloud = self.cloud_active && self.lesson().is_some_and(|l| l.cloud);
                let frame = !self.cloud_active && self.lesson().is_some_and(|l| l.frame);
                if *locator == site.cloud_pause_control {
                    one(cloud, FakeElement::PauseControl)
                } else if *locator == site.cloud_media_source {
                    one(cloud, FakeElement::Source)
                } else if *locator == site.frame_player {
                    one(frame, FakeElement::Frame)
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    fn record_probe(&mut self, locator: &Locator) {
        if *locator == self.site.cloud_pause_control {
            self.probes.push(PlayerMode::Cloud);
        } else if *locator == self.site.frame_player {
            self.probes.push(PlayerMode::Frame);
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    type Element = FakeElement;

    async fn open(&mut self, url: &str) -> Result<()> {
        self.calls += 1;
        self.opened.push(url.to_string());
        self.in_frame = false;
        self.played = false;
        self.help_open = false;

        self.page = if url == self.site.home_url {
            Page::Home
        } else if let Some((tutorial, id)) = url
            .split_once(self.site.lesson_fragment.as_str())
            .filter(|(t, _)| self.tutorials.contains_key(*t))
        {
            Page::Lesson {
                tutorial: tutorial.to_string(),
                id: id.to_string(),
            }
        } else if self.tutorials.contains_key(url) {
            Page::Tutorial(url.to_string())
        } else {
            Page::Missing(url.to_string())
        };
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.calls += 1;
        Ok(match &self.page {
            Page::Blank => "about:blank".to_string(),
            Page::Home => self.site.home_url.clone(),
            Page::Login => format!("{}/login", self.site.home_url),
            Page::Tutorial(url) | Page::Player(url) | Page::Missing(url) => url.clone(),
            Page::Lesson { tutorial, id } => self.site.lesson_url(tutorial, id),
        })
    }

    async fn title(&mut self) -> Result<String> {
        self.calls += 1;
        Ok(match &self.page {
            Page::Blank => String::new(),
            Page::Home => "Digital-Tutors | Online Training".to_string(),
            Page::Login => "Login | Digital-Tutors".to_string(),
            Page::Missing(_) => "404 Not Found".to_string(),
            _ => self
                .tutorial()
                .map(|t| t.page_title.clone())
                .unwrap_or_default(),
        })
    }

    async fn find_element(&mut self, locator: &Locator) -> Result<Option<FakeElement>> {
        self.calls += 1;
        Ok(self.lookup(locator).into_iter().next())
    }

    async fn find_all_elements(&mut self, locator: &Locator) -> Result<Vec<FakeElement>> {
        self.calls += 1;
        Ok(self.lookup(locator))
    }

    async fn wait_for_element(
        &mut self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<Option<FakeElement>> {
        self.calls += 1;
        self.record_probe(locator);
        Ok(self.lookup(locator).into_iter().next())
    }

    async fn wait_for_all_elements(
        &mut self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<Vec<FakeElement>> {
        self.calls += 1;
        Ok(self.lookup(locator))
    }

    async fn wait_for_title(&mut self, prefix: &str, _timeout: Duration) -> Result<bool> {
        let title = self.title().await?;
        Ok(title.to_lowercase().starts_with(&prefix.to_lowercase()))
    }

    async fn attribute(&mut self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        self.calls += 1;
        let value = match element {
            FakeElement::Lesson(i) => {
                let Some(lesson) = self.tutorial().and_then(|t| t.lessons.get(*i)) else {
                    return Err(Error::Session("stale element reference".to_string()));
                };
                if name == self.site.lesson_title_attr {
                    Some(lesson.title.clone())
                } else if name == self.site.lesson_position_attr {
                    Some(lesson.position.clone())
                } else if name == self.site.lesson_id_attr {
                    Some(lesson.id.clone()).filter(|id| !id.is_empty())
                } else {
                    None
                }
            }
            _ => None,
        };
        Ok(value)
    }

    async fn property(&mut self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        self.calls += 1;
        let value = match element {
            FakeElement::Source | FakeElement::Video if name == "src" => {
                self.lesson().map(FakeLesson::media_url)
            }
            _ => None,
        };
        Ok(value)
    }

    async fn switch_to_frame(&mut self, element: &FakeElement) -> Result<()> {
        self.calls += 1;
        if *element != FakeElement::Frame {
            return Err(Error::Session("element is not a frame".to_string()));
        }
        self.in_frame = true;
        Ok(())
    }

    async fn switch_to_parent(&mut self) -> Result<()> {
        self.calls += 1;
        self.in_frame = false;
        Ok(())
    }

    async fn click(&mut self, element: &FakeElement) -> Result<()> {
        self.calls += 1;
        match element {
            FakeElement::SignIn => self.page = Page::Login,
            FakeElement::KeepLogin => self.keep_login_ticked = !self.keep_login_ticked,
            FakeElement::LoginButton => {
                if self.typed_email == USERNAME && self.typed_password == PASSWORD {
                    self.logged_in = true;
                    self.page = Page::Home;
                }
            }
            FakeElement::PlayerLink => {
                if let Page::Tutorial(url) = &self.page {
                    self.page = Page::Player(url.clone());
                }
            }
            FakeElement::PlayControl => self.played = true,
            FakeElement::HelpLink => self.help_open = true,
            FakeElement::SwitchLink { visible: false } => {
                return Err(Error::Session("element not interactable".to_string()));
            }
            FakeElement::SwitchLink { visible: true } => {
                if self.switch_works {
                    self.cloud_active = !self.cloud_active;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn send_keys(&mut self, element: &FakeElement, text: &str) -> Result<()> {
        self.calls += 1;
        match element {
            FakeElement::Email => self.typed_email.push_str(text),
            FakeElement::Password => self.typed_password.push_str(text),
            _ => return Err(Error::Session("element not editable".to_string())),
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.calls += 1;
        self.closed = true;
        Ok(())
    }
}
