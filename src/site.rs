//! Site profile: the addresses, tokens and element locators of the tutorial platform.

use serde::{Deserialize, Serialize};

use crate::session::Locator;

/// Everything the engine needs to know about the platform's pages.
///
/// Defaults describe the live site; a config file can override any field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Page opened to start the login flow.
    pub home_url: String,
    /// Substring the host of a tutorial URL must contain.
    pub domain_token: String,
    /// Substring the path of a tutorial URL must contain.
    pub path_token: String,
    /// Separator between the segments of a tutorial page title.
    pub title_separator: String,
    /// Index of the title segment that names the tutorial series.
    pub title_segment: usize,
    /// Appended to the tutorial URL, followed by the lesson id, to open a lesson.
    pub lesson_fragment: String,
    /// Title prefix of the login page.
    pub login_title: String,
    /// Title prefix of the page shown after a successful login.
    pub home_title: String,
    pub lesson_title_attr: String,
    pub lesson_position_attr: String,
    pub lesson_id_attr: String,

    pub sign_in_link: Locator,
    pub email_field: Locator,
    pub password_field: Locator,
    pub keep_login_box: Locator,
    pub login_button: Locator,

    /// Link from a tutorial page into the player.
    pub player_link: Locator,
    /// One entry per lesson in the player's lesson list.
    pub lesson_list: Locator,

    /// Pause control; its presence means the cloud player is live.
    pub cloud_pause_control: Locator,
    /// Media source element of the cloud player.
    pub cloud_media_source: Locator,
    /// Iframe hosting the frame player.
    pub frame_player: Locator,
    /// Play control inside the frame player.
    pub frame_play_control: Locator,
    /// Video element inside the frame player.
    pub frame_media: Locator,

    pub video_help_link: Locator,
    pub switch_player_links: Locator,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            home_url: "https://www.digitaltutors.com".to_string(),
            domain_token: "digitaltutors".to_string(),
            path_token: "tutorial".to_string(),
            title_separator: ">".to_string(),
            title_segment: 2,
            lesson_fragment: "#play-".to_string(),
            login_title: "login".to_string(),
            home_title: "digital-tutors".to_string(),
            lesson_title_attr: "data-title".to_string(),
            lesson_position_attr: "data-position".to_string(),
            lesson_id_attr: "data-lesson_id".to_string(),

            sign_in_link: Locator::xpath("//*[@id='ulLoggedInStatus']/li[3]/div/a"),
            email_field: Locator::name("p_email"),
            password_field: Locator::name("p_password"),
            keep_login_box: Locator::name("p_keep_logged_in"),
            login_button: Locator::xpath("//button"),

            player_link: Locator::xpath("//a[contains(@href, 'play-')]"),
            lesson_list: Locator::xpath(
                "//div[@class='scrollable_container']/div[contains(@id, 'divLesson')]",
            ),

            cloud_pause_control: Locator::xpath("//a[@title='Pause']"),
            cloud_media_source: Locator::xpath("//source"),
            frame_player: Locator::id("myExperience"),
            frame_play_control: Locator::id("$bc14"),
            frame_media: Locator::id("bcVideo"),

            video_help_link: Locator::xpath("//a[@id='lnkVideoHelp']"),
            switch_player_links: Locator::xpath("//a[@class='lnkSwitchPlayers']"),
        }
    }
}

impl SiteProfile {
    /// Extracts the series name from a tutorial page title.
    ///
    /// Titles look like `"Tutorials > Maya > Introduction to Rigging"`; the
    /// segment at [`title_segment`](Self::title_segment) is returned trimmed.
    /// Returns `None` when the title has too few segments or the segment is blank.
    #[must_use]
    pub fn series_title(&self, page_title: &str) -> Option<String> {
        page_title
            .split(self.title_separator.as_str())
            .map(str::trim)
            .nth(self.title_segment)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }

    /// Builds the address of one lesson within a tutorial.
    #[must_use]
    pub fn lesson_url(&self, tutorial_url: &str, lesson_id: &str) -> String {
        format!("{tutorial_url}{}{lesson_id}", self.lesson_fragment)
    }
}
