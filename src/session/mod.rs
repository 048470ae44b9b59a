//! The browser capability the engine drives.
//!
//! The engine never talks to a browser directly: it goes through [`Session`],
//! which [`WebDriverSession`] implements over the W3C WebDriver protocol and a
//! scripted fake implements in tests. Every call is awaited in sequence by the single
//! orchestrating task, so implementations need not be `Sync`.
//!
//! Waits report a timeout as an empty result rather than an error. Errors are
//! reserved for a session that can no longer be driven.

mod webdriver;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use webdriver::{ElementRef, WebDriverSession};

/// How to locate an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// An XPath expression.
    #[serde(rename = "xpath")]
    XPath(String),
    /// The element's `id` attribute.
    Id(String),
    /// The element's `name` attribute.
    Name(String),
    /// A CSS selector.
    Css(String),
}

impl Locator {
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPath(expr) => write!(f, "xpath {expr}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => write!(f, "[name={name}]"),
            Self::Css(css) => write!(f, "css {css}"),
        }
    }
}

/// An authenticated, navigable browser session.
#[async_trait]
pub trait Session: Send {
    /// Handle to an element on the current page (or frame).
    type Element: Clone + Send + Sync;

    /// Navigates to `url` and blocks until the page has loaded.
    async fn open(&mut self, url: &str) -> Result<()>;

    /// Returns the URL of the current page.
    async fn current_url(&mut self) -> Result<String>;

    /// Returns the title of the current page.
    async fn title(&mut self) -> Result<String>;

    /// Looks the element up once, without waiting.
    async fn find_element(&mut self, locator: &Locator) -> Result<Option<Self::Element>>;

    /// Returns every element currently matching `locator`.
    async fn find_all_elements(&mut self, locator: &Locator) -> Result<Vec<Self::Element>>;

    /// Waits up to `timeout` for an element to be present. `None` means timed out.
    async fn wait_for_element(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Self::Element>>;

    /// Waits up to `timeout` for at least one match, then returns all matches.
    /// An empty vector means timed out.
    async fn wait_for_all_elements(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Vec<Self::Element>>;

    /// Waits up to `timeout` for the page title to start with `prefix`
    /// (case-insensitive). Returns `false` on timeout.
    async fn wait_for_title(&mut self, prefix: &str, timeout: Duration) -> Result<bool>;

    /// Reads an attribute of `element` as written in the page.
    async fn attribute(&mut self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Reads a DOM property of `element`. For `src` and `href` the browser
    /// reports the resolved, absolute URL.
    async fn property(&mut self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Makes `element` (an iframe) the current browsing context.
    async fn switch_to_frame(&mut self, element: &Self::Element) -> Result<()>;

    /// Returns to the parent browsing context.
    async fn switch_to_parent(&mut self) -> Result<()>;

    async fn click(&mut self, element: &Self::Element) -> Result<()>;

    async fn send_keys(&mut self, element: &Self::Element, text: &str) -> Result<()>;

    /// Ends the browser session.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
