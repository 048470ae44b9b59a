//! [`Session`] over the W3C WebDriver wire protocol.
//!
//! Talks JSON over HTTP to a running driver (geckodriver, chromedriver,
//! a Selenium server). Waits poll the driver until the deadline passes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Locator, Session};
use crate::error::{Error, Result};

/// Key under which the protocol returns web element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opaque reference to an element in the driver's current browsing context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| Self(id.to_string()))
            .ok_or_else(|| Error::Session(format!("malformed element reference: {value}")))
    }

    fn to_value(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    value: Value,
}

/// Error object a driver sends with a non-2xx status.
#[derive(Debug, Deserialize)]
struct Failure {
    error: String,
    #[serde(default)]
    message: String,
}

impl Failure {
    fn is_no_such_element(&self) -> bool {
        self.error == "no such element"
    }

    fn into_error(self) -> Error {
        Error::Session(format!("{}: {}", self.error, self.message))
    }
}

/// Maps a locator onto a W3C location strategy and selector.
fn strategy(locator: &Locator) -> (&'static str, String) {
    match locator {
        Locator::XPath(expr) => ("xpath", expr.clone()),
        Locator::Css(css) => ("css selector", css.clone()),
        Locator::Id(id) => ("css selector", format!("[id=\"{id}\"]")),
        Locator::Name(name) => ("css selector", format!("[name=\"{name}\"]")),
    }
}

/// A browser session held by a WebDriver server.
#[derive(Debug)]
pub struct WebDriverSession {
    client: reqwest::Client,
    session_url: String,
    closed: bool,
}

impl WebDriverSession {
    /// Starts a new browser session on the driver at `webdriver_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is unreachable or refuses the session.
    pub async fn connect(webdriver_url: &str) -> Result<Self> {
        let client = reqwest::Client::new();
        let base = webdriver_url.trim_end_matches('/');
        let body = json!({ "capabilities": { "alwaysMatch": {} } });

        let value = match send(&client, Method::POST, &format!("{base}/session"), Some(&body)).await? {
            Ok(value) => value,
            Err(failure) => return Err(failure.into_error()),
        };
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Session(format!("no session id in {value}")))?;
        log::debug!("WebDriver session {session_id} started on {base}");

        Ok(Self {
            client,
            session_url: format!("{base}/session/{session_id}"),
            closed: false,
        })
    }

    async fn raw(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<std::result::Result<Value, Failure>> {
        let url = format!("{}{path}", self.session_url);
        send(&self.client, method, &url, body).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.raw(Method::GET, path, None)
            .await?
            .map_err(Failure::into_error)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.raw(Method::POST, path, Some(body))
            .await?
            .map_err(Failure::into_error)
    }

    async fn get_string(&self, path: &str) -> Result<String> {
        let value = self.get(path).await?;
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| Error::Session(format!("expected a string from {path}, got {value}")))
    }
}

async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<std::result::Result<Value, Failure>> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(body);
    }
    let response = request.send().await?;
    let status = response.status();
    let reply: Reply = response.json().await?;

    if status.is_success() {
        return Ok(Ok(reply.value));
    }
    match serde_json::from_value::<Failure>(reply.value) {
        Ok(failure) => Ok(Err(failure)),
        Err(e) => Err(Error::Session(format!("HTTP {status} from {url}: {e}"))),
    }
}

#[async_trait]
impl Session for WebDriverSession {
    type Element = ElementRef;

    async fn open(&mut self, url: &str) -> Result<()> {
        self.post("/url", &json!({ "url": url })).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.get_string("/url").await
    }

    async fn title(&mut self) -> Result<String> {
        self.get_string("/title").await
    }

    async fn find_element(&mut self, locator: &Locator) -> Result<Option<ElementRef>> {
        let (using, value) = strategy(locator);
        let body = json!({ "using": using, "value": value });
        match self.raw(Method::POST, "/element", Some(&body)).await? {
            Ok(found) => ElementRef::from_value(&found).map(Some),
            Err(failure) if failure.is_no_such_element() => Ok(None),
            Err(failure) => Err(failure.into_error()),
        }
    }

    async fn find_all_elements(&mut self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let (using, value) = strategy(locator);
        let found = self
            .post("/elements", &json!({ "using": using, "value": value }))
            .await?;
        found
            .as_array()
            .map(|items| items.iter().map(ElementRef::from_value).collect())
            .unwrap_or_else(|| Err(Error::Session(format!("expected an element list, got {found}"))))
    }

    async fn wait_for_element(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<ElementRef>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find_element(locator).await? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                log::debug!("Timed out after {timeout:?} waiting for {locator}");
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_all_elements(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Vec<ElementRef>> {
        if self.wait_for_element(locator, timeout).await?.is_none() {
            return Ok(Vec::new());
        }
        self.find_all_elements(locator).await
    }

    async fn wait_for_title(&mut self, prefix: &str, timeout: Duration) -> Result<bool> {
        let prefix = prefix.to_lowercase();
        let deadline = Instant::now() + timeout;
        loop {
            if self.title().await?.to_lowercase().starts_with(&prefix) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self
            .get(&format!("/element/{}/attribute/{name}", element.0))
            .await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    async fn property(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self
            .get(&format!("/element/{}/property/{name}", element.0))
            .await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    async fn switch_to_frame(&mut self, element: &ElementRef) -> Result<()> {
        self.post("/frame", &json!({ "id": element.to_value() }))
            .await?;
        Ok(())
    }

    async fn switch_to_parent(&mut self) -> Result<()> {
        self.post("/frame/parent", &json!({})).await?;
        Ok(())
    }

    async fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.post(&format!("/element/{}/click", element.0), &json!({}))
            .await?;
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<()> {
        self.post(
            &format!("/element/{}/value", element.0),
            &json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.raw(Method::DELETE, "", None)
            .await?
            .map_err(Failure::into_error)?;
        self.closed = true;
        Ok(())
    }
}
