//! Status events and the observer interface a front-end subscribes with.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::progress::ProgressSnapshot;

/// How much attention an event deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Fine-grained trace of what the engine is doing.
    Trace,
    /// A milestone: queue loaded, tutorial started, run finished.
    Info,
    /// Something went wrong but the run carries on.
    Warning,
    /// The run cannot continue.
    Severe,
}

impl Severity {
    /// The `log` level events of this severity are forwarded at.
    #[must_use]
    pub const fn log_level(self) -> log::Level {
        match self {
            Self::Trace => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Severe => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Severe => "SEVERE",
        };
        f.write_str(s)
    }
}

/// One status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Event {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Trait for receiving engine status and progress.
///
/// Callbacks may arrive from the orchestrating task and from download
/// workers, so implementations must be thread-safe. All methods have default
/// no-op implementations.
pub trait Observer: Send + Sync {
    /// Called for every status event.
    fn on_event(&self, _event: &Event) {}

    /// Called whenever the progress fraction or label changes.
    fn on_progress(&self, _progress: &ProgressSnapshot) {}
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl Observer for NoObserver {}

/// Messages delivered by [`ChannelObserver`].
#[derive(Debug, Clone)]
pub enum EngineMessage {
    Event(Event),
    Progress(ProgressSnapshot),
}

/// Forwards everything into an unbounded channel the caller polls.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<EngineMessage>,
}

impl ChannelObserver {
    /// Creates the observer together with its receiving end.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn on_event(&self, event: &Event) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(EngineMessage::Event(event.clone()));
    }

    fn on_progress(&self, progress: &ProgressSnapshot) {
        let _ = self.tx.send(EngineMessage::Progress(progress.clone()));
    }
}

/// Sends events to the observer.
///
/// A reporter without an observer writes its events to the `log` facade
/// instead, so library use without a front end still leaves a trail. Once an
/// observer is attached it alone shows the events.
#[derive(Clone)]
pub struct Reporter {
    observer: Arc<dyn Observer>,
    to_log: bool,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("to_log", &self.to_log)
            .finish_non_exhaustive()
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            observer: Arc::new(NoObserver),
            to_log: true,
        }
    }
}

impl Reporter {
    #[must_use]
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self {
            observer,
            to_log: false,
        }
    }

    /// The observer events are delivered to.
    #[must_use]
    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    /// Whether events go to the `log` facade.
    #[must_use]
    pub const fn logs_events(&self) -> bool {
        self.to_log
    }

    pub fn emit(&self, severity: Severity, message: impl Into<String>) {
        let event = Event::new(severity, message);
        if self.to_log {
            log::log!(target: "tut_dl", severity.log_level(), "{}", event.message);
        }
        self.observer.on_event(&event);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.emit(Severity::Trace, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Severity::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Severity::Warning, message);
    }

    pub fn severe(&self, message: impl Into<String>) {
        self.emit(Severity::Severe, message);
    }

    pub fn progress(&self, snapshot: &ProgressSnapshot) {
        self.observer.on_progress(snapshot);
    }
}
