//! Command-line front end: argument parsing, terminal output and the run itself.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::events::{Event, Observer, Severity};
use crate::{AppConfig, Credentials, Engine, RunParams, TokioFileSystem, WebDriverSession};

pub use progress::{TerminalObserver, print_summary};

/// Options collected from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub queue: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub webdriver: Option<String>,
    pub keep_login: bool,
    pub verbose: bool,
    pub help: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            queue: None,
            output: None,
            config: None,
            webdriver: None,
            keep_login: true,
            verbose: false,
            help: false,
        }
    }
}

/// Parses arguments (without the program name).
///
/// # Errors
///
/// Returns a message for an unknown option or a missing option value.
pub fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match arg.as_str() {
            "-q" | "--queue" => parsed.queue = Some(value("--queue")?.into()),
            "-o" | "--output" => parsed.output = Some(value("--output")?.into()),
            "-c" | "--config" => parsed.config = Some(value("--config")?.into()),
            "--webdriver" => parsed.webdriver = Some(value("--webdriver")?),
            "--no-keep-login" => parsed.keep_login = false,
            "-v" | "--verbose" => parsed.verbose = true,
            "-h" | "--help" => parsed.help = true,
            other => return Err(format!("Unknown option: {other}")),
        }
    }
    Ok(parsed)
}

pub fn print_usage() {
    eprintln!("Usage: tut-dl --queue <file> --output <dir> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -q, --queue <FILE>     Text file with one tutorial URL per line");
    eprintln!("  -o, --output <DIR>     Directory the tutorials are downloaded into");
    eprintln!("  -c, --config <FILE>    Config file (default: {})", AppConfig::default_path().display());
    eprintln!("      --webdriver <URL>  WebDriver server (default: http://localhost:4444)");
    eprintln!("      --no-keep-login    Do not tick the keep-me-logged-in box");
    eprintln!("  -v, --verbose          Also print trace events");
    eprintln!("  -h, --help             Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {:<22} Account name", crate::USERNAME_ENV);
    eprintln!("  {:<22} Account password", crate::PASSWORD_ENV);
    eprintln!("  RUST_LOG               Log filter (default: info)");
}

/// Runs the whole queue with credentials from the environment and waits for every download.
///
/// Ctrl-C cancels the run; downloads still in flight are abandoned.
///
/// # Errors
///
/// Returns the precondition, connection or abort error that ended the run.
pub async fn run(args: CliArgs) -> crate::Result<()> {
    run_as(args, Credentials::from_env()).await
}

/// [`run`] with explicit credentials.
///
/// # Errors
///
/// Returns the precondition, connection or abort error that ended the run.
pub async fn run_as(args: CliArgs, credentials: Credentials) -> crate::Result<()> {
    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)?;
    if let Some(url) = args.webdriver {
        config.webdriver_url = url;
    }
    if !args.keep_login {
        config.engine.keep_login = false;
    }

    let params = RunParams::new(
        credentials,
        args.output.unwrap_or_default(),
        args.queue.unwrap_or_default(),
    );
    // No browser is started unless the queue and output directory are usable.
    params.check(&TokioFileSystem::new()).await?;

    log::info!("Connecting to WebDriver at {}", config.webdriver_url);
    let session = WebDriverSession::connect(&config.webdriver_url).await?;

    let observer = Arc::new(TerminalObserver::new(args.verbose));
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt_observer = Arc::clone(&observer);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt_observer.on_event(&Event::new(
                Severity::Warning,
                "Interrupted, stopping after the current step",
            ));
            on_interrupt.cancel();
        }
    });

    let mut engine = Engine::new(session, params, config.engine, config.site)?
        .with_observer(observer.clone())
        .with_cancellation(cancel);

    let result = engine.run().await;
    if let Err(e) = engine.close().await {
        observer.on_event(&Event::new(
            Severity::Warning,
            format!("Could not close browser session: {e}"),
        ));
    }
    let outcome = result?;

    observer.waiting_for_downloads(outcome.downloads.submitted());
    let stats = outcome.downloads.wait().await;
    observer.finish();
    print_summary(&outcome.progress, &stats);

    outcome.aborted.map_or(Ok(()), Err)
}
