//! Terminal rendering of engine events and progress.

use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::events::{Event, Observer, Severity};
use crate::progress::ProgressSnapshot;
use crate::{DownloadStats, download_summary, format_percent};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Resolution of the overall progress bar.
const BAR_LENGTH: u64 = 1000;

/// Maps a progress fraction onto the bar's position.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn bar_position(fraction: f64) -> u64 {
    let scaled = (fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64).round();
    (scaled as u64).min(BAR_LENGTH)
}

fn severity_tag(severity: Severity) -> StyledObject<&'static str> {
    match severity {
        Severity::Trace => style("  ").dim(),
        Severity::Info => style("::").green().bold(),
        Severity::Warning => style("!!").yellow().bold(),
        Severity::Severe => style("XX").red().bold(),
    }
}

/// Shows one overall bar and prints events above it.
#[derive(Debug)]
pub struct TerminalObserver {
    bar: ProgressBar,
    verbose: bool,
}

impl TerminalObserver {
    /// Trace events are only printed when `verbose` is set.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        let bar = ProgressBar::new(BAR_LENGTH);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {elapsed_precise} tutorials {msg}",
            )
            .expect("progress template is valid")
            .progress_chars("━━╌"),
        );
        bar.set_message("0/0");
        Self { bar, verbose }
    }

    /// Marks the queue as done while background downloads finish.
    pub fn waiting_for_downloads(&self, pending: usize) {
        self.bar
            .set_message(format!("done, waiting for {pending} queued video(s)"));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Observer for TerminalObserver {
    fn on_event(&self, event: &Event) {
        if event.severity == Severity::Trace && !self.verbose {
            return;
        }
        self.bar.println(format!(
            "{} {} {}",
            style(event.at.format("%H:%M:%S")).dim(),
            severity_tag(event.severity),
            event.message
        ));
    }

    fn on_progress(&self, progress: &ProgressSnapshot) {
        self.bar.set_position(bar_position(progress.fraction()));
        self.bar.set_message(format!(
            "{} ({})",
            progress.label,
            format_percent(progress.fraction())
        ));
    }
}

/// Prints the end-of-run summary.
pub fn print_summary(progress: &ProgressSnapshot, stats: &DownloadStats) {
    println!("\n{SEPARATOR}");
    println!("{}", style("Run Summary").bold());
    println!("{SEPARATOR}");
    println!("  Tutorials:         {}", progress.label);
    println!("  Videos:            {}", download_summary(stats));
    if stats.failed > 0 {
        println!(
            "  {}",
            style(format!("{} video(s) could not be downloaded", stats.failed)).yellow()
        );
    }
    println!("{SEPARATOR}");
}
