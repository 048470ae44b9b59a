//! Human-readable sizes, durations and run summaries.

use std::time::Duration;

use crate::stats::DownloadStats;

/// Formats a byte count with a binary unit (B, KB, MB, GB).
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Formats a duration as `"4.2s"`, `"3m 07s"` or `"1h 02m 03s"`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0..60 => format!("{secs}.{}s", d.subsec_millis() / 100),
        60..3600 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!(
            "{}h {:02}m {:02}s",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        ),
    }
}

/// Formats a progress fraction as a percentage, clamped to 0..=100.
#[must_use]
pub fn format_percent(fraction: f64) -> String {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    format!("{:.1}%", fraction * 100.0)
}

/// One-line summary of a drained download pool.
#[must_use]
pub fn download_summary(stats: &DownloadStats) -> String {
    let mut line = format!(
        "{} video(s) downloaded, {} in {}",
        stats.succeeded,
        format_bytes(stats.total_bytes),
        format_duration(stats.elapsed)
    );
    if stats.total_bytes > 0 {
        line.push_str(&format!(" ({}/s)", format_bytes(stats.average_speed())));
    }
    if stats.failed > 0 {
        line.push_str(&format!(", {} failed", stats.failed));
    }
    let retries = stats.attempts.saturating_sub(stats.finished());
    if retries > 0 {
        line.push_str(&format!(", {retries} retried attempt(s)"));
    }
    line
}
