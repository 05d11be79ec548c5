use std::path::Path;

use avscout_core::util::format_bytes_approx;
use avscout_lib::{ScanReport, Scanner, Settings};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::commands::{load_settings, spinner};
use crate::error::CliError;

/// Walk `dir` with the configured scanner settings.
pub(crate) fn scan_dir(settings: &Settings, dir: &Path) -> Result<ScanReport, CliError> {
    let scanner = Scanner::new(&settings.scanner)?;

    let pb = spinner(format!("Scanning {}...", dir.display()));
    let report = scanner.scan(dir);
    pb.finish_and_clear();
    Ok(report?)
}

/// Run the scan command.
pub(crate) fn run_scan(config: Option<&Path>, dir: &Path, json: bool) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let report = scan_dir(&settings, dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    log::info!(
        "Scanned: {}",
        report.root.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!("");

    for movie in &report.movies {
        log::info!(
            "{} {} {}",
            movie.key().if_supports_color(Stdout, |t| t.bold()),
            format!("[{}]", movie.classification()).if_supports_color(Stdout, |t| t.dimmed()),
            format_bytes_approx(movie.total_size()).if_supports_color(Stdout, |t| t.dimmed()),
        );
        for file in movie.files() {
            log::info!("    {}", report.relative(&file.path).display());
        }
    }
    print_leftovers(&report);

    log::info!("");
    log::info!(
        "{} {} movies ({} multi-part)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        report.movies.len(),
        report.movies.iter().filter(|m| m.is_multi_part()).count(),
    );
    Ok(())
}

/// Warn about everything the scan could not turn into a movie.
pub(crate) fn print_leftovers(report: &ScanReport) {
    for group in &report.ambiguous {
        log::warn!(
            "{} {}: {}",
            "!".if_supports_color(Stdout, |t| t.yellow()),
            group.key,
            group.reason,
        );
        for file in &group.files {
            log::warn!("    {}", report.relative(&file.path).display());
        }
    }
    for path in &report.unidentified {
        log::warn!(
            "{} {}: no identity found",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            report.relative(path).display(),
        );
    }
    if !report.skipped_small.is_empty() {
        log::info!(
            "{}",
            format!(
                "{} small file(s) skipped (samples, trailers)",
                report.skipped_small.len()
            )
            .if_supports_color(Stdout, |t| t.dimmed()),
        );
        for path in &report.skipped_small {
            log::debug!("    {}", report.relative(path).display());
        }
    }
}
