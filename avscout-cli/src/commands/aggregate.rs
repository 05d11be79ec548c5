use std::path::{Path, PathBuf};

use avscout_core::{Classification, Field, Movie};
use avscout_lib::async_util::run_with_events;
use avscout_scraper::{
    AggregateEvent, Aggregation, ConnectorRegistry, Orchestrator, Outcome, RunLog,
};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use serde::Serialize;

use crate::commands::scan::{print_leftovers, scan_dir};
use crate::commands::{load_settings, runtime, spinner};
use crate::error::CliError;

/// One movie's entry in `--json` output.
#[derive(Serialize)]
struct MovieResult<'a> {
    movie: &'a Movie,
    #[serde(flatten)]
    aggregation: &'a Aggregation,
}

/// Run the aggregate command.
pub(crate) fn run_aggregate(
    config: Option<&Path>,
    dir: &Path,
    json: bool,
    no_log: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let report = scan_dir(&settings, dir)?;

    let registry = ConnectorRegistry::from_settings(&settings);
    let orchestrator = Orchestrator::from_settings(&settings, &registry)?;
    if Classification::ALL
        .iter()
        .all(|c| settings.sources.for_classification(*c).is_empty())
    {
        log::warn!(
            "{} No connectors listed under [sources]; records will only hold derived fields",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
        );
    }

    if !json {
        log::info!(
            "Collecting metadata for {} movies in {}",
            report.movies.len(),
            report.root.display().if_supports_color(Stdout, |t| t.cyan()),
        );
        log::info!("");
    }

    let mut run_log = RunLog::new();
    run_log.record_scan(&report);

    let total = report.movies.len();
    let rt = runtime()?;
    let results: Vec<Aggregation> = rt.block_on(async {
        let mut results = Vec::with_capacity(total);
        for (index, movie) in report.movies.iter().enumerate() {
            let pb = spinner(format!("[{}/{}] {}", index + 1, total, movie.key()));
            let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();

            let aggregation = run_with_events(
                async {
                    let result = orchestrator.aggregate(movie, Some(&event_tx)).await;
                    drop(event_tx);
                    result
                },
                event_rx,
                |event| match event {
                    AggregateEvent::Trying { key, site_id } => {
                        pb.set_message(format!("[{}/{}] {}: {}", index + 1, total, key, site_id));
                    }
                    AggregateEvent::Skipped {
                        key,
                        site_id,
                        reason,
                    } => {
                        log::debug!("{}: {} skipped ({})", key, site_id, reason);
                    }
                    AggregateEvent::Started { .. }
                    | AggregateEvent::Filled { .. }
                    | AggregateEvent::Finished { .. } => {}
                },
            )
            .await;
            pb.finish_and_clear();

            if !json {
                print_outcome(movie, &aggregation);
            }
            run_log.record_aggregation(&report, movie, &aggregation);
            results.push(aggregation);
        }
        results
    });

    if json {
        let entries: Vec<MovieResult<'_>> = report
            .movies
            .iter()
            .zip(&results)
            .map(|(movie, aggregation)| MovieResult { movie, aggregation })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        log::info!("");
        print_leftovers(&report);
        print_summary(&run_log);
    }

    if !no_log {
        let log_path = log_path(&report.root)?;
        match run_log.write_to_file(&log_path) {
            Ok(()) if json => log::debug!("Run log: {}", log_path.display()),
            Ok(()) => {
                let note = format!("Run log: {}", log_path.display());
                log::info!("{}", note.if_supports_color(Stdout, |t| t.dimmed()));
            }
            Err(e) => log::warn!("Warning: could not write run log: {}", e),
        }
    }
    Ok(())
}

fn print_outcome(movie: &Movie, aggregation: &Aggregation) {
    let record = &aggregation.record;
    match &aggregation.outcome {
        Outcome::RequirementsMet => {
            let title = record.text(Field::Title).unwrap_or_default();
            log::info!(
                "  {} {} {}",
                "\u{2714}".if_supports_color(Stdout, |t| t.green()),
                movie.key().if_supports_color(Stdout, |t| t.bold()),
                title,
            );
        }
        Outcome::Exhausted { missing } => {
            let missing: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            log::warn!(
                "  {} {} missing: {}",
                "~".if_supports_color(Stdout, |t| t.yellow()),
                movie.key().if_supports_color(Stdout, |t| t.bold()),
                missing.join(", "),
            );
        }
    }
}

fn print_summary(run_log: &RunLog) {
    let summary = run_log.summary();
    log::info!("{}", "Summary:".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  {} {} fully resolved",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.total_resolved,
    );
    if summary.total_partial > 0 {
        log::warn!(
            "  {} {} partially resolved",
            "~".if_supports_color(Stdout, |t| t.yellow()),
            summary.total_partial,
        );
    }
    if summary.total_unidentified > 0 {
        log::warn!(
            "  {} {} unidentified",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            summary.total_unidentified,
        );
    }
    if summary.total_ambiguous > 0 {
        log::warn!(
            "  {} {} ambiguous",
            "!".if_supports_color(Stdout, |t| t.yellow()),
            summary.total_ambiguous,
        );
    }
}

/// `avscout-log-<dir>-<timestamp>.txt` beside the scanned directory, or inside
/// it when it has no parent.
fn log_path(root: &Path) -> Result<PathBuf, CliError> {
    let root = std::fs::canonicalize(root)?;
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());
    let file = format!(
        "avscout-log-{}-{}.txt",
        name,
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
    );
    Ok(root.parent().unwrap_or(&root).join(file))
}
