use std::path::Path;

use avscout_scraper::RunContext;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::commands::{load_settings, runtime, spinner};
use crate::error::CliError;

/// Resolve `site` the way a connector would at the start of a run.
///
/// Without `--default`, the site's `[connectors.<site>]` URL is used.
pub(crate) fn run_mirrors(
    config: Option<&Path>,
    site: &str,
    default: Option<&str>,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let default_url = match default {
        Some(url) => url.to_string(),
        None => settings
            .connectors
            .get(site)
            .map(|c| c.url.clone())
            .ok_or_else(|| {
                CliError::config(format!(
                    "no [connectors.{}] section; pass --default <URL>",
                    site
                ))
            })?,
    };

    match settings.network.mirrors.get(site) {
        Some(mirrors) => {
            if let Some(preferred) = &mirrors.preferred {
                log::info!("  preferred: {}", preferred);
            }
            for candidate in &mirrors.candidates {
                log::info!("  candidate: {}", candidate);
            }
        }
        None => {
            let note = format!("  no mirrors configured for '{}'", site);
            log::info!("{}", note.if_supports_color(Stdout, |t| t.dimmed()));
        }
    }

    let ctx = RunContext::new(&settings.network)?;
    let rt = runtime()?;
    let resolved = rt.block_on(async {
        let pb = spinner(format!("Probing mirrors for {}...", site));
        let url = ctx.resolver().resolve(site, &default_url).await;
        pb.finish_and_clear();
        url
    });

    if resolved == default_url {
        log::info!(
            "{} {} -> {} {}",
            "~".if_supports_color(Stdout, |t| t.yellow()),
            site,
            resolved.if_supports_color(Stdout, |t| t.cyan()),
            "(default)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    } else {
        log::info!(
            "{} {} -> {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            site,
            resolved.if_supports_color(Stdout, |t| t.cyan()),
        );
    }
    Ok(())
}
