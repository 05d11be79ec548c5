use std::path::{Path, PathBuf};

use avscout_lib::Scanner;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::commands::load_settings;
use crate::error::CliError;

/// Print the identity each name resolves to.
pub(crate) fn run_id(config: Option<&Path>, names: &[PathBuf]) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let scanner = Scanner::new(&settings.scanner)?;
    let parser = scanner.parser();

    let mut unresolved = 0usize;
    for name in names {
        let Some(identity) = parser.identify(name) else {
            unresolved += 1;
            log::warn!(
                "{} {}: no identity found",
                "?".if_supports_color(Stdout, |t| t.yellow()),
                name.display(),
            );
            continue;
        };

        log::info!(
            "{} {} {}",
            name.display(),
            "->".if_supports_color(Stdout, |t| t.dimmed()),
            identity.key().if_supports_color(Stdout, |t| t.bold()),
        );
        log::info!(
            "    classification: {}",
            identity.classification().if_supports_color(Stdout, |t| t.cyan()),
        );
        if let Some(primary) = identity.primary_id() {
            log::info!("    primary id:     {}", primary);
        }
        if let Some(content) = identity.content_id() {
            log::info!("    content id:     {}", content);
        }
        if avscout_core::is_uncensored(&identity) {
            log::info!("    {}", "uncensored".if_supports_color(Stdout, |t| t.dimmed()));
        }
    }

    if unresolved > 0 {
        log::debug!("{} of {} name(s) unresolved", unresolved, names.len());
    }
    Ok(())
}
