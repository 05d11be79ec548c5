use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::commands::load_settings;
use crate::error::CliError;

fn resolve_path(config: Option<&Path>) -> PathBuf {
    config
        .map(Path::to_path_buf)
        .unwrap_or_else(avscout_lib::settings_path)
}

/// Print the settings file path.
pub(crate) fn run_config_path(config: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_path(config);
    let status = if path.exists() { "(exists)" } else { "(not found)" };
    log::info!(
        "{} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        status.if_supports_color(Stdout, |t| t.dimmed()),
    );
    Ok(())
}

/// Print the effective settings: the file merged over the defaults.
pub(crate) fn run_config_show(config: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_path(config);
    let settings = load_settings(config)?;

    log::info!(
        "{} {}",
        "# Effective settings for".if_supports_color(Stdout, |t| t.dimmed()),
        path.display().if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!("{}", settings.to_toml_string()?.trim_end());
    Ok(())
}

/// Write the commented default settings file.
pub(crate) fn run_config_init(config: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_path(config);
    avscout_lib::Settings::write_default(&path)?;
    log::info!(
        "{} Wrote {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!(
        "  Add [connectors.<id>] sections and list their ids under [sources] \
         to start collecting metadata."
    );
    Ok(())
}
