pub(crate) mod aggregate;
pub(crate) mod config;
pub(crate) mod id;
pub(crate) mod mirrors;
pub(crate) mod scan;

use std::path::Path;

use avscout_lib::Settings;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use crate::error::CliError;

/// Load settings, logging where they came from.
pub(crate) fn load_settings(config: Option<&Path>) -> Result<Settings, CliError> {
    let path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(avscout_lib::settings_path);
    log::debug!("Loading settings from {}", path.display());
    Ok(Settings::load(Some(&path))?)
}

/// Spinner for a long-running phase. Hidden when normal output is suppressed.
pub(crate) fn spinner(msg: impl Into<String>) -> ProgressBar {
    if log::max_level() < LevelFilter::Info {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("/-\\|"));
    }
    pb.set_message(msg.into());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Multi-threaded runtime for commands that touch the network.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))
}
