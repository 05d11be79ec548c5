//! avscout CLI
//!
//! Command-line interface for identifying video files and collecting their
//! catalog metadata.

mod cli_types;
mod commands;
mod error;

use std::io::Write;

use clap::Parser;
use log::LevelFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::cli_types::{Cli, Commands, ConfigAction};

/// Crates whose log output follows `-v`/`-q`. Everything else stays at warn.
const OWN_CRATES: &[&str] = &["avscout", "avscout_core", "avscout_lib", "avscout_scraper"];

fn main() {
    let cli = Cli::parse();
    init_logger(&cli);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Id { ref names } => commands::id::run_id(config, names),
        Commands::Scan { ref dir, json } => commands::scan::run_scan(config, dir, json),
        Commands::Mirrors {
            ref site,
            ref default,
        } => commands::mirrors::run_mirrors(config, site, default.as_deref()),
        Commands::Aggregate {
            ref dir,
            json,
            no_log,
        } => commands::aggregate::run_aggregate(config, dir, json, no_log),
        Commands::Config { ref action } => match action {
            ConfigAction::Path => commands::config::run_config_path(config),
            ConfigAction::Show => commands::config::run_config_show(config),
            ConfigAction::Init => commands::config::run_config_init(config),
        },
    };

    if let Err(e) = result {
        log::error!("{} {}", "\u{2718}".if_supports_color(Stdout, |t| t.red()), e);
        std::process::exit(1);
    }
}

/// Plain messages on stdout; `-v` adds timestamps and module paths. `RUST_LOG`
/// directives are applied last and win.
fn init_logger(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .target(env_logger::Target::Stdout)
        .filter_level(LevelFilter::Warn);
    for name in OWN_CRATES {
        builder.filter_module(name, level);
    }

    if cli.verbose {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    }

    builder.parse_default_env();
    builder.init();
}
