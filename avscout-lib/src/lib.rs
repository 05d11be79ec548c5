//! Filesystem side of avscout: directory scanning and user settings.

pub mod async_util;
pub mod error;
pub mod scanner;
pub mod settings;

pub use error::{ScanError, SettingsError};
pub use scanner::{AmbiguityReason, AmbiguousGroup, ScanOptions, ScanReport, Scanner};
pub use settings::{
    ConnectorSettings, MirrorSettings, NetworkSettings, ScannerSettings, Settings,
    SourceSettings, settings_path,
};
