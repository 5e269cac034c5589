//! Tracing subscriber initialization.
//!
//! Diagnostics go to stderr so stdout stays free for command output, or to a log file
//! when one is configured.

use std::path::Path;

use crate::{Error, Result};

/// Initialize the global tracing subscriber.
///
/// Respects RUST_LOG, defaulting to `default_level`. With `log_file` set, events are appended
/// to that file instead of stderr and its directory is created if needed.
pub fn init(default_level: &str, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = match log_file {
        Some(path) => {
            let directory = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(directory)?;
            let file_name = path
                .file_name()
                .ok_or_else(|| Error::Config(format!("Invalid log file path: {}", path.display())))?;
            let file_appender = tracing_appender::rolling::never(directory, file_name);

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(file_appender)
                .with_ansi(false)
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
    };

    result.map_err(|_| Error::Config("Tracing subscriber already initialized".to_string()))
}
