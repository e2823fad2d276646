use std::{env, fs::File, path::PathBuf};

use color_eyre::{Result, eyre::Context};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

/// Initializes the tracing subscriber to output logs to a file under the data dir.
///
/// Logging is active when enabled on the config or when the `DOTDEX_LOG` environment variable is set, the latter also
/// overriding the configured filter. Returns the log file path when logging is active, `None` otherwise.
pub fn init(config: &Config) -> Result<Option<PathBuf>> {
    let env_filter = env::var("DOTDEX_LOG").ok();
    if !config.logs.enabled && env_filter.is_none() {
        return Ok(None);
    }
    let filter = env_filter.unwrap_or_else(|| config.logs.filter.clone());
    let logs_path = config.data_dir.join("dotdex.log");

    // Create the log file under the data dir
    let log_file =
        File::create(&logs_path).wrap_err_with(|| format!("Couldn't create the log file: {}", logs_path.display()))?;

    // Initialize the env filter
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .parse(filter)
        .wrap_err("Couldn't parse the log filter")?;

    // Subscribe logs to the file
    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);
    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();

    Ok(Some(logs_path))
}
