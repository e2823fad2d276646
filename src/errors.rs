use std::{fmt, panic};

use color_eyre::{Report, config::HookBuilder};

/// Result alias used across the crate
pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Initializes error and panic handling.
///
/// Errors are reported with a span trace when logging is enabled, and panics point the user at the log file (or at how
/// to enable logging) so they can be reported.
pub fn init(log_path: Option<std::path::PathBuf>) -> color_eyre::Result<()> {
    let panic_section = if let Some(log_path) = log_path {
        format!(
            "This is a bug. Consider reporting it at {}\nLogs can be found at {}",
            env!("CARGO_PKG_REPOSITORY"),
            log_path.display()
        )
    } else {
        format!(
            "This is a bug. Consider reporting it at {}\nLogs were not generated, consider enabling them on the \
             config or running with DOTDEX_LOG=debug.",
            env!("CARGO_PKG_REPOSITORY")
        )
    };
    let (panic_hook, eyre_hook) = HookBuilder::default()
        .panic_section(panic_section)
        .display_env_section(false)
        .display_location_section(true)
        .capture_span_trace_by_default(true)
        .into_hooks();

    eyre_hook.install()?;
    panic::set_hook(Box::new(move |panic_info| {
        let panic_report = panic_hook.panic_report(panic_info).to_string();
        tracing::error!("Panic: {panic_report}");
        eprintln!("{panic_report}");
    }));

    Ok(())
}

/// Error type for every fallible operation on the crate.
///
/// User-facing errors carry a clean, actionable message and exit without a report; anything else bubbles up as an
/// unexpected [`Report`] with full context.
#[derive(Debug)]
pub enum AppError {
    /// An error the user can act upon
    UserFacing(UserFacingError),
    /// An unexpected error
    Unexpected(Report),
}

impl AppError {
    /// Converts this error into a [`Report`], to be displayed with the eyre hooks
    pub fn into_report(self) -> Report {
        match self {
            AppError::UserFacing(err) => Report::msg(err.to_string()),
            AppError::Unexpected(report) => report,
        }
    }
}

/// Errors with a message meant to be read by the user, not reported as bugs
#[derive(Debug, PartialEq, Eq)]
pub enum UserFacingError {
    /// The configuration contains no file globs to index
    EmptyFileGlobs,
    /// A regex from the configuration failed to compile
    ConfigInvalidRegex {
        /// The configuration field holding the regex
        field: String,
        /// The compile error
        error: String,
    },
    /// A glob from the configuration failed to compile
    ConfigInvalidGlob {
        /// The offending glob pattern
        glob: String,
        /// The compile error
        error: String,
    },
    /// The provided search pattern is not a valid regex
    InvalidSearchRegex(String),
    /// No indexed command matches the given name
    CommandNotFound(String),
    /// More than one indexed command matches and the operation needs a single one
    CommandAmbiguous(String, usize),
    /// The external explanation service has no entry for the command
    ExplainNotFound(String),
    /// The request to the external explanation service failed
    ExplainRequestFailed(String),
}

impl fmt::Display for UserFacingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserFacingError::EmptyFileGlobs => {
                write!(f, "No file globs are configured, add some under `file_globs` to index")
            }
            UserFacingError::ConfigInvalidRegex { field, error } => {
                write!(f, "Invalid regex on config field `{field}`: {error}")
            }
            UserFacingError::ConfigInvalidGlob { glob, error } => {
                write!(f, "Invalid glob on `file_globs`: {glob}: {error}")
            }
            UserFacingError::InvalidSearchRegex(err) => write!(f, "Invalid search regex: {err}"),
            UserFacingError::CommandNotFound(name) => write!(f, "No indexed command found with name '{name}'"),
            UserFacingError::CommandAmbiguous(name, matches) => write!(
                f,
                "{matches} indexed commands match '{name}', narrow it down with --kind or --file"
            ),
            UserFacingError::ExplainNotFound(name) => write!(f, "No explanation found for '{name}'"),
            UserFacingError::ExplainRequestFailed(err) => write!(f, "Couldn't reach the explanation service: {err}"),
        }
    }
}

impl From<UserFacingError> for AppError {
    fn from(err: UserFacingError) -> Self {
        AppError::UserFacing(err)
    }
}

impl From<Report> for AppError {
    fn from(err: Report) -> Self {
        AppError::Unexpected(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Unexpected(err.into())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Unexpected(err.into())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Unexpected(err.into())
    }
}

impl From<crate::storage::ClientError> for AppError {
    fn from(err: crate::storage::ClientError) -> Self {
        AppError::Unexpected(err.into())
    }
}
