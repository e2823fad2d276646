use std::{fs, path::PathBuf};

use color_eyre::eyre::{Context, ContextCompat};
use directories::ProjectDirs;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::{
    errors::{AppError, UserFacingError},
    model::{Category, CategorySet, CommentPlacement, DEFAULT_UNCATEGORIZED_NAME, RemovalPolicy},
};

/// Main configuration struct for the application
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct Config {
    /// Directory where the data must be stored
    pub data_dir: PathBuf,
    /// Whether user-supplied regexes (categories, ignore, exclude) match case-sensitively
    pub case_sensitive: bool,
    /// Which comment wins as the description of a construct
    pub comment_placement: CommentPlacement,
    /// Constructs whose name matches this regex are never indexed
    pub command_name_ignore_regex: String,
    /// Files matching this regex are dropped after glob expansion
    pub file_exclude_regex: String,
    /// Glob patterns locating the files to index
    pub file_globs: Vec<String>,
    /// Name given to commands matching no category
    pub uncategorized_name: String,
    /// What to do with commands whose construct disappeared from the files
    pub on_removed: RemovalPolicy,
    /// Categories to classify commands with, evaluated in order
    pub categories: Vec<CategoryConfig>,
    /// Configuration settings for application logging
    pub logs: LogsConfig,
}

/// A single user-defined category
#[derive(Clone, Default, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[serde(default)]
pub struct CategoryConfig {
    /// Display name of the category
    pub name: String,
    /// Free-form description of what belongs here
    pub description: String,
    /// Matches against the command name
    pub name_regex: String,
    /// Matches against the command code
    pub code_regex: String,
    /// Matches against the resolved description
    pub comment_regex: String,
    /// Matches against the source file path
    pub path_regex: String,
}

/// Configuration settings for application logging
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct LogsConfig {
    /// Whether application logging is enabled
    pub enabled: bool,
    /// The log filter to apply, controlling which logs are recorded.
    ///
    /// This string supports the `tracing-subscriber`'s environment filter syntax.
    pub filter: String,
}

/// The validated, compiled settings an indexing run needs.
///
/// Built from the raw [`Config`] before any store access, so a bad regex or an empty glob list aborts the run leaving
/// prior state intact.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    /// Glob patterns locating the files to index
    pub file_globs: Vec<String>,
    /// Files matching this are dropped after glob expansion
    pub file_exclude: Option<Regex>,
    /// Constructs whose name matches this are dropped
    pub name_ignore: Option<Regex>,
    /// Which comment wins as the description
    pub comment_placement: CommentPlacement,
    /// Compiled category predicates, in configuration order
    pub categories: CategorySet,
    /// What to do with disappeared commands
    pub on_removed: RemovalPolicy,
}

impl Config {
    /// Initializes the application configuration.
    ///
    /// Attempts to load the configuration from the user's config directory (`config.toml`). If the file does not exist
    /// or has missing fields, it falls back to default values.
    pub fn init(config_file: Option<PathBuf>) -> color_eyre::Result<Self> {
        // Initialize directories
        let proj_dirs = ProjectDirs::from("org", "Dotdex", "Dotdex").wrap_err("Couldn't initialize project directory")?;
        let config_dir = proj_dirs.config_dir().to_path_buf();

        // Initialize the config
        let config_path = config_file.unwrap_or_else(|| config_dir.join("config.toml"));
        let mut config = if config_path.exists() {
            // Read from the config file, if found
            let config_str = fs::read_to_string(&config_path)
                .wrap_err_with(|| format!("Couldn't read config file {}", config_path.display()))?;
            toml::from_str(&config_str)
                .wrap_err_with(|| format!("Couldn't parse config file {}", config_path.display()))?
        } else {
            // Use default values if not found
            Config::default()
        };
        // If no data dir is provided, use the default
        if config.data_dir.as_os_str().is_empty() {
            config.data_dir = proj_dirs.data_dir().to_path_buf();
        }

        // Create the data directory if not found
        fs::create_dir_all(&config.data_dir)
            .wrap_err_with(|| format!("Couldn't create data dir {}", config.data_dir.display()))?;

        Ok(config)
    }

    /// The path of the config file that [`Config::init`] reads, when no explicit path is given
    pub fn default_path() -> color_eyre::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "Dotdex", "Dotdex").wrap_err("Couldn't initialize project directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Compiles the raw configuration into the settings an indexing run needs.
    ///
    /// Fails with a user-facing error when a regex doesn't compile or the glob list is empty.
    pub fn index_settings(&self) -> Result<IndexSettings, AppError> {
        if self.file_globs.is_empty() {
            return Err(UserFacingError::EmptyFileGlobs.into());
        }

        let file_exclude = self.compile_regex("file_exclude_regex", &self.file_exclude_regex)?;
        let name_ignore = self.compile_regex("command_name_ignore_regex", &self.command_name_ignore_regex)?;

        let mut categories = Vec::with_capacity(self.categories.len());
        for (i, category) in self.categories.iter().enumerate() {
            let field = |suffix: &str| format!("categories[{i}].{suffix}");
            categories.push(Category {
                name: category.name.clone(),
                description: category.description.clone(),
                name_regex: self.compile_regex(&field("name_regex"), &category.name_regex)?,
                code_regex: self.compile_regex(&field("code_regex"), &category.code_regex)?,
                comment_regex: self.compile_regex(&field("comment_regex"), &category.comment_regex)?,
                path_regex: self.compile_regex(&field("path_regex"), &category.path_regex)?,
            });
        }

        Ok(IndexSettings {
            file_globs: self.file_globs.clone(),
            file_exclude,
            name_ignore,
            comment_placement: self.comment_placement,
            categories: CategorySet::new(categories, self.uncategorized_name.clone()),
            on_removed: self.on_removed,
        })
    }

    /// Compiles an optional regex from the config, honoring the case sensitivity flag.
    ///
    /// An empty pattern means the field is not configured.
    fn compile_regex(&self, field: &str, pattern: &str) -> Result<Option<Regex>, AppError> {
        if pattern.is_empty() {
            return Ok(None);
        }
        RegexBuilder::new(pattern)
            .case_insensitive(!self.case_sensitive)
            .build()
            .map(Some)
            .map_err(|err| {
                UserFacingError::ConfigInvalidRegex {
                    field: field.to_string(),
                    error: err.to_string(),
                }
                .into()
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            case_sensitive: false,
            comment_placement: CommentPlacement::default(),
            command_name_ignore_regex: String::new(),
            file_exclude_regex: String::new(),
            file_globs: Vec::new(),
            uncategorized_name: String::from(DEFAULT_UNCATEGORIZED_NAME),
            on_removed: RemovalPolicy::default(),
            categories: Vec::new(),
            logs: LogsConfig::default(),
        }
    }
}
impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filter: String::from("info"),
        }
    }
}
