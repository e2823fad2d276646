use std::{path::Path, sync::Arc};

use client::SqliteClient;
use color_eyre::eyre::Context;
use migrations::MIGRATIONS;
use regex::Regex;
use rusqlite::functions::FunctionFlags;

use crate::errors::Result;

mod client;
mod command;
mod migrations;

pub use client::ClientError;
pub use command::{CommandFilter, IndexBatch};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// `SqliteStorage` provides an interface for interacting with a SQLite database to store and retrieve the indexed
/// [`Command`](crate::model::Command) records
#[derive(Clone)]
pub struct SqliteStorage {
    /// The SQLite client used for database operations
    client: Arc<SqliteClient>,
}

impl SqliteStorage {
    /// Creates a new instance of [`SqliteStorage`] using a persistent database file.
    ///
    /// If the DOTDEX_STORAGE environment variable is set, it will use the specified path for the database file.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let db_path = if let Some(path) = std::env::var_os("DOTDEX_STORAGE") {
            tracing::info!("Using DOTDEX_STORAGE path: {}", path.to_string_lossy());
            path.into()
        } else {
            let db_path = data_dir.as_ref().join("storage.db3");
            tracing::info!("Using default storage path: {}", db_path.display());
            db_path
        };
        Ok(Self {
            client: Arc::new(Self::open_client(Some(db_path)).await?),
        })
    }

    /// Creates a new in-memory instance of [`SqliteStorage`].
    ///
    /// This is primarily intended for testing purposes, where a persistent database is not required.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self> {
        Ok(Self {
            client: Arc::new(Self::open_client(None).await?),
        })
    }

    /// Opens and initializes an SQLite client.
    ///
    /// This internal helper function configures the client with necessary PRAGMA settings for optimal performance and
    /// data integrity (WAL mode, normal sync) and applies all pending database migrations.
    async fn open_client(path: Option<std::path::PathBuf>) -> Result<SqliteClient> {
        // Build the client
        let client = SqliteClient::open(path)
            .await
            .wrap_err("Error initializing SQLite client")?;

        // Use Write-Ahead Logging (WAL) mode for better concurrency and performance.
        client
            .call(|conn| -> Result<()> {
                Ok(conn
                    .pragma_update(None, "journal_mode", "wal")
                    .wrap_err("Error applying journal mode pragma")?)
            })
            .await?;

        // Set synchronous mode to NORMAL. This means SQLite will still sync at critical moments, but less frequently
        // than FULL, offering a good balance between safety and performance.
        client
            .call(|conn| -> Result<()> {
                Ok(conn
                    .pragma_update(None, "synchronous", "normal")
                    .wrap_err("Error applying synchronous pragma")?)
            })
            .await?;

        // Apply all defined database migrations to bring the schema to the latest version.
        // This is done atomically within a transaction.
        client
            .call(|conn| -> Result<()> { Ok(MIGRATIONS.to_latest(conn).wrap_err("Error applying migrations")?) })
            .await?;

        // Add a regexp function, backing the search queries
        client
            .call(|conn| -> Result<()> {
                Ok(conn
                    .create_scalar_function(
                        "regexp",
                        2,
                        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
                        |ctx| {
                            assert_eq!(ctx.len(), 2, "regexp() called with unexpected number of arguments");

                            let text = ctx
                                .get_raw(1)
                                .as_str_or_null()
                                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;

                            let Some(text) = text else {
                                return Ok(false);
                            };

                            let cached_re: Arc<Regex> =
                                ctx.get_or_create_aux(0, |vr| Ok::<_, BoxError>(Regex::new(vr.as_str()?)?))?;

                            Ok(cached_re.is_match(text))
                        },
                    )
                    .wrap_err("Error adding regexp function")?)
            })
            .await?;

        Ok(client)
    }
}
