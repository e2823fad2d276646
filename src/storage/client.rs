use std::{path::PathBuf, thread};

use crossbeam_channel::{Sender, bounded, unbounded};
use rusqlite::Connection;
use tokio::sync::oneshot;

/// A single sqlite connection living on a dedicated thread, usable from async contexts.
///
/// rusqlite connections are synchronous; every call is shipped to the connection thread through a channel and awaited
/// on a oneshot, so the async runtime is never blocked on database work.
pub struct SqliteClient {
    tx: Sender<Task>,
}

enum Task {
    Run(Box<dyn FnOnce(&mut Connection) + Send>),
    Shutdown(Box<dyn FnOnce(Result<(), ClientError>) + Send>),
}

impl SqliteClient {
    /// Opens a connection to the database at the given path, or an in-memory one when `None`
    pub async fn open(path: Option<PathBuf>) -> Result<Self, ClientError> {
        let path = path.unwrap_or_else(|| ":memory:".into());
        let (open_tx, open_rx) = oneshot::channel();

        thread::spawn(move || {
            let (tx, rx) = unbounded();

            let mut conn = match Connection::open(path) {
                Ok(conn) => conn,
                Err(err) => {
                    if open_tx.send(Err(ClientError::from(err))).is_err() {
                        tracing::error!("Error sending sqlite connection error");
                    }
                    return;
                }
            };

            if open_tx.send(Ok(Self { tx })).is_err() {
                tracing::error!("Error sending sqlite connection");
                return;
            }

            while let Ok(task) = rx.recv() {
                match task {
                    Task::Run(func) => func(&mut conn),
                    Task::Shutdown(func) => match conn.close() {
                        Ok(()) => {
                            func(Ok(()));
                            return;
                        }
                        Err((c, e)) => {
                            conn = c;
                            func(Err(e.into()));
                        }
                    },
                }
            }
        });

        open_rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Invokes the provided function on the connection thread and awaits its result
    pub async fn call<F, T, E>(&self, func: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<ClientError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Task::Run(Box::new(move |conn| {
                if tx.send(func(conn)).is_err() {
                    tracing::error!("Error sending sqlite response");
                }
            })))
            .map_err(|_| ClientError::Closed)?;
        rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Closes the underlying sqlite connection, blocking the current thread until complete
    pub fn close_blocking(&self) -> Result<(), ClientError> {
        let (tx, rx) = bounded(1);
        let func = Box::new(move |res| _ = tx.send(res));
        if self.tx.send(Task::Shutdown(func)).is_err() {
            return Ok(());
        }
        // If receiving fails, the connection is already closed
        rx.recv().unwrap_or(Ok(()))
    }
}

impl Drop for SqliteClient {
    fn drop(&mut self) {
        if let Err(err) = self.close_blocking() {
            tracing::error!("Error closing sqlite client: {err:?}");
        }
    }
}

/// Errors from the connection thread
#[derive(Debug)]
pub enum ClientError {
    /// The connection to the sqlite database is closed
    Closed,
    /// An error from the database itself
    Rusqlite(rusqlite::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Closed => write!(f, "connection to sqlite database closed"),
            ClientError::Rusqlite(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Rusqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ClientError {
    fn from(value: rusqlite::Error) -> Self {
        ClientError::Rusqlite(value)
    }
}
