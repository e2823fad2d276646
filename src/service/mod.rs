use crate::{config::Config, storage::SqliteStorage};

mod command;
mod explain;
mod index;
mod walker;

pub use explain::{Explainer, Explanation, MankierExplainer};
pub use walker::collect_files;

/// Service exposing every dotdex operation over the parsed files and the persisted index
#[derive(Clone)]
pub struct DotdexService {
    storage: SqliteStorage,
    config: Config,
}

impl DotdexService {
    /// Creates a new instance of `DotdexService`
    pub fn new(storage: SqliteStorage, config: Config) -> Self {
        Self { storage, config }
    }
}
