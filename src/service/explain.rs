use async_trait::async_trait;
use tracing::instrument;

use super::DotdexService;
use crate::{
    errors::{Result, UserFacingError},
    model::Command,
    storage::CommandFilter,
};

/// The result of explaining a command name
#[derive(Debug)]
pub enum Explanation {
    /// The name is on the index; all matching records are returned
    Indexed(Vec<Command>),
    /// The name is not indexed, but the external lookup had an answer
    External(String),
}

/// A pluggable capability to look up an explanation for a command name outside the index.
///
/// Invoked only after the index yields no match, never during indexing.
#[async_trait]
pub trait Explainer {
    /// Looks up an explanation for the given command name, `None` when the service has no entry for it
    async fn lookup(&self, name: &str) -> Result<Option<String>>;
}

/// An [`Explainer`] backed by the mankier.com explain API
#[derive(Default)]
pub struct MankierExplainer {
    client: reqwest::Client,
}

impl MankierExplainer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Explainer for MankierExplainer {
    #[instrument(skip_all)]
    async fn lookup(&self, name: &str) -> Result<Option<String>> {
        tracing::info!("Looking up '{name}' on mankier.com");
        let res = self
            .client
            .get("https://www.mankier.com/api/explain/")
            .query(&[("q", name)])
            .send()
            .await
            .map_err(|err| {
                tracing::error!("{err:?}");
                UserFacingError::ExplainRequestFailed(err.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            tracing::error!("Got response [{status}]");
            return Err(UserFacingError::ExplainRequestFailed(format!("received {status} response")).into());
        }

        let text = res.text().await.map_err(|err| {
            tracing::error!("Couldn't read api response: {err}");
            UserFacingError::ExplainRequestFailed(String::from("couldn't read api response"))
        })?;

        // The explain output carries a two-line footer pointing back at the website
        let text = strip_last_lines(&text, 2);
        Ok((!text.trim().is_empty()).then(|| text.to_string()))
    }
}

impl DotdexService {
    /// Explains a command: returns the indexed records for the name when there are any, and falls back to the external
    /// lookup capability otherwise.
    #[instrument(skip_all)]
    pub async fn explain_command(&self, name: &str, explainer: &dyn Explainer) -> Result<Explanation> {
        let commands = self
            .storage
            .get_commands(CommandFilter {
                name: Some(name.to_string()),
                include_hidden: true,
                ..Default::default()
            })
            .await?;
        if !commands.is_empty() {
            return Ok(Explanation::Indexed(commands));
        }

        tracing::debug!("'{name}' is not indexed, looking it up externally");
        match explainer.lookup(name).await? {
            Some(text) => Ok(Explanation::External(text)),
            None => Err(UserFacingError::ExplainNotFound(name.to_string()).into()),
        }
    }
}

/// Removes the last `n` lines from a string
fn strip_last_lines(text: &str, n: usize) -> &str {
    let mut end = text.trim_end().len();
    for _ in 0..n {
        match text[..end].rfind('\n') {
            Some(idx) => end = idx,
            None => return "",
        }
    }
    text[..end].trim_end()
}
