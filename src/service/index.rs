use std::{collections::BTreeMap, fs};

use chrono::Utc;
use rayon::prelude::*;
use tracing::instrument;

use super::{DotdexService, walker};
use crate::{
    config::IndexSettings,
    errors::Result,
    model::{Command, CommandKey, IndexReport, RawConstruct, RemovalPolicy},
    parser::parse_source,
    storage::{CommandFilter, IndexBatch},
};

impl DotdexService {
    /// Runs a full indexing pass: walks the configured globs, parses every file and reconciles the result against the
    /// persisted index.
    ///
    /// The store is only written at the end, in a single transaction, once the whole parsed set is assembled; a failure
    /// anywhere leaves the previously persisted state untouched. User customizations (hidden flag, custom description
    /// or category) survive the run.
    #[instrument(skip_all)]
    pub async fn index(&self) -> Result<IndexReport> {
        // Config problems must abort before the store is touched
        let settings = self.config.index_settings()?;

        // Discover the files to parse, deterministically
        let files = walker::collect_files(&settings.file_globs, settings.file_exclude.as_ref())?;
        tracing::info!("Indexing {} files", files.len());

        // Parse every file on a worker pool; no construct depends on any other file
        let name_ignore = settings.name_ignore.clone();
        let (constructs, mut report) = tokio::task::spawn_blocking(move || {
            let results: Vec<_> = files
                .par_iter()
                .map(|path| {
                    let source_path = path.to_string_lossy().into_owned();
                    match fs::read_to_string(path) {
                        Ok(content) => Some(parse_source(&source_path, &content, name_ignore.as_ref())),
                        Err(err) => {
                            tracing::warn!("Skipping unreadable file {source_path}: {err}");
                            None
                        }
                    }
                })
                .collect();

            let mut report = IndexReport::default();
            let mut constructs = Vec::new();
            for outcome in results {
                match outcome {
                    Some(outcome) => {
                        report.files_scanned += 1;
                        report.constructs_skipped += outcome.skipped;
                        constructs.extend(outcome.constructs);
                    }
                    None => report.files_skipped += 1,
                }
            }
            (constructs, report)
        })
        .await?;

        // Key the parsed set; when a file defines the same construct twice the later definition wins, matching how a
        // shell would evaluate it. The map also makes the merge order independent of parse completion order.
        let mut parsed: BTreeMap<CommandKey, RawConstruct> = BTreeMap::new();
        for construct in constructs {
            parsed.insert(construct.key(), construct);
        }

        // Diff against the full persisted set and apply the result atomically
        let existing = self.storage.get_commands(CommandFilter::everything()).await?;
        let batch = reconcile(existing, parsed, &settings, &mut report);
        if !batch.is_empty() {
            self.storage.apply_index_batch(batch).await?;
        }

        Ok(report)
    }
}

/// Merges the freshly parsed construct set against the previously persisted records.
///
/// New constructs are inserted with freshly resolved description and category; existing ones get their auto-derived
/// fields recomputed, but a field whose custom flag is set is never overwritten and the hidden flag is never
/// auto-changed. Disappeared constructs are deleted or tombstoned per the configured policy.
fn reconcile(
    existing: Vec<Command>,
    parsed: BTreeMap<CommandKey, RawConstruct>,
    settings: &IndexSettings,
    report: &mut IndexReport,
) -> IndexBatch {
    let mut existing: BTreeMap<CommandKey, Command> = existing.into_iter().map(|c| (c.key(), c)).collect();
    let mut batch = IndexBatch::default();

    for (key, construct) in parsed {
        let description = construct.resolve_description(settings.comment_placement);
        match existing.remove(&key) {
            // Present only on the parsed set: a newly discovered command
            None => {
                let category = settings.categories.classify(&construct, description.as_deref());
                batch
                    .inserts
                    .push(Command::from_construct(&construct, description, category));
                report.inserted += 1;
            }
            // Present on both: recompute the auto-derived fields, applying them only where no custom flag is set
            Some(mut command) => {
                let mut changed = false;
                if command.code != construct.code {
                    command.code = construct.code.clone();
                    changed = true;
                }
                if !command.description_is_custom && command.description != description {
                    command.description = description.clone();
                    changed = true;
                }
                if !command.category_is_custom {
                    let category = settings.categories.classify(&construct, description.as_deref());
                    if command.category != category {
                        command.category = category.to_string();
                        changed = true;
                    }
                }
                // A construct that reappears stops being orphaned
                if command.orphaned_at.is_some() {
                    command.orphaned_at = None;
                    changed = true;
                }
                if changed {
                    command.updated_at = Some(Utc::now());
                    batch.updates.push(command);
                    report.updated += 1;
                } else {
                    report.unchanged += 1;
                }
            }
        }
    }

    // Present only on the store: the construct disappeared
    for (_, mut command) in existing {
        match settings.on_removed {
            RemovalPolicy::Delete => {
                batch.deletes.push(command.id);
                report.removed += 1;
            }
            RemovalPolicy::Tombstone => {
                // Already-orphaned records stay as they are, keeping the run idempotent
                if command.orphaned_at.is_none() {
                    command.orphaned_at = Some(Utc::now());
                    command.updated_at = Some(Utc::now());
                    batch.updates.push(command);
                    report.removed += 1;
                }
            }
        }
    }

    batch
}
