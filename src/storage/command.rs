use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, types::Type};
use tracing::instrument;
use uuid::Uuid;

use super::SqliteStorage;
use crate::{
    errors::Result,
    model::{Command, CommandKind},
};

/// Filter for querying indexed commands.
///
/// Every field is optional; unset fields don't constrain the query. Hidden and orphaned records are excluded unless
/// explicitly requested.
#[derive(Debug, Default, Clone)]
pub struct CommandFilter {
    /// Exact command name
    pub name: Option<String>,
    /// Construct kind
    pub kind: Option<CommandKind>,
    /// Assigned category
    pub category: Option<String>,
    /// Source file the construct lives in
    pub source_path: Option<String>,
    /// Regex over the command name
    pub name_regex: Option<String>,
    /// Regex over the command code
    pub code_regex: Option<String>,
    /// Whether to include hidden commands
    pub include_hidden: bool,
    /// Whether to return hidden commands only
    pub only_hidden: bool,
    /// Whether to include orphaned (tombstoned) commands
    pub include_orphaned: bool,
}

impl CommandFilter {
    /// A filter returning every record on the store, as the reconciler needs
    pub fn everything() -> Self {
        Self {
            include_hidden: true,
            include_orphaned: true,
            ..Default::default()
        }
    }
}

/// The diff computed by a reconciliation run, applied to the store as a single transaction
#[derive(Debug, Default)]
pub struct IndexBatch {
    /// Newly discovered commands
    pub inserts: Vec<Command>,
    /// Existing commands with recomputed fields, written in full by id
    pub updates: Vec<Command>,
    /// Commands to remove from the store
    pub deletes: Vec<Uuid>,
}

impl IndexBatch {
    /// Whether the batch contains no changes at all
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

const COMMAND_COLUMNS: &str = "id, name, kind, source_path, code, description, category, hidden, \
                               description_is_custom, category_is_custom, orphaned_at, created_at, updated_at";

impl SqliteStorage {
    /// Retrieves the commands matching the given filter, ordered by category, name and source path
    #[instrument(skip_all)]
    pub async fn get_commands(&self, filter: CommandFilter) -> Result<Vec<Command>> {
        let mut query = format!("SELECT {COMMAND_COLUMNS} FROM command WHERE 1=1");
        let mut params: Vec<String> = Vec::new();

        if let Some(name) = filter.name {
            params.push(name);
            query.push_str(&format!(" AND name = ?{}", params.len()));
        }
        if let Some(kind) = filter.kind {
            params.push(kind.to_string());
            query.push_str(&format!(" AND kind = ?{}", params.len()));
        }
        if let Some(category) = filter.category {
            params.push(category);
            query.push_str(&format!(" AND category = ?{}", params.len()));
        }
        if let Some(source_path) = filter.source_path {
            params.push(source_path);
            query.push_str(&format!(" AND source_path = ?{}", params.len()));
        }
        if let Some(name_regex) = filter.name_regex {
            params.push(name_regex);
            query.push_str(&format!(" AND name REGEXP ?{}", params.len()));
        }
        if let Some(code_regex) = filter.code_regex {
            params.push(code_regex);
            query.push_str(&format!(" AND code REGEXP ?{}", params.len()));
        }
        if filter.only_hidden {
            query.push_str(" AND hidden = 1");
        } else if !filter.include_hidden {
            query.push_str(" AND hidden = 0");
        }
        if !filter.include_orphaned {
            query.push_str(" AND orphaned_at IS NULL");
        }
        query.push_str(" ORDER BY category, name, source_path");

        tracing::trace!("Querying commands:\n{query}");
        self.client
            .call(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(params), command_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Applies a full reconciliation batch atomically.
    ///
    /// Either every insert, update and delete lands or none does; a failure mid-batch leaves the store untouched.
    #[instrument(skip_all)]
    pub async fn apply_index_batch(&self, batch: IndexBatch) -> Result<()> {
        tracing::trace!(
            "Applying index batch: {} inserts, {} updates, {} deletes",
            batch.inserts.len(),
            batch.updates.len(),
            batch.deletes.len()
        );
        self.client
            .call(move |conn| {
                let tx = conn.transaction()?;
                for command in &batch.inserts {
                    insert_command(&tx, command)?;
                }
                for command in &batch.updates {
                    update_command(&tx, command)?;
                }
                for id in &batch.deletes {
                    tx.execute("DELETE FROM command WHERE id = ?1", (id,))?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// Writes the mutable fields of an existing command by id
    #[instrument(skip_all)]
    pub async fn update_command(&self, command: Command) -> Result<Command> {
        self.client
            .call(move |conn| {
                update_command(conn, &command)?;
                Ok(command)
            })
            .await
    }

    /// Sets the hidden flag of the given commands, returning the number of affected rows
    #[instrument(skip_all)]
    pub async fn set_hidden(&self, ids: Vec<Uuid>, hidden: bool) -> Result<u64> {
        let updated_at = Utc::now();
        self.client
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut affected = 0;
                for id in &ids {
                    affected += tx.execute(
                        "UPDATE command SET hidden = ?1, updated_at = ?2 WHERE id = ?3",
                        (hidden, updated_at, id),
                    )?;
                }
                tx.commit()?;
                Ok(affected as u64)
            })
            .await
    }
}

fn insert_command(conn: &Connection, command: &Command) -> rusqlite::Result<usize> {
    conn.execute(
        r#"INSERT INTO command (
            id,
            name,
            kind,
            source_path,
            code,
            description,
            category,
            hidden,
            description_is_custom,
            category_is_custom,
            orphaned_at,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
        (
            &command.id,
            &command.name,
            command.kind.to_string(),
            &command.source_path,
            &command.code,
            &command.description,
            &command.category,
            command.hidden,
            command.description_is_custom,
            command.category_is_custom,
            command.orphaned_at,
            command.created_at,
            command.updated_at,
        ),
    )
}

fn update_command(conn: &Connection, command: &Command) -> rusqlite::Result<usize> {
    // Identity fields (name, kind, source_path) never change for the same record
    conn.execute(
        r#"UPDATE command SET
            code = ?1,
            description = ?2,
            category = ?3,
            hidden = ?4,
            description_is_custom = ?5,
            category_is_custom = ?6,
            orphaned_at = ?7,
            updated_at = ?8
        WHERE id = ?9"#,
        (
            &command.code,
            &command.description,
            &command.category,
            command.hidden,
            command.description_is_custom,
            command.category_is_custom,
            command.orphaned_at,
            command.updated_at,
            &command.id,
        ),
    )
}

/// Maps a database row into a [`Command`]
fn command_from_row(row: &Row<'_>) -> rusqlite::Result<Command> {
    let kind: String = row.get(2)?;
    let kind = kind
        .parse::<CommandKind>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    Ok(Command {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        source_path: row.get(3)?,
        code: row.get(4)?,
        description: row.get(5)?,
        category: row.get(6)?,
        hidden: row.get(7)?,
        description_is_custom: row.get(8)?,
        category_is_custom: row.get(9)?,
        orphaned_at: row.get::<_, Option<DateTime<Utc>>>(10)?,
        created_at: row.get(11)?,
        updated_at: row.get::<_, Option<DateTime<Utc>>>(12)?,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{CommandKind, RawConstruct};

    fn test_command(name: &str, kind: CommandKind, path: &str) -> Command {
        let construct = RawConstruct {
            kind,
            name: name.into(),
            code: format!("{name} code"),
            source_path: path.into(),
            line_number: 1,
            comment_above: None,
            comment_inline: None,
        };
        Command::from_construct(&construct, Some(format!("{name} description")), "uncategorized")
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let command = test_command("ll", CommandKind::Alias, "/home/user/.aliases");

        storage
            .apply_index_batch(IndexBatch {
                inserts: vec![command.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        let commands = storage.get_commands(CommandFilter::default()).await.unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "ll");
        assert_eq!(commands[0].kind, CommandKind::Alias);
        assert_eq!(commands[0].code, "ll code");
        assert_eq!(commands[0].description.as_deref(), Some("ll description"));
        assert_eq!(commands[0].id, command.id);
    }

    #[tokio::test]
    async fn test_batch_is_atomic() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let existing = test_command("ll", CommandKind::Alias, "/home/user/.aliases");
        storage
            .apply_index_batch(IndexBatch {
                inserts: vec![existing.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        // A batch with a duplicate identity violates the unique constraint and must leave the store untouched
        let valid = test_command("new", CommandKind::Alias, "/home/user/.aliases");
        let duplicate = test_command("ll", CommandKind::Alias, "/home/user/.aliases");
        let res = storage
            .apply_index_batch(IndexBatch {
                inserts: vec![valid, duplicate],
                ..Default::default()
            })
            .await;
        assert!(res.is_err());

        let commands = storage.get_commands(CommandFilter::everything()).await.unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].id, existing.id);
    }

    #[tokio::test]
    async fn test_filter_hidden_and_orphaned() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let visible = test_command("visible", CommandKind::Alias, "/f");
        let mut hidden = test_command("hidden", CommandKind::Alias, "/f");
        hidden.hidden = true;
        let mut orphaned = test_command("orphaned", CommandKind::Alias, "/f");
        orphaned.orphaned_at = Some(Utc::now());

        storage
            .apply_index_batch(IndexBatch {
                inserts: vec![visible, hidden, orphaned],
                ..Default::default()
            })
            .await
            .unwrap();

        let default = storage.get_commands(CommandFilter::default()).await.unwrap();
        assert_eq!(default.len(), 1);
        assert_eq!(default[0].name, "visible");

        let everything = storage.get_commands(CommandFilter::everything()).await.unwrap();
        assert_eq!(everything.len(), 3);

        let only_hidden = storage
            .get_commands(CommandFilter {
                only_hidden: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_hidden.len(), 1);
        assert_eq!(only_hidden[0].name, "hidden");
    }

    #[tokio::test]
    async fn test_filter_by_regex() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let mut curl = test_command("get_weather", CommandKind::Function, "/f");
        curl.code = String::from("curl wttr.in");
        let other = test_command("deploy", CommandKind::Function, "/f");

        storage
            .apply_index_batch(IndexBatch {
                inserts: vec![curl, other],
                ..Default::default()
            })
            .await
            .unwrap();

        let by_name = storage
            .get_commands(CommandFilter {
                name_regex: Some(String::from("^get_")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "get_weather");

        let by_code = storage
            .get_commands(CommandFilter {
                code_regex: Some(String::from("curl")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].name, "get_weather");
    }

    #[tokio::test]
    async fn test_set_hidden() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let command = test_command("ll", CommandKind::Alias, "/f");
        let id = command.id;
        storage
            .apply_index_batch(IndexBatch {
                inserts: vec![command],
                ..Default::default()
            })
            .await
            .unwrap();

        let affected = storage.set_hidden(vec![id], true).await.unwrap();
        assert_eq!(affected, 1);

        let commands = storage.get_commands(CommandFilter::everything()).await.unwrap();
        assert!(commands[0].hidden);
        assert!(commands[0].updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_command() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let mut command = test_command("ll", CommandKind::Alias, "/f");
        storage
            .apply_index_batch(IndexBatch {
                inserts: vec![command.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        command.description = Some(String::from("my own words"));
        command.description_is_custom = true;
        command.updated_at = Some(Utc::now());
        storage.update_command(command.clone()).await.unwrap();

        let commands = storage.get_commands(CommandFilter::everything()).await.unwrap();
        assert_eq!(commands[0].description.as_deref(), Some("my own words"));
        assert!(commands[0].description_is_custom);
    }

    #[tokio::test]
    async fn test_delete_commands() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let keep = test_command("keep", CommandKind::Alias, "/f");
        let remove = test_command("remove", CommandKind::Alias, "/f");
        let remove_id = remove.id;
        storage
            .apply_index_batch(IndexBatch {
                inserts: vec![keep, remove],
                ..Default::default()
            })
            .await
            .unwrap();

        storage
            .apply_index_batch(IndexBatch {
                deletes: vec![remove_id],
                ..Default::default()
            })
            .await
            .unwrap();

        let commands = storage.get_commands(CommandFilter::everything()).await.unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "keep");
    }
}
