use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::DotdexService;
use crate::{
    cli::{EditProcess, SearchProcess, SearchTarget, SelectArgs},
    errors::{Result, UserFacingError},
    model::Command,
    storage::CommandFilter,
};

impl DotdexService {
    /// Retrieves the commands matching the given filter
    #[instrument(skip_all)]
    pub async fn list_commands(&self, filter: CommandFilter) -> Result<Vec<Command>> {
        self.storage.get_commands(filter).await
    }

    /// Searches indexed commands with a regex over the name or the code
    #[instrument(skip_all)]
    pub async fn search_commands(&self, args: SearchProcess) -> Result<Vec<Command>> {
        // Validate the regex upfront for a clean error, honoring the configured case sensitivity
        regex::Regex::new(&args.pattern).map_err(|err| UserFacingError::InvalidSearchRegex(err.to_string()))?;
        let pattern = if self.config.case_sensitive {
            args.pattern
        } else {
            format!("(?i){}", args.pattern)
        };

        tracing::info!("Searching commands by {:?}: {pattern}", args.target);
        let mut filter = CommandFilter {
            include_hidden: args.hidden,
            ..Default::default()
        };
        match args.target {
            SearchTarget::Name => filter.name_regex = Some(pattern),
            SearchTarget::Code => filter.code_regex = Some(pattern),
        }
        self.storage.get_commands(filter).await
    }

    /// Hides the commands matching the selection, returning how many were affected
    #[instrument(skip_all)]
    pub async fn hide_commands(&self, select: SelectArgs) -> Result<u64> {
        let ids = self.select_ids(&select).await?;
        tracing::info!("Hiding {} command(s) named '{}'", ids.len(), select.name);
        self.storage.set_hidden(ids, true).await
    }

    /// Unhides the commands matching the selection, returning how many were affected
    #[instrument(skip_all)]
    pub async fn unhide_commands(&self, select: SelectArgs) -> Result<u64> {
        let ids = self.select_ids(&select).await?;
        tracing::info!("Unhiding {} command(s) named '{}'", ids.len(), select.name);
        self.storage.set_hidden(ids, false).await
    }

    /// Edits the description and/or category of a single command.
    ///
    /// Setting a value marks it as custom so re-indexing preserves it; clearing drops the custom flag so the next
    /// indexing run recomputes the value from the files.
    #[instrument(skip_all)]
    pub async fn edit_command(&self, args: EditProcess) -> Result<Command> {
        let mut commands = self.select_commands(&args.select).await?;
        if commands.len() > 1 {
            return Err(UserFacingError::CommandAmbiguous(args.select.name, commands.len()).into());
        }
        let mut command = commands.remove(0);

        if let Some(description) = args.description {
            command.description = Some(description);
            command.description_is_custom = true;
        }
        if args.clear_description {
            command.description_is_custom = false;
        }
        if let Some(category) = args.category {
            command.category = category;
            command.category_is_custom = true;
        }
        if args.clear_category {
            command.category_is_custom = false;
        }
        command.updated_at = Some(Utc::now());

        tracing::info!("Updating command '{}'", command.name);
        self.storage.update_command(command).await
    }

    /// Retrieves the commands matching a selection, failing when there's none
    async fn select_commands(&self, select: &SelectArgs) -> Result<Vec<Command>> {
        let commands = self
            .storage
            .get_commands(CommandFilter {
                name: Some(select.name.clone()),
                kind: select.kind,
                source_path: select.file.clone(),
                include_hidden: true,
                include_orphaned: true,
                ..Default::default()
            })
            .await?;
        if commands.is_empty() {
            return Err(UserFacingError::CommandNotFound(select.name.clone()).into());
        }
        Ok(commands)
    }

    async fn select_ids(&self, select: &SelectArgs) -> Result<Vec<Uuid>> {
        Ok(self.select_commands(select).await?.into_iter().map(|c| c.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::Config,
        errors::AppError,
        model::{CommandKind, RawConstruct},
        storage::{IndexBatch, SqliteStorage},
    };

    async fn service_with(commands: Vec<Command>) -> DotdexService {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        storage
            .apply_index_batch(IndexBatch {
                inserts: commands,
                ..Default::default()
            })
            .await
            .unwrap();
        DotdexService::new(storage, Config::default())
    }

    fn command(name: &str, kind: CommandKind, path: &str, code: &str) -> Command {
        let construct = RawConstruct {
            kind,
            name: name.into(),
            code: code.into(),
            source_path: path.into(),
            line_number: 1,
            comment_above: None,
            comment_inline: None,
        };
        Command::from_construct(&construct, None, "uncategorized")
    }

    fn select(name: &str) -> SelectArgs {
        SelectArgs {
            name: name.into(),
            kind: None,
            file: None,
        }
    }

    #[tokio::test]
    async fn test_search_by_name_case_insensitive_by_default() {
        let service = service_with(vec![
            command("Get_Weather", CommandKind::Function, "/f", "curl wttr.in"),
            command("deploy", CommandKind::Function, "/f", "./deploy.sh"),
        ])
        .await;

        let results = service
            .search_commands(SearchProcess {
                pattern: String::from("^get_"),
                target: SearchTarget::Name,
                hidden: false,
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Get_Weather");
    }

    #[tokio::test]
    async fn test_search_invalid_regex() {
        let service = service_with(Vec::new()).await;
        let err = service
            .search_commands(SearchProcess {
                pattern: String::from("["),
                target: SearchTarget::Code,
                hidden: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::UserFacing(UserFacingError::InvalidSearchRegex(_))
        ));
    }

    #[tokio::test]
    async fn test_hide_and_unhide() {
        let service = service_with(vec![command("ll", CommandKind::Alias, "/f", "ls -la")]).await;

        assert_eq!(service.hide_commands(select("ll")).await.unwrap(), 1);
        assert_eq!(
            service.list_commands(CommandFilter::default()).await.unwrap(),
            Vec::new()
        );

        assert_eq!(service.unhide_commands(select("ll")).await.unwrap(), 1);
        assert_eq!(service.list_commands(CommandFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hide_unknown_command() {
        let service = service_with(Vec::new()).await;
        let err = service.hide_commands(select("nope")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::UserFacing(UserFacingError::CommandNotFound(name)) if name == "nope"
        ));
    }

    #[tokio::test]
    async fn test_edit_sets_custom_flags() {
        let service = service_with(vec![command("ll", CommandKind::Alias, "/f", "ls -la")]).await;

        let updated = service
            .edit_command(EditProcess {
                select: select("ll"),
                description: Some(String::from("list everything")),
                category: Some(String::from("files")),
                clear_description: false,
                clear_category: false,
            })
            .await
            .unwrap();

        assert_eq!(updated.description.as_deref(), Some("list everything"));
        assert!(updated.description_is_custom);
        assert_eq!(updated.category, "files");
        assert!(updated.category_is_custom);
    }

    #[tokio::test]
    async fn test_edit_clear_resets_custom_flags() {
        let service = service_with(vec![command("ll", CommandKind::Alias, "/f", "ls -la")]).await;
        service
            .edit_command(EditProcess {
                select: select("ll"),
                description: Some(String::from("custom")),
                category: None,
                clear_description: false,
                clear_category: false,
            })
            .await
            .unwrap();

        let updated = service
            .edit_command(EditProcess {
                select: select("ll"),
                description: None,
                category: None,
                clear_description: true,
                clear_category: false,
            })
            .await
            .unwrap();
        assert!(!updated.description_is_custom);
    }

    #[tokio::test]
    async fn test_edit_ambiguous_selection() {
        // Same name on two different files
        let service = service_with(vec![
            command("ll", CommandKind::Alias, "/f1", "ls -la"),
            command("ll", CommandKind::Alias, "/f2", "ls -lah"),
        ])
        .await;

        let err = service
            .edit_command(EditProcess {
                select: select("ll"),
                description: Some(String::from("x")),
                category: None,
                clear_description: false,
                clear_category: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::UserFacing(UserFacingError::CommandAmbiguous(_, 2))
        ));

        // Narrowing down by file makes it unambiguous
        let updated = service
            .edit_command(EditProcess {
                select: SelectArgs {
                    name: String::from("ll"),
                    kind: None,
                    file: Some(String::from("/f1")),
                },
                description: Some(String::from("x")),
                category: None,
                clear_description: false,
                clear_category: false,
            })
            .await
            .unwrap();
        assert_eq!(updated.source_path, "/f1");
    }
}
