use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Default name for the bucket holding commands that match no category
pub const DEFAULT_UNCATEGORIZED_NAME: &str = "uncategorized";

/// The kind of shell construct a command was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString, clap::ValueEnum)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CommandKind {
    /// An `alias name=value` definition
    Alias,
    /// A `name() { ... }` function definition
    Function,
    /// An `export NAME=value` definition
    Export,
}

/// Where to pick the description of a construct from, when both a comment above and an inline one are present
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentPlacement {
    /// Prefer the inline comment, falling back to the comment above
    #[default]
    Best,
    /// Use the comment above the construct only
    Above,
    /// Use the inline comment only
    Inline,
}

/// What to do with persisted commands whose construct disappeared from the indexed files
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Remove the record from the store
    #[default]
    Delete,
    /// Keep the record, marked as orphaned
    Tombstone,
}

/// The identity of a command across indexing runs.
///
/// Two constructs are the same command only when the name, the kind and the file they live in all match; a rename or a
/// file move produces a new identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandKey {
    pub name: String,
    pub kind: CommandKind,
    pub source_path: String,
}

/// A construct extracted from a file, before it's matched against the store.
///
/// Produced by the parser; carries both comment candidates so the resolver can pick the effective description based on
/// the configured placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConstruct {
    pub kind: CommandKind,
    pub name: String,
    pub code: String,
    pub source_path: String,
    pub line_number: usize,
    pub comment_above: Option<String>,
    pub comment_inline: Option<String>,
}

impl RawConstruct {
    /// The identity key of this construct
    pub fn key(&self) -> CommandKey {
        CommandKey {
            name: self.name.clone(),
            kind: self.kind,
            source_path: self.source_path.clone(),
        }
    }

    /// Resolves the effective description from the comment candidates
    pub fn resolve_description(&self, placement: CommentPlacement) -> Option<String> {
        match placement {
            CommentPlacement::Above => self.comment_above.clone(),
            CommentPlacement::Inline => self.comment_inline.clone(),
            CommentPlacement::Best => self.comment_inline.clone().or_else(|| self.comment_above.clone()),
        }
    }
}

/// A persisted command, as stored on the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Unique identifier of the record
    pub id: Uuid,
    /// The token invoking the command
    pub name: String,
    /// The kind of construct it was extracted from
    pub kind: CommandKind,
    /// The file the construct lives in
    pub source_path: String,
    /// The right-hand-side value or function body
    pub code: String,
    /// The resolved description, possibly overridden by the user
    pub description: Option<String>,
    /// The assigned category, possibly overridden by the user
    pub category: String,
    /// Whether the user chose to hide this command; never touched by re-indexing
    pub hidden: bool,
    /// Whether the description was set by the user and must survive re-indexing
    pub description_is_custom: bool,
    /// Whether the category was set by the user and must survive re-indexing
    pub category_is_custom: bool,
    /// When the construct disappeared from the indexed files, under the tombstone removal policy
    pub orphaned_at: Option<DateTime<Utc>>,
    /// When the record was first indexed
    pub created_at: DateTime<Utc>,
    /// When the record was last updated
    pub updated_at: Option<DateTime<Utc>>,
}

impl Command {
    /// Builds a new command from a freshly parsed construct, with its resolved description and category
    pub fn from_construct(construct: &RawConstruct, description: Option<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: construct.name.clone(),
            kind: construct.kind,
            source_path: construct.source_path.clone(),
            code: construct.code.clone(),
            description,
            category: category.into(),
            hidden: false,
            description_is_custom: false,
            category_is_custom: false,
            orphaned_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// The identity key of this command
    pub fn key(&self) -> CommandKey {
        CommandKey {
            name: self.name.clone(),
            kind: self.kind,
            source_path: self.source_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn construct(above: Option<&str>, inline: Option<&str>) -> RawConstruct {
        RawConstruct {
            kind: CommandKind::Alias,
            name: "ll".into(),
            code: "ls -la".into(),
            source_path: "/home/user/.aliases".into(),
            line_number: 1,
            comment_above: above.map(String::from),
            comment_inline: inline.map(String::from),
        }
    }

    #[test]
    fn test_resolve_description_best_prefers_inline() {
        let c = construct(Some("Fetch weather"), Some("Get weather now"));
        assert_eq!(
            c.resolve_description(CommentPlacement::Best).as_deref(),
            Some("Get weather now")
        );
        assert_eq!(
            c.resolve_description(CommentPlacement::Above).as_deref(),
            Some("Fetch weather")
        );
        assert_eq!(
            c.resolve_description(CommentPlacement::Inline).as_deref(),
            Some("Get weather now")
        );
    }

    #[test]
    fn test_resolve_description_best_falls_back_to_above() {
        let c = construct(Some("Fetch weather"), None);
        assert_eq!(
            c.resolve_description(CommentPlacement::Best).as_deref(),
            Some("Fetch weather")
        );
        assert_eq!(c.resolve_description(CommentPlacement::Inline), None);
    }

    #[test]
    fn test_resolve_description_empty() {
        let c = construct(None, None);
        assert_eq!(c.resolve_description(CommentPlacement::Best), None);
    }

    #[test]
    fn test_key_matches_between_construct_and_command() {
        let c = construct(None, None);
        let cmd = Command::from_construct(&c, None, DEFAULT_UNCATEGORIZED_NAME);
        assert_eq!(c.key(), cmd.key());
    }
}
