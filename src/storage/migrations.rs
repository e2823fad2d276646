use rusqlite_migration::{M, Migrations};

/// Database migrations for the SQLite storage
pub const MIGRATIONS: Migrations<'_> = Migrations::from_slice(MIGRATION_SLICE);
const MIGRATION_SLICE: &[M<'_>] = &[
    // Migration 1: Create the command table
    M::up(
        r#"CREATE TABLE command (
            id BLOB PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            source_path TEXT NOT NULL,
            code TEXT NOT NULL,
            description TEXT NULL,
            category TEXT NOT NULL,
            hidden INTEGER NOT NULL DEFAULT 0,
            description_is_custom INTEGER NOT NULL DEFAULT 0,
            category_is_custom INTEGER NOT NULL DEFAULT 0,
            orphaned_at TEXT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NULL,
            UNIQUE (name, kind, source_path)
        );"#,
    ),
    // Migration 2: Indexes for the common listing filters
    M::up(
        r#"CREATE INDEX idx_command_category ON command(category);
        CREATE INDEX idx_command_name ON command(name);"#,
    ),
];

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    #[test]
    fn test_migrations_apply_successfully() -> rusqlite_migration::Result<()> {
        // Create in-memory database
        let mut conn = Connection::open_in_memory()?;

        // Apply migrations
        MIGRATIONS.to_latest(&mut conn)
    }
}
