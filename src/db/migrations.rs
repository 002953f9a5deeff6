//! Database migrations
//!
//! Versioned schema changes tracked in `schema_migrations`. Each migration
//! runs in its own transaction together with its version row.

use crate::core::error::Result;
use rusqlite::Connection;
use tracing::{info, warn};

/// Migration version tracking table
const MIGRATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Initial schema (version 1)
///
/// `user_roles` references `users` without cascade, so role rows have to be
/// removed before the account they belong to.
const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL
);

INSERT OR IGNORE INTO roles (id, name) VALUES (1, 'admin');
INSERT OR IGNORE INTO roles (id, name) VALUES (2, 'user');

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id TEXT NOT NULL,
    role_id INTEGER NOT NULL,
    PRIMARY KEY (user_id, role_id),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (role_id) REFERENCES roles(id)
);
"#;

/// Role lookup index (version 2)
const MIGRATION_V2: &str = r#"
CREATE INDEX IF NOT EXISTS idx_user_roles_user_id ON user_roles(user_id);
"#;

const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "Initial account and role schema", MIGRATION_V1),
    (2, "Role lookup index", MIGRATION_V2),
];

/// Latest schema version known to this build
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(version, _, _)| *version).unwrap_or(0)
}

/// Run all pending database migrations
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(MIGRATION_TABLE)?;

    let current_version = current_version(conn)?;
    info!("Current database schema version: {}", current_version);

    for (version, description, sql) in MIGRATIONS {
        if *version > current_version {
            info!("Applying migration v{}: {}", version, description);
            apply_migration(conn, *version, sql)?;
        }
    }

    Ok(())
}

/// Highest applied migration version, 0 for a fresh store
pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn apply_migration(conn: &mut Connection, version: i64, sql: &str) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(sql).map_err(|e| {
        warn!("Migration v{} failed: {}", version, e);
        e
    })?;

    tx.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [version],
    )?;

    tx.commit()?;

    info!("Migration v{} applied successfully", version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_apply_and_seed_roles() {
        let mut conn = open();
        run_migrations(&mut conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), latest_version());

        let roles: Vec<(i64, String)> = conn
            .prepare("SELECT id, name FROM roles ORDER BY id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(roles, vec![(1, "admin".to_string()), (2, "user".to_string())]);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = open();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_account_cannot_be_removed_before_its_roles() {
        let mut conn = open();
        run_migrations(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO users (id, username, password_hash, first_name, last_name) \
             VALUES ('u1', 'alice', 'x', 'Alice', 'Liddell')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO user_roles (user_id, role_id) VALUES ('u1', 2)", [])
            .unwrap();

        assert!(conn.execute("DELETE FROM users WHERE id = 'u1'", []).is_err());
    }
}
