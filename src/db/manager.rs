//! Database manager implementation
//!
//! This module provides database connection management with:
//! - SQLite connection pool using r2d2
//! - Async wrapper for database operations
//! - Transaction support
//! - Error handling integration with UserManageError

use crate::core::config::{DatabaseConfig, DatabaseLocation};
use crate::core::error::{ErrorContext, Result, UserManageError};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tokio::task;

/// Database manager with connection pool
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<SqliteConnectionManager>,
}

impl DatabaseManager {
    /// Open the store described by the configured connection string
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        match config.location() {
            DatabaseLocation::Memory => Self::new_in_memory(),
            DatabaseLocation::File(path) => Self::new(
                &path,
                config.connection_pool_size as u32,
                Duration::from_millis(config.busy_timeout),
            ),
        }
    }

    /// Create a new DatabaseManager with the specified database path and pool size
    pub fn new(db_path: &Path, pool_size: u32, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {:?}", parent))?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path)
            .with_init(move |conn| {
                // Foreign keys are per-connection in SQLite
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                conn.busy_timeout(busy_timeout)?;
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)?;

        let manager = Self { pool };
        manager.migrate()?;

        Ok(manager)
    }

    /// Create a new DatabaseManager with an in-memory database
    pub fn new_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                Ok(())
            });

        // Every in-memory connection is its own database, so the pool holds exactly one
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)?;

        let manager = Self { pool };
        manager.migrate()?;

        Ok(manager)
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Execute a database operation asynchronously
    ///
    /// The closure runs on the blocking thread pool and the pooled connection
    /// is returned when it finishes, whatever the outcome.
    pub async fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| UserManageError::TaskError(format!("Database task panicked: {}", e)))?
    }

    /// Execute a database operation within a transaction
    ///
    /// The transaction takes the write lock when it begins (`BEGIN IMMEDIATE`),
    /// so a read followed by a write inside it waits on `busy_timeout` instead
    /// of failing with SQLITE_BUSY when another writer got there first.
    ///
    /// The transaction is committed if the closure returns Ok. On Err, or if
    /// the closure panics, the transaction is dropped and rolled back.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(|e| UserManageError::TaskError(format!("Transaction task panicked: {}", e)))?
    }

    /// Execute database migrations
    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.get_connection()?;
        crate::db::migrations::run_migrations(&mut conn)
    }

    /// Get the current pool size
    pub fn pool_size(&self) -> u32 {
        self.pool.max_size()
    }

    /// Get the number of idle connections in the pool
    pub fn idle_connections(&self) -> u32 {
        self.pool.state().idle_connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_db() -> (DatabaseManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("users.db");
        let manager = DatabaseManager::new(&db_path, 4, Duration::from_secs(5)).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_database_manager_creation() {
        let (manager, temp_dir) = create_test_db();
        assert_eq!(manager.pool_size(), 4);
        assert!(temp_dir.path().join("nested").join("users.db").exists());
    }

    #[test]
    fn test_from_config_memory() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            connection_pool_size: 8,
            busy_timeout: 1000,
        };
        let manager = DatabaseManager::from_config(&config).unwrap();
        assert_eq!(manager.pool_size(), 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (manager, _temp_dir) = create_test_db();

        let enabled: i64 = manager
            .execute(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let (manager, _temp_dir) = create_test_db();

        manager
            .transaction(|tx| {
                tx.execute(
                    "INSERT INTO users (id, username, password_hash, first_name, last_name) \
                     VALUES ('u1', 'alice', 'x', 'Alice', 'Liddell')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let count: i64 = manager
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let (manager, _temp_dir) = create_test_db();

        let result: Result<()> = manager
            .transaction(|tx| {
                tx.execute(
                    "INSERT INTO users (id, username, password_hash, first_name, last_name) \
                     VALUES ('u1', 'alice', 'x', 'Alice', 'Liddell')",
                    [],
                )?;
                Err(UserManageError::InvalidRequest("test error".into()))
            })
            .await;
        assert!(result.is_err());

        let count: i64 = manager
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_read_then_write_transactions() {
        let (manager, _temp_dir) = create_test_db();
        let manager = Arc::new(manager);

        for i in 0..8 {
            manager
                .execute(move |conn| {
                    conn.execute(
                        "INSERT INTO users (id, username, password_hash, first_name, last_name) \
                         VALUES (?, ?, 'x', 'First', 'Last')",
                        [format!("u{}", i), format!("user{}", i)],
                    )?;
                    Ok(())
                })
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for round in 0..5 {
            for i in 0..8 {
                let manager = manager.clone();
                handles.push(tokio::spawn(async move {
                    manager
                        .transaction(move |tx| {
                            let id = format!("u{}", i);
                            let name: String = tx.query_row(
                                "SELECT first_name FROM users WHERE id = ?",
                                [&id],
                                |row| row.get(0),
                            )?;
                            tx.execute(
                                "UPDATE users SET first_name = ? WHERE id = ?",
                                [format!("{}-{}", name, round), id],
                            )?;
                            Ok(())
                        })
                        .await
                }));
            }
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_connection_released_after_error() {
        let manager = DatabaseManager::new_in_memory().unwrap();

        let result: Result<()> = manager
            .execute(|_conn| Err(UserManageError::InvalidRequest("boom".into())))
            .await;
        assert!(result.is_err());

        // The single pooled connection must be available again
        assert_eq!(manager.idle_connections(), 1);
        assert!(manager.get_connection().is_ok());
    }
}
