//! Repository pattern implementation for data access layer
//!
//! Account writes that touch both `users` and `user_roles` go through a single
//! transaction; the individual statements are exposed as functions over a
//! `rusqlite::Transaction` so callers can compose them.

use crate::core::error::{Result, UserManageError};
use crate::db::manager::DatabaseManager;
use crate::db::models::{Role, User, UserChanges, UserWithRole};
use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, Transaction};
use std::sync::Arc;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Find an entity by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<()>;

    /// Delete an entity by its ID
    async fn delete(&self, id: &str) -> Result<()>;
}

const USER_COLUMNS: &str = "id, username, password_hash, first_name, last_name, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Turn a UNIQUE violation on `users.username` into a client-facing conflict
fn conflict_on_duplicate(username: &str) -> impl FnOnce(UserManageError) -> UserManageError + '_ {
    move |err| {
        if err.is_unique_violation() {
            UserManageError::Conflict(format!("Username '{}' already exists", username))
        } else {
            err
        }
    }
}

/// Insert the account row
pub fn insert_account(tx: &Transaction<'_>, user: &User) -> Result<()> {
    tx.execute(
        "INSERT INTO users (id, username, password_hash, first_name, last_name, created_at) \
         VALUES (?, ?, ?, ?, ?, COALESCE(NULLIF(?, ''), CURRENT_TIMESTAMP))",
        rusqlite::params![
            &user.id,
            &user.username,
            &user.password_hash,
            &user.first_name,
            &user.last_name,
            &user.created_at,
        ],
    )
    .map_err(UserManageError::from)
    .map_err(conflict_on_duplicate(&user.username))?;
    Ok(())
}

/// Insert a role assignment for an existing account
pub fn insert_role_assignment(tx: &Transaction<'_>, user_id: &str, role: Role) -> Result<()> {
    tx.execute(
        "INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)",
        rusqlite::params![user_id, role],
    )?;
    Ok(())
}

/// Remove every role assignment of an account, returning how many were removed
pub fn delete_role_assignments(tx: &Transaction<'_>, user_id: &str) -> Result<usize> {
    Ok(tx.execute("DELETE FROM user_roles WHERE user_id = ?", [user_id])?)
}

/// Remove the account row, returning how many rows were removed
pub fn delete_account(tx: &Transaction<'_>, user_id: &str) -> Result<usize> {
    Ok(tx.execute("DELETE FROM users WHERE id = ?", [user_id])?)
}

/// Repository for accounts and their role assignments
pub struct UserRepository {
    db: Arc<DatabaseManager>,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Get a reference to the database manager
    pub fn db(&self) -> &Arc<DatabaseManager> {
        &self.db
    }

    /// Create an account and its role assignment atomically
    pub async fn create_with_role(&self, user: &User, role: Role) -> Result<()> {
        let user = user.clone();
        self.db
            .transaction(move |tx| {
                insert_account(tx, &user)?;
                insert_role_assignment(tx, &user.id, role)?;
                Ok(())
            })
            .await
    }

    /// Find an account by username (exact, case-sensitive match)
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.db
            .execute(move |conn| {
                let user = conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
                        [&username],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
    }

    /// Current role of an account
    ///
    /// Accounts are expected to hold exactly one assignment; if several exist
    /// the most privileged wins. An account without any assignment is treated
    /// as a plain user.
    pub async fn find_role(&self, user_id: &str) -> Result<Role> {
        let user_id = user_id.to_string();
        self.db
            .execute(move |conn| {
                let role: Option<Role> = conn
                    .query_row(
                        "SELECT role_id FROM user_roles WHERE user_id = ? ORDER BY role_id LIMIT 1",
                        [&user_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                Ok(role.unwrap_or_else(|| {
                    tracing::warn!(user_id = %user_id, "Account has no role assignment, treating as user");
                    Role::User
                }))
            })
            .await
    }

    /// Find an account together with its role
    pub async fn find_with_role(&self, id: &str) -> Result<Option<UserWithRole>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT u.id, u.username, u.password_hash, u.first_name, u.last_name, \
                         u.created_at, MIN(r.role_id) \
                         FROM users u LEFT JOIN user_roles r ON r.user_id = u.id \
                         WHERE u.id = ? GROUP BY u.id",
                        [&id],
                        |row| {
                            Ok(UserWithRole {
                                user: user_from_row(row)?,
                                role: row.get::<_, Option<Role>>(6)?.unwrap_or_default(),
                            })
                        },
                    )
                    .optional()?;
                Ok(found)
            })
            .await
    }

    /// Every account with its role, ordered by username
    ///
    /// Unpaginated: the whole table is returned in one response.
    pub async fn find_all_with_roles(&self) -> Result<Vec<UserWithRole>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT u.id, u.username, u.password_hash, u.first_name, u.last_name, \
                     u.created_at, MIN(r.role_id) \
                     FROM users u LEFT JOIN user_roles r ON r.user_id = u.id \
                     GROUP BY u.id ORDER BY u.username",
                )?;

                let users = stmt
                    .query_map([], |row| {
                        Ok(UserWithRole {
                            user: user_from_row(row)?,
                            role: row.get::<_, Option<Role>>(6)?.unwrap_or_default(),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(users)
            })
            .await
    }

    /// Apply field changes to the account with the given id
    ///
    /// The id is the only row selector; callers resolve it from the session
    /// or the admin path, never from the request body.
    pub async fn update_fields(&self, id: &str, changes: UserChanges) -> Result<User> {
        let id = id.to_string();
        self.db
            .transaction(move |tx| {
                let mut user = tx
                    .query_row(
                        &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                        [&id],
                        user_from_row,
                    )
                    .optional()?
                    .ok_or_else(|| UserManageError::NotFound(format!("User {} not found", id)))?;

                changes.apply_to(&mut user);
                update_account(tx, &user)?;
                Ok(user)
            })
            .await
    }

    /// Count total accounts
    pub async fn count(&self) -> Result<i64> {
        self.db
            .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .await
    }
}

fn update_account(tx: &Transaction<'_>, user: &User) -> Result<()> {
    let updated = tx.execute(
        "UPDATE users SET username = ?, password_hash = ?, first_name = ?, last_name = ? \
         WHERE id = ?",
        rusqlite::params![
            &user.username,
            &user.password_hash,
            &user.first_name,
            &user.last_name,
            &user.id,
        ],
    )
    .map_err(UserManageError::from)
    .map_err(conflict_on_duplicate(&user.username))?;

    if updated == 0 {
        return Err(UserManageError::NotFound(format!("User {} not found", user.id)));
    }
    Ok(())
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let user = conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                        [&id],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
    }

    /// Create with the default `user` role
    async fn create(&self, user: &User) -> Result<()> {
        self.create_with_role(user, Role::default()).await
    }

    /// Remove role assignments, then the account, in one transaction
    async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.db
            .transaction(move |tx| {
                delete_role_assignments(tx, &id)?;
                if delete_account(tx, &id)? == 0 {
                    return Err(UserManageError::NotFound(format!("User {} not found", id)));
                }
                Ok(())
            })
            .await
    }
}
