use anyhow::Result;
use shared::User;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::storage::connection::DbConnection;

const USER_COLUMNS: &str = r#"
    id, username, full_name, email, role,
    COALESCE(is_active, 1) AS is_active,
    COALESCE(created_at, '') AS created_at
"#;

/// A user row as written by account creation
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub email: Option<&'a str>,
    pub role: &'a str,
}

/// Repository for staff accounts
#[derive(Clone)]
pub struct UserRepository {
    db: DbConnection,
}

impl UserRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a user, returning the new id. Username and email are unique.
    pub async fn store_user(&self, user: &NewUser<'_>) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, full_name, email, role, is_active)
            VALUES (?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.full_name)
        .bind(user.email)
        .bind(user.role)
        .execute(self.db.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    /// An active user and their stored password hash, looked up by username
    pub async fn get_active_credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM users WHERE username = ? AND is_active = 1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => {
                let user = user_from_row(&r)?;
                Ok(Some((user, r.get("password_hash"))))
            }
            None => Ok(None),
        }
    }

    pub async fn set_active(&self, user_id: i64, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active as i64)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let is_active: i64 = row.get("is_active");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        role: role.parse()?,
        is_active: is_active != 0,
        created_at: row.get("created_at"),
    })
}
