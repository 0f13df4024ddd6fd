//! # Schema & Migrations
//!
//! Brings any store, fresh or legacy, to the current layout on startup.
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS`. Columns added after
//! the first release are detected by introspecting `PRAGMA table_info` and
//! added with `ALTER TABLE`, then backfilled. There is no version counter:
//! every step checks the live schema, so running [`initialize`] any number of
//! times leaves the same column set and the same rows.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

use crate::domain::user_service::hash_password;
use crate::storage::repositories::settings_repository::MONTHLY_FEE_KEY;

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_ADMIN_FULL_NAME: &str = "System Administrator";
const DEFAULT_ADMIN_EMAIL: &str = "admin@gym.com";

/// Create missing tables, apply column migrations and seed first-run data
pub async fn initialize(pool: &SqlitePool, default_monthly_fee: i64) -> Result<()> {
    create_tables(pool).await?;
    migrate(pool).await?;
    create_indexes(pool).await?;
    seed(pool, default_monthly_fee).await?;
    Ok(())
}

async fn create_tables(pool: &SqlitePool) -> Result<()> {
    // Members table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            family TEXT NOT NULL,
            gender TEXT NOT NULL,
            phone TEXT,
            join_date DATE,
            start_date DATE,
            end_date DATE,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT UNIQUE,
            role TEXT NOT NULL DEFAULT 'staff',
            is_active BOOLEAN DEFAULT 1,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Settings table for system-wide configuration
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Transactions table for all financial records. created_by is a
    // best-effort attribution with no foreign key.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_type TEXT NOT NULL,
            amount REAL NOT NULL,
            description TEXT,
            payment_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            created_by INTEGER
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Member payments link members to the transaction that paid a window
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS member_payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id TEXT NOT NULL,
            transaction_id INTEGER NOT NULL,
            payment_date TIMESTAMP NOT NULL,
            due_date TIMESTAMP NOT NULL,
            status TEXT DEFAULT 'paid',
            FOREIGN KEY (transaction_id) REFERENCES transactions (id),
            FOREIGN KEY (member_id) REFERENCES members (id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_member_payments_member_id
        ON member_payments(member_id);
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_member_payments_transaction_id
        ON member_payments(transaction_id);
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_members_end_date
        ON members(end_date);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Column names of `table`, in declaration order
pub async fn column_names(pool: &SqlitePool, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    let columns = column_names(pool, "members").await?;
    let has = |name: &str| columns.iter().any(|c| c == name);

    // Stores created before paid-up windows had an end date
    if !has("end_date") {
        sqlx::query("ALTER TABLE members ADD COLUMN end_date DATE")
            .execute(pool)
            .await?;
        info!("Added end_date column to members table");
    }

    if !has("created_at") {
        sqlx::query("ALTER TABLE members ADD COLUMN created_at TIMESTAMP")
            .execute(pool)
            .await?;
        // The true creation time of legacy rows is lost; stamp them with now
        let backfilled = sqlx::query(
            "UPDATE members SET created_at = CURRENT_TIMESTAMP WHERE created_at IS NULL",
        )
        .execute(pool)
        .await?
        .rows_affected();
        info!(backfilled, "Added created_at column to members table");
    }

    if !has("join_date") {
        sqlx::query("ALTER TABLE members ADD COLUMN join_date DATE")
            .execute(pool)
            .await?;
        let backfilled = sqlx::query(
            r#"
            UPDATE members
            SET join_date = COALESCE(date(created_at), date('now'))
            WHERE join_date IS NULL
            "#,
        )
        .execute(pool)
        .await?
        .rows_affected();
        info!(backfilled, "Added join_date column to members table");
    }

    Ok(())
}

async fn seed(pool: &SqlitePool, default_monthly_fee: i64) -> Result<()> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if user_count == 0 {
        let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
        sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, full_name, email, role, is_active)
            VALUES (?, ?, ?, ?, 'admin', 1)
            "#,
        )
        .bind(DEFAULT_ADMIN_USERNAME)
        .bind(password_hash)
        .bind(DEFAULT_ADMIN_FULL_NAME)
        .bind(DEFAULT_ADMIN_EMAIL)
        .execute(pool)
        .await?;
        warn!(
            username = DEFAULT_ADMIN_USERNAME,
            "Created default administrator account; change its password before production use"
        );
    }

    // Insert only when absent so an operator's fee survives restarts
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(MONTHLY_FEE_KEY)
        .bind(default_monthly_fee.to_string())
        .execute(pool)
        .await?
        .rows_affected();
    if inserted > 0 {
        info!(default_monthly_fee, "Seeded default monthly fee");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn raw_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database")
    }

    /// A store as the very first release left it: no end_date, created_at
    /// or join_date columns, Persian gender labels
    async fn legacy_pool() -> SqlitePool {
        let pool = raw_pool().await;
        sqlx::query(
            r#"
            CREATE TABLE members (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                family TEXT NOT NULL,
                gender TEXT NOT NULL,
                phone TEXT,
                start_date TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO members (id, name, family, gender, phone, start_date) VALUES
                ('1001', 'Ali', 'Rezaei', 'مرد', '09120000001', '2024-01-01'),
                ('1002', 'Maryam', 'Kazemi', 'زن', '09120000002', '2024-01-05'),
                ('1003', 'Hossein', 'Mohammadi', 'men', NULL, '2024-01-10')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    async fn table_counts(pool: &SqlitePool) -> Vec<i64> {
        let mut counts = Vec::new();
        for table in ["members", "transactions", "member_payments", "settings", "users"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(pool)
                .await
                .unwrap();
            counts.push(count);
        }
        counts
    }

    async fn all_columns(pool: &SqlitePool) -> Vec<Vec<String>> {
        let mut columns = Vec::new();
        for table in ["members", "transactions", "member_payments", "settings", "users"] {
            columns.push(column_names(pool, table).await.unwrap());
        }
        columns
    }

    #[tokio::test]
    async fn test_fresh_store_gets_every_column() {
        let pool = raw_pool().await;
        initialize(&pool, 500000).await.unwrap();

        let members = column_names(&pool, "members").await.unwrap();
        assert_eq!(
            members,
            vec!["id", "name", "family", "gender", "phone", "join_date", "start_date", "end_date", "created_at"]
        );
    }

    #[tokio::test]
    async fn test_legacy_store_is_migrated_without_losing_rows() {
        let pool = legacy_pool().await;
        initialize(&pool, 500000).await.unwrap();

        let members = column_names(&pool, "members").await.unwrap();
        for column in ["end_date", "created_at", "join_date"] {
            assert!(members.iter().any(|c| c == column), "missing {}", column);
        }

        let rows = sqlx::query("SELECT id, gender, created_at, join_date, end_date FROM members ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            let created_at: Option<String> = row.get("created_at");
            let join_date: Option<String> = row.get("join_date");
            let end_date: Option<String> = row.get("end_date");
            assert!(created_at.is_some());
            // join_date is backfilled from created_at, which is "now"
            assert_eq!(join_date.as_deref(), created_at.as_deref().map(|c| &c[..10]));
            assert!(end_date.is_none());
        }

        // Labels written by older registration forms are read as they are
        let genders: Vec<String> = rows.iter().map(|row| row.get("gender")).collect();
        assert_eq!(genders, vec!["مرد", "زن", "men"]);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = legacy_pool().await;

        initialize(&pool, 500000).await.unwrap();
        let columns_after_first = all_columns(&pool).await;
        let counts_after_first = table_counts(&pool).await;
        let join_dates_after_first: Vec<Option<String>> =
            sqlx::query_scalar("SELECT join_date FROM members ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();

        initialize(&pool, 500000).await.unwrap();
        assert_eq!(all_columns(&pool).await, columns_after_first);
        assert_eq!(table_counts(&pool).await, counts_after_first);
        let join_dates_after_second: Vec<Option<String>> =
            sqlx::query_scalar("SELECT join_date FROM members ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(join_dates_after_second, join_dates_after_first);
    }

    #[tokio::test]
    async fn test_restart_keeps_member_values() {
        let pool = raw_pool().await;
        initialize(&pool, 500000).await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO members (id, name, family, gender, join_date, start_date, end_date)
            VALUES ('2001', 'Reza', 'Ahmadi', 'مرد', '2024-6-1', '2024-6-1', '2024-6-10')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        initialize(&pool, 500000).await.unwrap();

        let (gender, end_date): (String, String) =
            sqlx::query_as("SELECT gender, end_date FROM members WHERE id = '2001'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(gender, "مرد");
        assert_eq!(end_date, "2024-6-10");
    }

    #[tokio::test]
    async fn test_seeds_single_admin_and_fee_once() {
        let pool = raw_pool().await;
        initialize(&pool, 500000).await.unwrap();
        initialize(&pool, 900000).await.unwrap();

        let users: Vec<(String, String)> = sqlx::query_as("SELECT username, role FROM users")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(users, vec![("admin".to_string(), "admin".to_string())]);

        let fee: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'monthly_fee'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fee, "500000");
    }

    #[tokio::test]
    async fn test_seeded_admin_password_is_hashed() {
        let pool = raw_pool().await;
        initialize(&pool, 500000).await.unwrap();

        let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE username = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_ne!(hash, DEFAULT_ADMIN_PASSWORD);
        assert!(crate::domain::user_service::verify_password(DEFAULT_ADMIN_PASSWORD, &hash));
    }
}
