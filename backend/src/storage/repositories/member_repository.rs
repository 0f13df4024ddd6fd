use anyhow::Result;
use chrono::NaiveDate;
use shared::{format_gregorian, ExpiringMember, Gender, Member};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::warn;

use crate::storage::connection::DbConnection;

// join_date and created_at are only missing on rows the migrations could not backfill
const MEMBER_COLUMNS: &str = r#"
    id, name, family, gender, phone,
    COALESCE(join_date, date(created_at), date('now')) AS join_date,
    start_date, end_date,
    COALESCE(created_at, '') AS created_at
"#;

/// Repository for member rows
#[derive(Clone)]
pub struct MemberRepository {
    db: DbConnection,
}

impl MemberRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a new member. A taken id surfaces as a unique-constraint error.
    pub async fn store_member(&self, member: &Member) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO members (id, name, family, gender, phone, join_date, start_date, end_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.id)
        .bind(&member.name)
        .bind(&member.family)
        .bind(member.gender.as_str())
        .bind(&member.phone)
        .bind(&member.join_date)
        .bind(&member.start_date)
        .bind(&member.end_date)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a member by id
    pub async fn get_member(&self, member_id: &str) -> Result<Option<Member>> {
        let row = sqlx::query(&format!("SELECT {} FROM members WHERE id = ?", MEMBER_COLUMNS))
            .bind(member_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|r| member_from_row(&r)).transpose()
    }

    /// Members matching `text` as a case-sensitive substring of name, family,
    /// phone or id. An empty filter lists everyone.
    pub async fn find_members(&self, text: Option<&str>) -> Result<Vec<Member>> {
        let rows = match text.filter(|t| !t.is_empty()) {
            Some(text) => {
                sqlx::query(&format!(
                    r#"
                    SELECT {} FROM members
                    WHERE instr(name, ?1) > 0
                       OR instr(family, ?1) > 0
                       OR instr(phone, ?1) > 0
                       OR instr(id, ?1) > 0
                    ORDER BY created_at ASC, id ASC
                    "#,
                    MEMBER_COLUMNS
                ))
                .bind(text)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM members ORDER BY created_at ASC, id ASC",
                    MEMBER_COLUMNS
                ))
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(members_from_rows(&rows))
    }

    /// Update the editable contact fields. Returns false when no row matched.
    pub async fn update_contact(
        &self,
        member_id: &str,
        name: &str,
        family: &str,
        phone: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET name = ?, family = ?, phone = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(family)
        .bind(phone)
        .bind(member_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a member together with its payments and their transactions.
    /// Returns false when the member does not exist; nothing is removed then.
    pub async fn delete_member_cascade(&self, member_id: &str) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let exists = sqlx::query("SELECT 1 FROM members WHERE id = ?")
            .bind(member_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Ok(false);
        }

        let transaction_ids: Vec<i64> =
            sqlx::query_scalar("SELECT transaction_id FROM member_payments WHERE member_id = ?")
                .bind(member_id)
                .fetch_all(&mut *tx)
                .await?;

        // Payments first: they reference both the transactions and the member
        sqlx::query("DELETE FROM member_payments WHERE member_id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        for transaction_id in transaction_ids {
            sqlx::query("DELETE FROM transactions WHERE id = ?")
                .bind(transaction_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Members with `min_remaining <= end_date - today < max_remaining`,
    /// soonest first
    pub async fn list_by_remaining(
        &self,
        today: NaiveDate,
        min_remaining: i64,
        max_remaining: i64,
    ) -> Result<Vec<ExpiringMember>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, family, end_date,
                   CAST(julianday(date(end_date)) - julianday(?1) AS INTEGER) AS remaining_days
            FROM members
            WHERE end_date IS NOT NULL
              AND julianday(date(end_date)) - julianday(?1) >= ?2
              AND julianday(date(end_date)) - julianday(?1) < ?3
            ORDER BY end_date ASC
            "#,
        )
        .bind(format_gregorian(today))
        .bind(min_remaining)
        .bind(max_remaining)
        .fetch_all(self.db.pool())
        .await?;

        let members = rows
            .iter()
            .map(|row| ExpiringMember {
                id: row.get("id"),
                name: row.get("name"),
                family: row.get("family"),
                end_date: row.get("end_date"),
                remaining_days: row.get("remaining_days"),
            })
            .collect();

        Ok(members)
    }

    /// Members whose window started at most `max_age` days before `today`
    /// (future start dates included), latest end date first
    pub async fn list_started_within(&self, today: NaiveDate, max_age: i64) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM members
            WHERE julianday(?) - julianday(date(start_date)) <= ?
            ORDER BY end_date DESC
            "#,
            MEMBER_COLUMNS
        ))
        .bind(format_gregorian(today))
        .bind(max_age)
        .fetch_all(self.db.pool())
        .await?;

        Ok(members_from_rows(&rows))
    }

    pub async fn count_members(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn count_by_gender(&self, gender: Gender) -> Result<i64> {
        // Older registration forms stored the Persian label
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE gender IN (?, ?)")
            .bind(gender.as_str())
            .bind(gender.label())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Count members whose start date lies `min_age <= age < max_age` days
    /// before `today`. A missing lower bound also counts future start dates.
    pub async fn count_by_start_age(
        &self,
        today: NaiveDate,
        min_age: Option<i64>,
        max_age: i64,
    ) -> Result<i64> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM members
            WHERE julianday(?1) - julianday(date(start_date)) < ?3
              AND (?2 IS NULL OR julianday(?1) - julianday(date(start_date)) >= ?2)
            "#,
        )
        .bind(format_gregorian(today))
        .bind(min_age)
        .bind(max_age)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }
}

/// Look up a member inside an open transaction
pub async fn fetch_member(conn: &mut SqliteConnection, member_id: &str) -> Result<Option<Member>> {
    let row = sqlx::query(&format!("SELECT {} FROM members WHERE id = ?", MEMBER_COLUMNS))
        .bind(member_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| member_from_row(&r)).transpose()
}

/// Move a member's window end inside an open transaction
pub async fn set_end_date(conn: &mut SqliteConnection, member_id: &str, end_date: &str) -> Result<()> {
    sqlx::query("UPDATE members SET end_date = ? WHERE id = ?")
        .bind(end_date)
        .bind(member_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Map listing rows, leaving out rows whose gender cannot be read
fn members_from_rows(rows: &[SqliteRow]) -> Vec<Member> {
    rows.iter()
        .filter_map(|row| match member_from_row(row) {
            Ok(member) => Some(member),
            Err(e) => {
                let member_id: String = row.get("id");
                warn!(member_id = %member_id, error = %e, "Skipping unreadable member row");
                None
            }
        })
        .collect()
}

fn member_from_row(row: &SqliteRow) -> Result<Member> {
    let gender: String = row.get("gender");
    Ok(Member {
        id: row.get("id"),
        name: row.get("name"),
        family: row.get("family"),
        gender: gender.parse()?,
        phone: row.get("phone"),
        join_date: row.get("join_date"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        created_at: row.get("created_at"),
    })
}
