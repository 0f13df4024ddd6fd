//! SQL for the two ledger tables: `transactions` and the `member_payments`
//! rows that tie a transaction to a member's paid-up window.
//!
//! Multi-statement writes are exposed as free functions over an open
//! `SqliteConnection` so the caller decides the transaction boundary.

use anyhow::Result;
use chrono::NaiveDate;
use shared::{
    format_gregorian, MemberPayment, PaymentFilter, PaymentListing, PaymentStatus, Transaction,
    TransactionType,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::storage::connection::DbConnection;

const LISTING_SELECT: &str = r#"
    SELECT
        mp.id AS payment_id,
        mp.transaction_id,
        mp.member_id,
        m.name AS member_name,
        m.family AS member_family,
        CAST(t.amount AS REAL) AS amount,
        t.description,
        t.transaction_type,
        COALESCE(t.payment_date, '') AS transaction_date,
        mp.payment_date,
        mp.due_date,
        COALESCE(mp.status, 'paid') AS status
    FROM member_payments mp
    JOIN transactions t ON t.id = mp.transaction_id
    JOIN members m ON m.id = mp.member_id
"#;

const LISTING_ORDER: &str = " ORDER BY mp.payment_date DESC, mp.id DESC";

/// A transaction row about to be written
#[derive(Debug, Clone)]
pub struct NewTransaction<'a> {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: &'a str,
    pub payment_date: &'a str,
    pub created_by: Option<i64>,
}

/// A member payment row about to be written
#[derive(Debug, Clone)]
pub struct NewMemberPayment<'a> {
    pub member_id: &'a str,
    pub transaction_id: i64,
    pub payment_date: &'a str,
    pub due_date: &'a str,
    pub status: PaymentStatus,
}

/// Repository for transactions and member payments
#[derive(Clone)]
pub struct LedgerRepository {
    db: DbConnection,
}

impl LedgerRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Payments joined with their transaction and member, newest first.
    /// Every supplied filter must match.
    pub async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<PaymentListing>> {
        let mut qb = QueryBuilder::<Sqlite>::new(LISTING_SELECT);
        qb.push(" WHERE 1 = 1");

        if let Some(text) = filter.text.as_deref().filter(|t| !t.is_empty()) {
            qb.push(" AND (instr(m.name, ")
                .push_bind(text)
                .push(") > 0 OR instr(m.family, ")
                .push_bind(text)
                .push(") > 0 OR instr(mp.member_id, ")
                .push_bind(text)
                .push(") > 0)");
        }
        if let Some(status) = filter.status {
            qb.push(" AND COALESCE(mp.status, 'paid') = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND date(mp.payment_date) >= ").push_bind(format_gregorian(from));
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND date(mp.payment_date) <= ").push_bind(format_gregorian(to));
        }
        qb.push(LISTING_ORDER);

        let rows = qb.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(listing_from_row).collect()
    }

    /// A member's payment history, newest first
    pub async fn member_payments(&self, member_id: &str) -> Result<Vec<PaymentListing>> {
        let rows = sqlx::query(&format!("{} WHERE mp.member_id = ?{}", LISTING_SELECT, LISTING_ORDER))
            .bind(member_id)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(listing_from_row).collect()
    }

    /// Payments dated within `[from, to]`, oldest first
    pub async fn payments_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<PaymentListing>> {
        let rows = sqlx::query(&format!(
            "{} WHERE date(mp.payment_date) BETWEEN ? AND ? ORDER BY mp.payment_date ASC, mp.id ASC",
            LISTING_SELECT
        ))
        .bind(format_gregorian(from))
        .bind(format_gregorian(to))
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(listing_from_row).collect()
    }

    /// Sum of every membership transaction ever recorded
    pub async fn total_income(&self) -> Result<f64> {
        let total = sqlx::query_scalar(
            "SELECT TOTAL(amount) FROM transactions WHERE transaction_type = 'membership'",
        )
        .fetch_one(self.db.pool())
        .await?;
        Ok(total)
    }

    /// Sum of membership transactions whose date falls in `year_month` (YYYY-MM)
    pub async fn income_for_month(&self, year_month: &str) -> Result<f64> {
        let total = sqlx::query_scalar(
            r#"
            SELECT TOTAL(amount) FROM transactions
            WHERE transaction_type = 'membership'
              AND strftime('%Y-%m', payment_date) = ?
            "#,
        )
        .bind(year_month)
        .fetch_one(self.db.pool())
        .await?;
        Ok(total)
    }

    pub async fn get_payment(&self, payment_id: i64) -> Result<Option<MemberPayment>> {
        let row = sqlx::query(
            r#"
            SELECT id, member_id, transaction_id, payment_date, due_date,
                   COALESCE(status, 'paid') AS status
            FROM member_payments
            WHERE id = ?
            "#,
        )
        .bind(payment_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|r| payment_from_row(&r)).transpose()
    }

    pub async fn get_transaction(&self, transaction_id: i64) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, transaction_type, CAST(amount AS REAL) AS amount, description,
                   COALESCE(payment_date, '') AS payment_date, created_by
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => {
                let transaction_type: String = r.get("transaction_type");
                Ok(Some(Transaction {
                    id: r.get("id"),
                    transaction_type: transaction_type.parse()?,
                    amount: r.get("amount"),
                    description: r.get("description"),
                    payment_date: r.get("payment_date"),
                    created_by: r.get("created_by"),
                }))
            }
            None => Ok(None),
        }
    }

    /// Edit a payment's transaction and status together. Returns false when
    /// the payment does not exist.
    pub async fn update_payment(
        &self,
        payment_id: i64,
        amount: f64,
        description: &str,
        status: PaymentStatus,
    ) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let transaction_id: Option<i64> =
            sqlx::query_scalar("SELECT transaction_id FROM member_payments WHERE id = ?")
                .bind(payment_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(transaction_id) = transaction_id else {
            return Ok(false);
        };

        sqlx::query("UPDATE transactions SET amount = ?, description = ? WHERE id = ?")
            .bind(amount)
            .bind(description)
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE member_payments SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Remove a payment and its transaction. Returns false when the payment
    /// does not exist.
    pub async fn delete_payment(&self, payment_id: i64) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let transaction_id: Option<i64> =
            sqlx::query_scalar("SELECT transaction_id FROM member_payments WHERE id = ?")
                .bind(payment_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(transaction_id) = transaction_id else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM member_payments WHERE id = ?")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

/// Insert a transaction inside an open store transaction, returning its id
pub async fn insert_transaction(conn: &mut SqliteConnection, new: &NewTransaction<'_>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO transactions (transaction_type, amount, description, payment_date, created_by)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.transaction_type.as_str())
    .bind(new.amount)
    .bind(new.description)
    .bind(new.payment_date)
    .bind(new.created_by)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Insert a member payment inside an open store transaction, returning its id
pub async fn insert_member_payment(
    conn: &mut SqliteConnection,
    new: &NewMemberPayment<'_>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO member_payments (member_id, transaction_id, payment_date, due_date, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.member_id)
    .bind(new.transaction_id)
    .bind(new.payment_date)
    .bind(new.due_date)
    .bind(new.status.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

fn listing_from_row(row: &SqliteRow) -> Result<PaymentListing> {
    let transaction_type: String = row.get("transaction_type");
    let status: String = row.get("status");
    Ok(PaymentListing {
        payment_id: row.get("payment_id"),
        transaction_id: row.get("transaction_id"),
        member_id: row.get("member_id"),
        member_name: row.get("member_name"),
        member_family: row.get("member_family"),
        amount: row.get("amount"),
        description: row.get("description"),
        transaction_type: transaction_type.parse()?,
        transaction_date: row.get("transaction_date"),
        payment_date: row.get("payment_date"),
        due_date: row.get("due_date"),
        status: status.parse()?,
    })
}

fn payment_from_row(row: &SqliteRow) -> Result<MemberPayment> {
    let status: String = row.get("status");
    Ok(MemberPayment {
        id: row.get("id"),
        member_id: row.get("member_id"),
        transaction_id: row.get("transaction_id"),
        payment_date: row.get("payment_date"),
        due_date: row.get("due_date"),
        status: status.parse()?,
    })
}
