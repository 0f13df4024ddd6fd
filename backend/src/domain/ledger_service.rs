//! # Ledger Service
//!
//! Renewals, ad-hoc payments and the payment list.
//!
//! A renewal is one store transaction: it reads the member's current
//! `end_date`, writes a `membership` transaction and the matching member
//! payment, then moves `end_date`. If any step fails nothing is kept.
//!
//! The new window is measured from the stored `end_date`, past or future.
//! Only members with no end date at all start from today.

use anyhow::anyhow;
use chrono::{Days, Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::domain::calendar;
use crate::domain::settings_service::monthly_fee_from;
use crate::error::{parse_amount, validate_amount, LedgerError, LedgerResult};
use crate::storage::repositories::ledger_repository::{
    insert_member_payment, insert_transaction, NewMemberPayment, NewTransaction,
};
use crate::storage::repositories::member_repository::{fetch_member, set_end_date};
use crate::storage::repositories::settings_repository::{fetch_setting, MONTHLY_FEE_KEY};
use crate::storage::{DbConnection, LedgerRepository};
use shared::{
    format_gregorian, parse_gregorian, AdminAttribution, PaymentFilter, PaymentListResponse,
    PaymentListing, PaymentReceipt, PaymentStatus, RecordPaymentRequest, RenewalReceipt,
    TransactionType, UpdatePaymentRequest,
};

/// Length of the window a renewal adds
pub const RENEWAL_DAYS: u64 = 30;

/// Days between a recorded payment and its due date
pub const PAYMENT_DUE_DAYS: u64 = 30;

/// Service for the money side of memberships
#[derive(Clone)]
pub struct LedgerService {
    db: DbConnection,
    repository: LedgerRepository,
}

impl LedgerService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: LedgerRepository::new(db.clone()),
            db,
        }
    }

    /// Extend a member's window by [`RENEWAL_DAYS`] and record the fee.
    /// `fee_override` replaces the configured monthly fee for this renewal.
    pub async fn renew_membership(
        &self,
        member_id: &str,
        fee_override: Option<f64>,
        attribution: &AdminAttribution,
    ) -> LedgerResult<RenewalReceipt> {
        self.renew_membership_on(member_id, fee_override, attribution, today())
            .await
    }

    pub async fn renew_membership_on(
        &self,
        member_id: &str,
        fee_override: Option<f64>,
        attribution: &AdminAttribution,
        today: NaiveDate,
    ) -> LedgerResult<RenewalReceipt> {
        let fee_override = fee_override.map(validate_amount).transpose()?;

        let mut tx = self.db.pool().begin().await?;

        let member = fetch_member(&mut *tx, member_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("member {}", member_id)))?;

        let amount = match fee_override {
            Some(fee) => fee,
            None => monthly_fee_from(fetch_setting(&mut *tx, MONTHLY_FEE_KEY).await) as f64,
        };

        let baseline = match member.end_date.as_deref().map(str::trim) {
            Some(stored) if !stored.is_empty() => parse_gregorian(stored).ok_or_else(|| {
                LedgerError::StorageFailure(anyhow!(
                    "member {} has an unreadable end_date '{}'",
                    member_id,
                    stored
                ))
            })?,
            _ => today,
        };
        let new_end_date = add_days(baseline, RENEWAL_DAYS)?;
        let new_end_date = format_gregorian(new_end_date);
        let payment_date = format_gregorian(today);

        let mut description = format!("تمدید عضویت {} {}", member.name, member.family);
        if !attribution.display_name.is_empty() {
            description.push_str(&format!(" توسط {}", attribution.display_name));
        }

        let transaction_id = insert_transaction(
            &mut *tx,
            &NewTransaction {
                transaction_type: TransactionType::Membership,
                amount,
                description: &description,
                payment_date: &payment_date,
                created_by: attribution.user_id,
            },
        )
        .await?;

        let payment_id = insert_member_payment(
            &mut *tx,
            &NewMemberPayment {
                member_id,
                transaction_id,
                payment_date: &payment_date,
                due_date: &new_end_date,
                status: PaymentStatus::Paid,
            },
        )
        .await?;

        set_end_date(&mut *tx, member_id, &new_end_date).await?;

        tx.commit().await?;

        info!(
            member_id,
            previous_end_date = ?member.end_date,
            new_end_date = %new_end_date,
            amount,
            "Renewed membership"
        );

        Ok(RenewalReceipt {
            new_end_date,
            transaction_id,
            payment_id,
        })
    }

    /// Record a payment without moving the member's window
    pub async fn record_payment(
        &self,
        request: RecordPaymentRequest,
        attribution: &AdminAttribution,
    ) -> LedgerResult<PaymentReceipt> {
        self.record_payment_on(request, attribution, today()).await
    }

    pub async fn record_payment_on(
        &self,
        request: RecordPaymentRequest,
        attribution: &AdminAttribution,
        today: NaiveDate,
    ) -> LedgerResult<PaymentReceipt> {
        let amount = parse_amount(&request.amount)?;
        let payment_date = match request.payment_date.as_deref().map(str::trim) {
            Some(local) if !local.is_empty() => calendar::local_to_naive(local)?,
            _ => today,
        };
        let due_date = format_gregorian(add_days(payment_date, PAYMENT_DUE_DAYS)?);
        let payment_date = format_gregorian(payment_date);
        let member_id = request.member_id.trim();

        let mut tx = self.db.pool().begin().await?;

        let member = fetch_member(&mut *tx, member_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("member {}", member_id)))?;

        let description = match request.description.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => format!("پرداخت عضویت {} {}", member.name, member.family),
        };
        let description = with_receipt_note(description, attribution);

        let transaction_id = insert_transaction(
            &mut *tx,
            &NewTransaction {
                transaction_type: TransactionType::Membership,
                amount,
                description: &description,
                payment_date: &payment_date,
                created_by: attribution.user_id,
            },
        )
        .await?;

        let payment_id = insert_member_payment(
            &mut *tx,
            &NewMemberPayment {
                member_id,
                transaction_id,
                payment_date: &payment_date,
                due_date: &due_date,
                status: PaymentStatus::Paid,
            },
        )
        .await?;

        tx.commit().await?;

        info!(member_id, payment_id, amount, due_date = %due_date, "Recorded payment");

        Ok(PaymentReceipt {
            transaction_id,
            payment_id,
            due_date,
        })
    }

    /// Edit a payment's amount, description and status
    pub async fn update_payment(
        &self,
        request: UpdatePaymentRequest,
        attribution: &AdminAttribution,
    ) -> LedgerResult<()> {
        let amount = parse_amount(&request.amount)?;
        let description = with_receipt_note(request.description.trim().to_string(), attribution);

        let updated = self
            .repository
            .update_payment(request.payment_id, amount, &description, request.status)
            .await?;
        if !updated {
            warn!(payment_id = request.payment_id, "Update for unknown payment");
            return Err(LedgerError::NotFound(format!("payment {}", request.payment_id)));
        }

        info!(payment_id = request.payment_id, amount, status = %request.status, "Updated payment");
        Ok(())
    }

    /// Remove a payment together with its transaction
    pub async fn delete_payment(&self, payment_id: i64) -> LedgerResult<()> {
        if !self.repository.delete_payment(payment_id).await? {
            warn!(payment_id, "Delete for unknown payment");
            return Err(LedgerError::NotFound(format!("payment {}", payment_id)));
        }
        info!(payment_id, "Deleted payment");
        Ok(())
    }

    /// Filtered payment list with all-time and current-month income
    pub async fn list_payments(&self, filter: &PaymentFilter) -> LedgerResult<PaymentListResponse> {
        self.list_payments_on(filter, today()).await
    }

    pub async fn list_payments_on(
        &self,
        filter: &PaymentFilter,
        today: NaiveDate,
    ) -> LedgerResult<PaymentListResponse> {
        let payments = self.repository.list_payments(filter).await?;
        let total_income = self.repository.total_income().await?;
        let monthly_income = self
            .repository
            .income_for_month(&today.format("%Y-%m").to_string())
            .await?;

        debug!(count = payments.len(), total_income, monthly_income, "Listed payments");

        Ok(PaymentListResponse {
            payments,
            total_income,
            monthly_income,
        })
    }

    /// A member's payments, newest first
    pub async fn member_payments(&self, member_id: &str) -> LedgerResult<Vec<PaymentListing>> {
        Ok(self.repository.member_payments(member_id).await?)
    }

    pub async fn last_payment(&self, member_id: &str) -> LedgerResult<Option<PaymentListing>> {
        let payments = self.repository.member_payments(member_id).await?;
        Ok(payments.into_iter().next())
    }

    /// Payments dated within `[from, to]`, oldest first
    pub async fn payments_between(&self, from: NaiveDate, to: NaiveDate) -> LedgerResult<Vec<PaymentListing>> {
        if from > to {
            return Err(LedgerError::Validation(format!(
                "Date range starts after it ends: {} > {}",
                from, to
            )));
        }
        Ok(self.repository.payments_between(from, to).await?)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn add_days(date: NaiveDate, days: u64) -> LedgerResult<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| LedgerError::InvalidDate(format!("{} + {} days", date, days)))
}

/// Append who received the money, once
fn with_receipt_note(mut description: String, attribution: &AdminAttribution) -> String {
    if attribution.display_name.is_empty() {
        return description;
    }
    let note = format!(" (دریافت توسط: {})", attribution.display_name);
    if !description.contains(&note) {
        description.push_str(&note);
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::member_service::MemberService;
    use shared::{CreateMemberRequest, Member};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn admin() -> AdminAttribution {
        AdminAttribution {
            user_id: None,
            display_name: "مدیر".to_string(),
        }
    }

    struct Fixture {
        db: DbConnection,
        members: MemberService,
        ledger: LedgerService,
    }

    async fn setup_test() -> Fixture {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        Fixture {
            members: MemberService::new(db.clone(), 30),
            ledger: LedgerService::new(db.clone()),
            db,
        }
    }

    async fn register(fixture: &Fixture, id: &str, registered_on: NaiveDate) -> Member {
        let request = CreateMemberRequest {
            id: id.to_string(),
            name: "Ali".to_string(),
            family: "Rezaei".to_string(),
            gender: "men".to_string(),
            phone: None,
            join_date: None,
            membership_days: None,
        };
        fixture.members.add_member_on(request, registered_on).await.unwrap()
    }

    async fn count(db: &DbConnection, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    fn payment_request(member_id: &str, amount: &str) -> RecordPaymentRequest {
        RecordPaymentRequest {
            member_id: member_id.to_string(),
            amount: amount.to_string(),
            description: None,
            payment_date: None,
        }
    }

    #[tokio::test]
    async fn test_renewal_extends_future_end_date() {
        let f = setup_test().await;
        let today = date(2024, 5, 1);
        // Ends ten days from today
        register(&f, "1001", date(2024, 4, 11)).await;

        let receipt = f.ledger.renew_membership_on("1001", None, &admin(), today).await.unwrap();

        assert_eq!(receipt.new_end_date, "2024-06-10");
        let member = f.members.get_member("1001").await.unwrap().unwrap();
        assert_eq!(member.end_date.as_deref(), Some("2024-06-10"));
    }

    #[tokio::test]
    async fn test_renewal_extends_lapsed_end_date() {
        let f = setup_test().await;
        let today = date(2024, 5, 1);
        // Lapsed ten days ago
        register(&f, "1002", date(2024, 3, 22)).await;

        let receipt = f.ledger.renew_membership_on("1002", None, &admin(), today).await.unwrap();

        assert_eq!(receipt.new_end_date, "2024-05-21");
    }

    #[tokio::test]
    async fn test_renewal_without_end_date_starts_today() {
        let f = setup_test().await;
        sqlx::query("INSERT INTO members (id, name, family, gender) VALUES ('old', 'Old', 'Row', 'men')")
            .execute(f.db.pool())
            .await
            .unwrap();

        let receipt = f
            .ledger
            .renew_membership_on("old", None, &admin(), date(2024, 5, 1))
            .await
            .unwrap();
        assert_eq!(receipt.new_end_date, "2024-05-31");
    }

    #[tokio::test]
    async fn test_renewal_reads_unpadded_end_date() {
        let f = setup_test().await;
        sqlx::query(
            r#"
            INSERT INTO members (id, name, family, gender, start_date, end_date)
            VALUES ('short', 'Old', 'Row', 'men', '2024-5-11', '2024-6-10')
            "#,
        )
        .execute(f.db.pool())
        .await
        .unwrap();

        let receipt = f
            .ledger
            .renew_membership_on("short", None, &admin(), date(2024, 5, 1))
            .await
            .unwrap();
        assert_eq!(receipt.new_end_date, "2024-07-10");
    }

    #[tokio::test]
    async fn test_renewal_refuses_unreadable_end_date() {
        let f = setup_test().await;
        sqlx::query(
            r#"
            INSERT INTO members (id, name, family, gender, end_date)
            VALUES ('broken', 'Old', 'Row', 'men', '10/06/2024')
            "#,
        )
        .execute(f.db.pool())
        .await
        .unwrap();

        let err = f
            .ledger
            .renew_membership_on("broken", None, &admin(), date(2024, 5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StorageFailure(_)));

        assert_eq!(count(&f.db, "transactions").await, 0);
        let end_date: Option<String> =
            sqlx::query_scalar("SELECT end_date FROM members WHERE id = 'broken'")
                .fetch_one(f.db.pool())
                .await
                .unwrap();
        assert_eq!(end_date.as_deref(), Some("10/06/2024"));
    }

    #[tokio::test]
    async fn test_renewal_records_fee_and_payment() {
        let f = setup_test().await;
        let today = date(2024, 5, 1);
        register(&f, "1003", date(2024, 4, 11)).await;

        let receipt = f.ledger.renew_membership_on("1003", None, &admin(), today).await.unwrap();

        let transaction = f
            .ledger
            .repository
            .get_transaction(receipt.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transaction.transaction_type, TransactionType::Membership);
        assert_eq!(transaction.amount, 500000.0);
        assert_eq!(
            transaction.description.as_deref(),
            Some("تمدید عضویت Ali Rezaei توسط مدیر")
        );
        assert_eq!(transaction.payment_date, "2024-05-01");

        let payment = f.ledger.repository.get_payment(receipt.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.member_id, "1003");
        assert_eq!(payment.transaction_id, receipt.transaction_id);
        assert_eq!(payment.payment_date, "2024-05-01");
        assert_eq!(payment.due_date, receipt.new_end_date);
        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_renewal_fee_override() {
        let f = setup_test().await;
        register(&f, "1004", date(2024, 4, 1)).await;

        let receipt = f
            .ledger
            .renew_membership_on("1004", Some(350000.0), &admin(), date(2024, 4, 20))
            .await
            .unwrap();
        let transaction = f
            .ledger
            .repository
            .get_transaction(receipt.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transaction.amount, 350000.0);

        let err = f
            .ledger
            .renew_membership_on("1004", Some(-1.0), &admin(), date(2024, 4, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(count(&f.db, "transactions").await, 1);
    }

    #[tokio::test]
    async fn test_renewal_of_unknown_member() {
        let f = setup_test().await;

        let err = f.ledger.renew_membership("ghost", None, &admin()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(count(&f.db, "transactions").await, 0);
    }

    #[tokio::test]
    async fn test_renewal_uses_fee_stored_at_renewal_time() {
        let f = setup_test().await;
        register(&f, "1006", date(2024, 4, 11)).await;
        crate::domain::SettingsService::new(f.db.clone())
            .set_monthly_fee(650000)
            .await
            .unwrap();

        let receipt = f
            .ledger
            .renew_membership_on("1006", None, &admin(), date(2024, 5, 1))
            .await
            .unwrap();
        let amount: f64 = sqlx::query_scalar("SELECT CAST(amount AS REAL) FROM transactions WHERE id = ?")
            .bind(receipt.transaction_id)
            .fetch_one(f.db.pool())
            .await
            .unwrap();
        assert_eq!(amount, 650000.0);

        sqlx::query("DROP TABLE settings").execute(f.db.pool()).await.unwrap();
        let err = f
            .ledger
            .renew_membership_on("ghost", None, &admin(), date(2024, 5, 1))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_renewal_rolls_back_everything() {
        let f = setup_test().await;
        let before = register(&f, "1005", date(2024, 4, 11)).await;

        sqlx::query(
            r#"
            CREATE TRIGGER fail_member_payments BEFORE INSERT ON member_payments
            BEGIN
                SELECT RAISE(ABORT, 'forced failure');
            END;
            "#,
        )
        .execute(f.db.pool())
        .await
        .unwrap();

        let err = f
            .ledger
            .renew_membership_on("1005", None, &admin(), date(2024, 5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StorageFailure(_)));

        assert_eq!(count(&f.db, "transactions").await, 0);
        assert_eq!(count(&f.db, "member_payments").await, 0);
        let after = f.members.get_member("1005").await.unwrap().unwrap();
        assert_eq!(after.end_date, before.end_date);
    }

    #[tokio::test]
    async fn test_record_payment() {
        let f = setup_test().await;
        let before = register(&f, "1006", date(2024, 1, 1)).await;

        let mut request = payment_request("1006", "450,000");
        request.payment_date = Some("1402/10/20".to_string());
        let receipt = f.ledger.record_payment_on(request, &admin(), date(2024, 2, 1)).await.unwrap();

        // 1402/10/20 is 2024-01-10
        assert_eq!(receipt.due_date, "2024-02-09");

        let payment = f.ledger.repository.get_payment(receipt.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.payment_date, "2024-01-10");

        let transaction = f
            .ledger
            .repository
            .get_transaction(receipt.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transaction.amount, 450000.0);
        assert_eq!(
            transaction.description.as_deref(),
            Some("پرداخت عضویت Ali Rezaei (دریافت توسط: مدیر)")
        );

        // Recording a payment never moves the window
        let after = f.members.get_member("1006").await.unwrap().unwrap();
        assert_eq!(after.end_date, before.end_date);
    }

    #[tokio::test]
    async fn test_record_payment_keeps_existing_receipt_note() {
        let f = setup_test().await;
        register(&f, "1007", date(2024, 1, 1)).await;

        let mut request = payment_request("1007", "100000");
        request.description = Some("قسط دوم (دریافت توسط: مدیر)".to_string());
        let receipt = f.ledger.record_payment_on(request, &admin(), date(2024, 1, 5)).await.unwrap();

        let transaction = f
            .ledger
            .repository
            .get_transaction(receipt.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transaction.description.as_deref(), Some("قسط دوم (دریافت توسط: مدیر)"));
        assert_eq!(receipt.due_date, "2024-02-04");
    }

    #[tokio::test]
    async fn test_record_payment_validation_writes_nothing() {
        let f = setup_test().await;
        register(&f, "1008", date(2024, 1, 1)).await;

        let err = f
            .ledger
            .record_payment(payment_request("1008", "abc"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = f
            .ledger
            .record_payment(payment_request("1008", "-5"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let mut request = payment_request("1008", "1000");
        request.payment_date = Some("1402/07/31".to_string());
        let err = f.ledger.record_payment(request, &admin()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDate(_)));

        let err = f
            .ledger
            .record_payment(payment_request("ghost", "1000"), &admin())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(count(&f.db, "transactions").await, 0);
        assert_eq!(count(&f.db, "member_payments").await, 0);
    }

    #[tokio::test]
    async fn test_update_payment() {
        let f = setup_test().await;
        register(&f, "1009", date(2024, 1, 1)).await;
        let receipt = f
            .ledger
            .record_payment_on(payment_request("1009", "500000"), &admin(), date(2024, 1, 2))
            .await
            .unwrap();

        f.ledger
            .update_payment(
                UpdatePaymentRequest {
                    payment_id: receipt.payment_id,
                    amount: "300000".to_string(),
                    description: "تخفیف".to_string(),
                    status: PaymentStatus::Pending,
                },
                &admin(),
            )
            .await
            .unwrap();

        let transaction = f
            .ledger
            .repository
            .get_transaction(receipt.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transaction.amount, 300000.0);
        assert_eq!(transaction.description.as_deref(), Some("تخفیف (دریافت توسط: مدیر)"));
        let payment = f.ledger.repository.get_payment(receipt.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        // A bad amount leaves the row alone
        let err = f
            .ledger
            .update_payment(
                UpdatePaymentRequest {
                    payment_id: receipt.payment_id,
                    amount: "lots".to_string(),
                    description: "x".to_string(),
                    status: PaymentStatus::Overdue,
                },
                &admin(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        let payment = f.ledger.repository.get_payment(receipt.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        let err = f
            .ledger
            .update_payment(
                UpdatePaymentRequest {
                    payment_id: 9999,
                    amount: "1".to_string(),
                    description: String::new(),
                    status: PaymentStatus::Paid,
                },
                &admin(),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_payment_removes_its_transaction() {
        let f = setup_test().await;
        register(&f, "1010", date(2024, 1, 1)).await;
        let first = f
            .ledger
            .record_payment_on(payment_request("1010", "1000"), &admin(), date(2024, 1, 2))
            .await
            .unwrap();
        f.ledger
            .record_payment_on(payment_request("1010", "2000"), &admin(), date(2024, 1, 3))
            .await
            .unwrap();

        f.ledger.delete_payment(first.payment_id).await.unwrap();

        assert_eq!(count(&f.db, "member_payments").await, 1);
        assert_eq!(count(&f.db, "transactions").await, 1);
        assert!(f.ledger.repository.get_transaction(first.transaction_id).await.unwrap().is_none());
        assert!(f.ledger.delete_payment(first.payment_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_payments_filters_and_totals() {
        let f = setup_test().await;
        register(&f, "1011", date(2024, 1, 1)).await;
        let maryam = CreateMemberRequest {
            id: "2022".to_string(),
            name: "Maryam".to_string(),
            family: "Kazemi".to_string(),
            gender: "women".to_string(),
            phone: None,
            join_date: None,
            membership_days: None,
        };
        f.members.add_member_on(maryam, date(2024, 1, 1)).await.unwrap();

        f.ledger
            .record_payment_on(payment_request("1011", "100000"), &admin(), date(2024, 1, 10))
            .await
            .unwrap();
        f.ledger
            .record_payment_on(payment_request("2022", "200000"), &admin(), date(2024, 2, 5))
            .await
            .unwrap();
        let late = f
            .ledger
            .record_payment_on(payment_request("2022", "300000"), &admin(), date(2024, 2, 20))
            .await
            .unwrap();
        f.ledger
            .update_payment(
                UpdatePaymentRequest {
                    payment_id: late.payment_id,
                    amount: "300000".to_string(),
                    description: String::new(),
                    status: PaymentStatus::Overdue,
                },
                &admin(),
            )
            .await
            .unwrap();

        let today = date(2024, 2, 25);
        let all = f.ledger.list_payments_on(&PaymentFilter::default(), today).await.unwrap();
        let dates: Vec<&str> = all.payments.iter().map(|p| p.payment_date.as_str()).collect();
        assert_eq!(dates, vec!["2024-02-20", "2024-02-05", "2024-01-10"]);
        assert_eq!(all.total_income, 600000.0);
        assert_eq!(all.monthly_income, 500000.0);

        let by_text = PaymentFilter {
            text: Some("Kaz".to_string()),
            ..Default::default()
        };
        assert_eq!(f.ledger.list_payments_on(&by_text, today).await.unwrap().payments.len(), 2);

        let combined = PaymentFilter {
            text: Some("Maryam".to_string()),
            status: Some(PaymentStatus::Paid),
            date_from: Some(date(2024, 2, 1)),
            date_to: Some(date(2024, 2, 28)),
        };
        let listed = f.ledger.list_payments_on(&combined, today).await.unwrap();
        assert_eq!(listed.payments.len(), 1);
        assert_eq!(listed.payments[0].amount, 200000.0);
        assert_eq!(listed.payments[0].member_family, "Kazemi");

        let january = PaymentFilter {
            date_to: Some(date(2024, 1, 31)),
            ..Default::default()
        };
        let listed = f.ledger.list_payments_on(&january, today).await.unwrap();
        assert_eq!(listed.payments.len(), 1);
        assert_eq!(listed.payments[0].member_id, "1011");
        // Totals ignore the filter
        assert_eq!(listed.total_income, 600000.0);
    }

    #[tokio::test]
    async fn test_member_history_and_range() {
        let f = setup_test().await;
        register(&f, "1012", date(2024, 1, 1)).await;
        assert!(f.ledger.last_payment("1012").await.unwrap().is_none());

        for (amount, day) in [("1000", 3), ("2000", 9), ("3000", 15)] {
            f.ledger
                .record_payment_on(payment_request("1012", amount), &admin(), date(2024, 1, day))
                .await
                .unwrap();
        }

        let history = f.ledger.member_payments("1012").await.unwrap();
        assert_eq!(history.len(), 3);
        let last = f.ledger.last_payment("1012").await.unwrap().unwrap();
        assert_eq!(last.payment_date, "2024-01-15");
        assert_eq!(last.amount, 3000.0);

        let range = f
            .ledger
            .payments_between(date(2024, 1, 3), date(2024, 1, 9))
            .await
            .unwrap();
        let amounts: Vec<f64> = range.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![1000.0, 2000.0]);

        assert!(matches!(
            f.ledger.payments_between(date(2024, 2, 1), date(2024, 1, 1)).await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_receipt_note_is_added_once() {
        let attribution = admin();
        let once = with_receipt_note("x".to_string(), &attribution);
        assert_eq!(once, "x (دریافت توسط: مدیر)");
        assert_eq!(with_receipt_note(once.clone(), &attribution), once);

        let anonymous = AdminAttribution {
            user_id: None,
            display_name: String::new(),
        };
        assert_eq!(with_receipt_note("x".to_string(), &anonymous), "x");
    }
}
