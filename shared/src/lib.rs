use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical storage format for every persisted date
pub const GREGORIAN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Gender of a member. Doubles as the shift tag used for occupancy reporting:
/// the women's shift runs in the morning, the men's shift in the afternoon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
}

impl Gender {
    /// Value stored in the `members.gender` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
        }
    }

    /// Persian label shown on the registration form
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Men => "مرد",
            Gender::Women => "زن",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "men" | "مرد" => Ok(Gender::Men),
            "women" | "زن" => Ok(Gender::Women),
            other => Err(ParseEnumError::new("gender", other)),
        }
    }
}

/// Represents a registered gym member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Membership number, assigned by the front desk
    pub id: String,
    pub name: String,
    pub family: String,
    pub gender: Gender,
    pub phone: Option<String>,
    /// Gregorian date (YYYY-MM-DD) of first registration
    pub join_date: String,
    /// Gregorian date (YYYY-MM-DD) the current paid-up window began
    pub start_date: Option<String>,
    /// Gregorian date (YYYY-MM-DD) the current paid-up window ends.
    /// Only legacy rows lack it.
    pub end_date: Option<String>,
    pub created_at: String,
}

impl Member {
    /// Whole days from `today` until `end_date`; negative once expired
    pub fn remaining_days_on(&self, today: NaiveDate) -> Option<i64> {
        let end_date = parse_gregorian(self.end_date.as_deref()?)?;
        Some((end_date - today).num_days())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.family)
    }
}

/// A member row as rendered in the member list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberListEntry {
    #[serde(flatten)]
    pub member: Member,
    pub remaining_days: Option<i64>,
}

/// A member whose paid-up window closes soon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringMember {
    pub id: String,
    pub name: String,
    pub family: String,
    pub end_date: String,
    pub remaining_days: i64,
}

/// Request for registering a new member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMemberRequest {
    pub id: String,
    pub name: String,
    pub family: String,
    /// "men"/"women" or the Persian form labels
    pub gender: String,
    pub phone: Option<String>,
    /// Jalali date (YYYY/MM/DD); today when omitted
    pub join_date: Option<String>,
    /// Length of the first paid-up window; the configured default when omitted or zero
    pub membership_days: Option<u32>,
}

/// Request for editing a member's contact details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: String,
    pub family: String,
    pub phone: Option<String>,
}

/// Kind of financial event recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Membership,
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Membership => "membership",
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "membership" => Ok(TransactionType::Membership),
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(ParseEnumError::new("transaction type", other)),
        }
    }
}

/// A single financial event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub transaction_type: TransactionType,
    /// Whole currency units (Tomans)
    pub amount: f64,
    pub description: Option<String>,
    pub payment_date: String,
    /// User who recorded the event, if known
    pub created_by: Option<i64>,
}

/// Settlement state of a member payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(PaymentStatus::Paid),
            "pending" => Ok(PaymentStatus::Pending),
            "overdue" => Ok(PaymentStatus::Overdue),
            other => Err(ParseEnumError::new("payment status", other)),
        }
    }
}

/// Links a member to the transaction that paid for a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPayment {
    pub id: i64,
    pub member_id: String,
    pub transaction_id: i64,
    pub payment_date: String,
    pub due_date: String,
    pub status: PaymentStatus,
}

/// A payment joined with its transaction and member, as shown on payment cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentListing {
    pub payment_id: i64,
    pub transaction_id: i64,
    pub member_id: String,
    pub member_name: String,
    pub member_family: String,
    pub amount: f64,
    pub description: Option<String>,
    pub transaction_type: TransactionType,
    pub transaction_date: String,
    pub payment_date: String,
    pub due_date: String,
    pub status: PaymentStatus,
}

/// Filters for the payment list. All supplied filters must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentFilter {
    /// Substring of member name, family or id
    pub text: Option<String>,
    pub status: Option<PaymentStatus>,
    /// Inclusive lower bound on the payment date
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the payment date
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentListing>,
    /// Sum of every membership transaction ever recorded
    pub total_income: f64,
    /// Sum of membership transactions in the current calendar month
    pub monthly_income: f64,
}

/// Request for recording an ad-hoc payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub member_id: String,
    /// Raw amount as typed by the operator
    pub amount: String,
    pub description: Option<String>,
    /// Jalali date (YYYY/MM/DD); today when omitted
    pub payment_date: Option<String>,
}

/// Request for editing a recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePaymentRequest {
    pub payment_id: i64,
    /// Raw amount as typed by the operator
    pub amount: String,
    pub description: String,
    pub status: PaymentStatus,
}

/// Result of a membership renewal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalReceipt {
    pub new_end_date: String,
    pub transaction_id: i64,
    pub payment_id: i64,
}

/// Result of recording a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub transaction_id: i64,
    pub payment_id: i64,
    pub due_date: String,
}

/// The staff member performing a ledger write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAttribution {
    pub user_id: Option<i64>,
    pub display_name: String,
}

/// Summary counters for the dashboard cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_active: i64,
    pub shift_count: i64,
    pub expiring_count: i64,
    pub recent_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Staff => "staff",
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "staff" => Ok(UserRole::Staff),
            other => Err(ParseEnumError::new("user role", other)),
        }
    }
}

/// A staff account. The password hash never leaves the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: UserRole,
}

/// Parse a Gregorian `Y-M-D` date, padded or not, ignoring any time-of-day
/// suffix after a space or `T`
pub fn parse_gregorian(value: &str) -> Option<NaiveDate> {
    let date_part = value
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()?;
    NaiveDate::parse_from_str(date_part, GREGORIAN_DATE_FORMAT).ok()
}

/// Format a date in the canonical storage format
pub fn format_gregorian(date: NaiveDate) -> String {
    date.format(GREGORIAN_DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}
