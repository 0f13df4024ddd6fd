//! # Domain Module
//!
//! Business rules of the gym ledger, independent of how results are shown.
//!
//! ## Module Organization
//!
//! - **calendar**: Gregorian/Jalali conversion and long-form date display
//! - **member_service**: registration, edits, deletion and member reports
//! - **ledger_service**: renewals, payments and the payment list
//! - **settings_service**: the monthly fee and other settings
//! - **dashboard_service**: dashboard counters and shift selection
//! - **user_service**: staff accounts and password hashing
//!
//! ## Business Rules
//!
//! - Dates are stored as Gregorian `YYYY-MM-DD` and shown in the Jalali calendar
//! - A member's paid-up window runs from `start_date` to `end_date`
//! - Only a renewal moves `end_date`, and always by 30 days from the stored value
//! - Every payment is a `transactions` row plus a `member_payments` row, written together
//! - Amounts are non-negative

pub mod calendar;
pub mod dashboard_service;
pub mod ledger_service;
pub mod member_service;
pub mod settings_service;
pub mod user_service;

pub use dashboard_service::{shift_for_hour, DashboardService};
pub use ledger_service::LedgerService;
pub use member_service::MemberService;
pub use settings_service::SettingsService;
pub use user_service::UserService;
