//! # Storage Module
//!
//! SQLite persistence for the ledger.
//!
//! - **connection.rs** - pool ownership and test databases
//! - **schema.rs** - table creation, column migrations and first-run seeding
//! - **repositories/** - raw SQL for members, the ledger, settings and users
//!
//! Repositories speak `anyhow::Result`; the domain services translate those
//! failures into `LedgerError`.

pub mod connection;
pub mod repositories;
pub mod schema;

// Re-export the main types that other modules need
pub use connection::DbConnection;
pub use repositories::{LedgerRepository, MemberRepository, SettingsRepository, UserRepository};
