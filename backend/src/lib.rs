//! # Gym Ledger
//!
//! Membership and billing ledger for a single-site gym.
//!
//! The crate is layered the usual way:
//! ```text
//! Presentation (not part of this crate)
//!     ↓
//! Domain (services, calendar conversion)
//!     ↓
//! Storage (SQLite pool, schema, repositories)
//! ```
//!
//! [`initialize_backend`] opens the store, brings its schema up to date and
//! hands back a [`GymLedger`] holding every service. There is no global
//! state; callers keep the value and clone services out of it as needed.

pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

use anyhow::Result;
use tracing::info;

pub use config::LedgerConfig;
pub use domain::*;
pub use error::{LedgerError, LedgerResult};
pub use storage::DbConnection;

/// Every service of the ledger, sharing one connection pool
#[derive(Clone)]
pub struct GymLedger {
    pub db: DbConnection,
    pub members: MemberService,
    pub ledger: LedgerService,
    pub settings: SettingsService,
    pub dashboard: DashboardService,
    pub users: UserService,
    pub config: LedgerConfig,
}

impl GymLedger {
    /// Compose the services over an already opened store
    pub fn new(db: DbConnection, config: LedgerConfig) -> Self {
        Self {
            members: MemberService::new(db.clone(), config.default_membership_days),
            ledger: LedgerService::new(db.clone()),
            settings: SettingsService::new(db.clone()),
            dashboard: DashboardService::new(db.clone()),
            users: UserService::new(db.clone()),
            db,
            config,
        }
    }

    /// Members expiring within the configured threshold
    pub async fn expiring_soon(&self) -> LedgerResult<Vec<shared::ExpiringMember>> {
        self.members
            .expiring_members(self.config.expiring_threshold_days)
            .await
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &LedgerConfig) -> Result<GymLedger> {
    info!(database_url = %config.database_url, "Setting up database");
    let db = DbConnection::init(config).await?;

    info!("Setting up services");
    Ok(GymLedger::new(db, config.clone()))
}
