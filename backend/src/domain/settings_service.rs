use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::storage::repositories::settings_repository::MONTHLY_FEE_KEY;
use crate::storage::{DbConnection, SettingsRepository};

/// Service for system-wide settings
#[derive(Clone)]
pub struct SettingsService {
    repository: SettingsRepository,
}

impl SettingsService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: SettingsRepository::new(db),
        }
    }

    /// Current monthly fee. A missing, non-numeric or unreadable value is 0.
    pub async fn get_monthly_fee(&self) -> i64 {
        monthly_fee_from(self.repository.get_setting(MONTHLY_FEE_KEY).await)
    }

    pub async fn set_monthly_fee(&self, fee: i64) -> LedgerResult<()> {
        if fee < 0 {
            return Err(LedgerError::InvalidAmount(fee.to_string()));
        }
        self.repository
            .set_setting(MONTHLY_FEE_KEY, &fee.to_string())
            .await?;
        info!(fee, "Updated monthly fee");
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> LedgerResult<Option<String>> {
        Ok(self.repository.get_setting(key).await?)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> LedgerResult<()> {
        if key.trim().is_empty() {
            return Err(LedgerError::Validation("Setting key cannot be empty".to_string()));
        }
        self.repository.set_setting(key, value).await?;
        Ok(())
    }
}

/// Interpret a monthly fee read. Never fails; anything unusable is 0.
pub(crate) fn monthly_fee_from(read: anyhow::Result<Option<String>>) -> i64 {
    match read {
        Ok(Some(value)) => parse_fee(&value).unwrap_or_else(|| {
            warn!(value = %value, "Stored monthly fee is not a whole number");
            0
        }),
        Ok(None) => {
            warn!("Monthly fee is not set");
            0
        }
        Err(e) => {
            warn!(error = %e, "Failed to read monthly fee");
            0
        }
    }
}

fn parse_fee(value: &str) -> Option<i64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
