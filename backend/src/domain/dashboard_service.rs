use chrono::{Local, NaiveDate, Timelike};
use tracing::warn;

use crate::domain::member_service::RECENT_JOIN_DAYS;
use crate::error::LedgerResult;
use crate::storage::{DbConnection, MemberRepository};
use shared::{DashboardStats, Gender};

/// Window start ages (days) counted as "expiring soon" on the dashboard.
/// This is a start-date proxy and does not consult `end_date`.
const EXPIRING_START_AGE: (i64, i64) = (25, 30);

/// Hours during which the women's shift runs
const WOMEN_SHIFT_HOURS: std::ops::Range<u32> = 9..14;

/// Service computing the dashboard counters
#[derive(Clone)]
pub struct DashboardService {
    repository: MemberRepository,
}

impl DashboardService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            repository: MemberRepository::new(db),
        }
    }

    /// Counters as of today. Storage failures give zeroed counters.
    pub async fn compute_stats(&self, shift: Gender) -> DashboardStats {
        self.compute_stats_on(shift, Local::now().date_naive()).await
    }

    pub async fn compute_stats_on(&self, shift: Gender, today: NaiveDate) -> DashboardStats {
        match self.try_compute_stats(shift, today).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Failed to compute dashboard stats");
                DashboardStats::default()
            }
        }
    }

    async fn try_compute_stats(&self, shift: Gender, today: NaiveDate) -> LedgerResult<DashboardStats> {
        let (expiring_from, expiring_to) = EXPIRING_START_AGE;
        Ok(DashboardStats {
            total_active: self.repository.count_members().await?,
            shift_count: self.repository.count_by_gender(shift).await?,
            expiring_count: self
                .repository
                .count_by_start_age(today, Some(expiring_from), expiring_to)
                .await?,
            recent_count: self
                .repository
                .count_by_start_age(today, None, RECENT_JOIN_DAYS + 1)
                .await?,
        })
    }

    /// The shift running now
    pub fn current_shift() -> Gender {
        shift_for_hour(Local::now().hour())
    }
}

/// The shift running at `hour` (0-23): women 09:00-13:59, men otherwise
pub fn shift_for_hour(hour: u32) -> Gender {
    if WOMEN_SHIFT_HOURS.contains(&hour) {
        Gender::Women
    } else {
        Gender::Men
    }
}
