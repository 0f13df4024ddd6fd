//! # Member Service
//!
//! Registration, contact edits, deletion and the member reports.
//!
//! Registration opens the first paid-up window: `start_date` is the join
//! date and `end_date` lies `membership_days` calendar days later. Only a
//! renewal (see `LedgerService`) moves `end_date` afterwards.
//!
//! Every operation that depends on "today" has an `_on` variant taking the
//! date explicitly; the plain variant uses the local calendar day.

use chrono::{Days, Local, NaiveDate};
use tracing::{info, warn};

use crate::domain::calendar;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{DbConnection, MemberRepository};
use shared::{
    format_gregorian, CreateMemberRequest, ExpiringMember, Gender, Member, MemberListEntry,
    UpdateMemberRequest,
};

/// Members whose window started this many days ago or less count as new
pub const RECENT_JOIN_DAYS: i64 = 7;

/// Service for managing gym members
#[derive(Clone)]
pub struct MemberService {
    repository: MemberRepository,
    default_membership_days: u32,
}

impl MemberService {
    pub fn new(db: DbConnection, default_membership_days: u32) -> Self {
        Self {
            repository: MemberRepository::new(db),
            default_membership_days,
        }
    }

    /// Register a new member, opening their first paid-up window
    pub async fn add_member(&self, request: CreateMemberRequest) -> LedgerResult<Member> {
        self.add_member_on(request, today()).await
    }

    pub async fn add_member_on(
        &self,
        request: CreateMemberRequest,
        today: NaiveDate,
    ) -> LedgerResult<Member> {
        let id = required("id", &request.id)?;
        let name = required("name", &request.name)?;
        let family = required("family", &request.family)?;
        let gender: Gender = request
            .gender
            .parse()
            .map_err(|e: shared::ParseEnumError| LedgerError::Validation(e.to_string()))?;

        let join_date = match request.join_date.as_deref().map(str::trim) {
            Some(local) if !local.is_empty() => calendar::local_to_naive(local)?,
            _ => today,
        };

        let membership_days = match request.membership_days {
            Some(days) if days > 0 => days,
            _ => self.default_membership_days,
        };
        let end_date = join_date
            .checked_add_days(Days::new(u64::from(membership_days)))
            .ok_or_else(|| LedgerError::InvalidDate(format!("{} + {} days", join_date, membership_days)))?;

        let phone = request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let member = Member {
            id: id.to_string(),
            name: name.to_string(),
            family: family.to_string(),
            gender,
            phone,
            join_date: format_gregorian(join_date),
            start_date: Some(format_gregorian(join_date)),
            end_date: Some(format_gregorian(end_date)),
            created_at: String::new(),
        };

        self.repository
            .store_member(&member)
            .await
            .map_err(|e| LedgerError::from_storage(e, id))?;

        info!(
            member_id = %member.id,
            join_date = %member.join_date,
            end_date = ?member.end_date,
            "Registered member"
        );

        self.repository
            .get_member(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("member {}", id)))
    }

    /// Edit a member's name, family and phone. Window dates are untouched.
    pub async fn update_member(&self, member_id: &str, request: UpdateMemberRequest) -> LedgerResult<Member> {
        let name = required("name", &request.name)?;
        let family = required("family", &request.family)?;
        let phone = request.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

        if !self.repository.update_contact(member_id, name, family, phone).await? {
            warn!(member_id, "Update for unknown member");
            return Err(LedgerError::NotFound(format!("member {}", member_id)));
        }
        info!(member_id, "Updated member");

        self.repository
            .get_member(member_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("member {}", member_id)))
    }

    /// Delete a member along with their payments and the transactions behind them
    pub async fn delete_member(&self, member_id: &str) -> LedgerResult<()> {
        if !self.repository.delete_member_cascade(member_id).await? {
            warn!(member_id, "Delete for unknown member");
            return Err(LedgerError::NotFound(format!("member {}", member_id)));
        }
        info!(member_id, "Deleted member and their payments");
        Ok(())
    }

    pub async fn get_member(&self, member_id: &str) -> LedgerResult<Option<Member>> {
        Ok(self.repository.get_member(member_id).await?)
    }

    /// Members whose name, family, phone or id contains `filter`
    /// (case-sensitive); everyone when the filter is empty
    pub async fn find_members(&self, filter: Option<&str>) -> LedgerResult<Vec<MemberListEntry>> {
        self.find_members_on(filter, today()).await
    }

    pub async fn find_members_on(
        &self,
        filter: Option<&str>,
        today: NaiveDate,
    ) -> LedgerResult<Vec<MemberListEntry>> {
        let members = self.repository.find_members(filter).await?;
        Ok(with_remaining_days(members, today))
    }

    /// Whole days left in a member's window; `None` without a usable end date
    pub fn remaining_days(member: &Member, today: NaiveDate) -> Option<i64> {
        member.remaining_days_on(today)
    }

    /// Members with `0 <= remaining_days < threshold_days`, soonest first
    pub async fn expiring_members(&self, threshold_days: i64) -> LedgerResult<Vec<ExpiringMember>> {
        self.expiring_members_on(threshold_days, today()).await
    }

    pub async fn expiring_members_on(
        &self,
        threshold_days: i64,
        today: NaiveDate,
    ) -> LedgerResult<Vec<ExpiringMember>> {
        Ok(self.repository.list_by_remaining(today, 0, threshold_days).await?)
    }

    /// Members whose window has already closed, longest expired first
    pub async fn expired_members(&self) -> LedgerResult<Vec<ExpiringMember>> {
        self.expired_members_on(today()).await
    }

    pub async fn expired_members_on(&self, today: NaiveDate) -> LedgerResult<Vec<ExpiringMember>> {
        Ok(self.repository.list_by_remaining(today, i64::MIN, 0).await?)
    }

    /// Members whose current window started within the last week
    pub async fn recently_joined(&self) -> LedgerResult<Vec<MemberListEntry>> {
        self.recently_joined_on(today()).await
    }

    pub async fn recently_joined_on(&self, today: NaiveDate) -> LedgerResult<Vec<MemberListEntry>> {
        let members = self.repository.list_started_within(today, RECENT_JOIN_DAYS).await?;
        Ok(with_remaining_days(members, today))
    }

    pub async fn total_members(&self) -> LedgerResult<i64> {
        Ok(self.repository.count_members().await?)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn required<'a>(field: &str, value: &'a str) -> LedgerResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(format!("Member {} cannot be empty", field)));
    }
    Ok(trimmed)
}

fn with_remaining_days(members: Vec<Member>, today: NaiveDate) -> Vec<MemberListEntry> {
    members
        .into_iter()
        .map(|member| MemberListEntry {
            remaining_days: member.remaining_days_on(today),
            member,
        })
        .collect()
}
