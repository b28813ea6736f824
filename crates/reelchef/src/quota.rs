//! Quota gate: per-user extraction counters with period-based limits.
//!
//! Usage is only ever recorded for completed jobs. Free-tier periods roll
//! forward on read; paid tiers wait for the billing collaborator to call
//! [`QuotaGate::reset_for_billing_cycle`].

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::LimitsConfig;
use crate::db::{subscription_repo, Database, DatabaseError};
use crate::model::{PlanTier, Subscription};

/// Result of a quota check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub allowed: bool,
    pub used: u32,
    pub limit: u32,
    pub plan_tier: PlanTier,
    pub period_end: DateTime<Utc>,
}

impl From<&Subscription> for QuotaStatus {
    fn from(sub: &Subscription) -> Self {
        Self {
            allowed: sub.has_remaining(),
            used: sub.extractions_used,
            limit: sub.extractions_limit,
            plan_tier: sub.plan,
            period_end: sub.current_period_end,
        }
    }
}

#[derive(Clone)]
pub struct QuotaGate {
    db: Database,
    limits: LimitsConfig,
    clock: Arc<dyn Clock>,
}

impl QuotaGate {
    pub fn new(db: Database, limits: LimitsConfig, clock: Arc<dyn Clock>) -> Self {
        Self { db, limits, clock }
    }

    /// Reads (or creates) the user's record, rolls an expired free-tier
    /// period, and reports whether another extraction is allowed.
    pub fn can_extract(&self, user_id: &str) -> Result<QuotaStatus, DatabaseError> {
        let sub = self.current(user_id)?;
        Ok(QuotaStatus::from(&sub))
    }

    /// Atomically adds one completed extraction to the user's counter.
    pub fn record_successful_extraction(&self, user_id: &str) -> Result<(), DatabaseError> {
        let now = self.clock.now();
        if !subscription_repo::increment_used(&self.db, user_id, now)? {
            self.get_or_create(user_id)?;
            subscription_repo::increment_used(&self.db, user_id, now)?;
        }
        Ok(())
    }

    /// Sets the user's counter back to zero. Called on billing-cycle renewal.
    pub fn reset_for_billing_cycle(&self, user_id: &str) -> Result<QuotaStatus, DatabaseError> {
        self.get_or_create(user_id)?;
        subscription_repo::reset_used(&self.db, user_id, None, self.clock.now())?;
        self.can_extract(user_id)
    }

    /// Moves the user to another plan, applying that plan's limit.
    pub fn set_plan(&self, user_id: &str, plan: PlanTier) -> Result<QuotaStatus, DatabaseError> {
        self.get_or_create(user_id)?;
        subscription_repo::set_plan(
            &self.db,
            user_id,
            plan,
            self.limits.limit_for(plan),
            self.clock.now(),
        )?;
        self.can_extract(user_id)
    }

    fn current(&self, user_id: &str) -> Result<Subscription, DatabaseError> {
        let sub = self.get_or_create(user_id)?;
        let now = self.clock.now();
        if !sub.plan.rolls_automatically() || !sub.period_expired(now) {
            return Ok(sub);
        }

        let new_end = self.next_period_end(sub.current_period_end, now);
        let rolled =
            subscription_repo::roll_period(&self.db, user_id, sub.current_period_end, new_end, now)?;
        if rolled {
            tracing::info!(user_id, period_end = %new_end, "Rolled free-tier quota period");
        }
        // Either we rolled it or a concurrent reader did; re-read the winner.
        subscription_repo::find(&self.db, user_id)?.map_or_else(|| self.get_or_create(user_id), Ok)
    }

    fn get_or_create(&self, user_id: &str) -> Result<Subscription, DatabaseError> {
        let now = self.clock.now();
        let defaults = Subscription {
            user_id: user_id.to_string(),
            plan: PlanTier::Free,
            extractions_used: 0,
            extractions_limit: self.limits.limit_for(PlanTier::Free),
            current_period_end: self.add_period(now),
            created_at: now,
            updated_at: now,
        };
        subscription_repo::get_or_create(&self.db, &defaults)
    }

    /// Advances `end` by whole periods until it lies after `now`.
    fn next_period_end(&self, mut end: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        while end <= now {
            end = self.add_period(end);
        }
        end
    }

    fn add_period(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let months = self.limits.period_months.max(1);
        from.checked_add_months(Months::new(months))
            .unwrap_or(from + chrono::Duration::days(30 * i64::from(months)))
    }
}
