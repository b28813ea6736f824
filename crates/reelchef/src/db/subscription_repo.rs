//! Subscription repository: per-user quota counters.
//!
//! The counter is only changed with single-statement updates
//! (`extractions_used = extractions_used + 1`), never read-modify-write.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::model::{PlanTier, Subscription};

use super::{Database, DatabaseError};

fn from_row(row: &Row<'_>) -> Result<Subscription, rusqlite::Error> {
    Ok(Subscription {
        user_id: row.get("user_id")?,
        plan: row.get("plan")?,
        extractions_used: row.get("extractions_used")?,
        extractions_limit: row.get("extractions_limit")?,
        current_period_end: row.get("current_period_end")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn find(db: &Database, user_id: &str) -> Result<Option<Subscription>, DatabaseError> {
    db.with_conn(|conn| {
        let sub = conn
            .query_row(
                "SELECT * FROM subscriptions WHERE user_id = ?1",
                params![user_id],
                from_row,
            )
            .optional()?;
        Ok(sub)
    })
}

/// Returns the user's record, creating it from `defaults` when absent.
/// Concurrent first reads converge on the same row.
pub fn get_or_create(db: &Database, defaults: &Subscription) -> Result<Subscription, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO subscriptions (user_id, plan, extractions_used, extractions_limit,
             current_period_end, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO NOTHING",
            params![
                defaults.user_id,
                defaults.plan,
                defaults.extractions_used,
                defaults.extractions_limit,
                defaults.current_period_end,
                defaults.created_at,
                defaults.updated_at,
            ],
        )?;
        let sub = conn.query_row(
            "SELECT * FROM subscriptions WHERE user_id = ?1",
            params![defaults.user_id],
            from_row,
        )?;
        Ok(sub)
    })
}

/// Resets the counter and moves the period end, but only if the period
/// end is still `expected_end`. Returns `false` when another reader
/// already rolled the period.
pub fn roll_period(
    db: &Database,
    user_id: &str,
    expected_end: DateTime<Utc>,
    new_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE subscriptions
             SET extractions_used = 0, current_period_end = ?3, updated_at = ?4
             WHERE user_id = ?1 AND current_period_end = ?2",
            params![user_id, expected_end, new_end, now],
        )?;
        Ok(changed == 1)
    })
}

/// Atomically adds one to the counter. Returns `false` if the user has no record.
pub fn increment_used(db: &Database, user_id: &str, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE subscriptions
             SET extractions_used = extractions_used + 1, updated_at = ?2
             WHERE user_id = ?1",
            params![user_id, now],
        )?;
        Ok(changed == 1)
    })
}

/// Sets the counter back to zero, optionally moving the period end.
pub fn reset_used(
    db: &Database,
    user_id: &str,
    new_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE subscriptions
             SET extractions_used = 0,
                 current_period_end = COALESCE(?2, current_period_end),
                 updated_at = ?3
             WHERE user_id = ?1",
            params![user_id, new_end, now],
        )?;
        Ok(changed == 1)
    })
}

/// Changes the plan and its limit. The counter is kept.
pub fn set_plan(
    db: &Database,
    user_id: &str,
    plan: PlanTier,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE subscriptions
             SET plan = ?2, extractions_limit = ?3, updated_at = ?4
             WHERE user_id = ?1",
            params![user_id, plan, limit, now],
        )?;
        Ok(changed == 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn defaults(user: &str, now: DateTime<Utc>) -> Subscription {
        Subscription {
            user_id: user.into(),
            plan: PlanTier::Free,
            extractions_used: 0,
            extractions_limit: 5,
            current_period_end: now + Duration::days(30),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_get_or_create_keeps_existing_row() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let created = get_or_create(&db, &defaults("u1", now)).unwrap();
        assert_eq!(created.extractions_used, 0);

        increment_used(&db, "u1", now).unwrap();
        let again = get_or_create(&db, &defaults("u1", now)).unwrap();
        assert_eq!(again.extractions_used, 1);
    }

    #[test]
    fn test_increment_without_record() {
        let db = Database::open_in_memory().unwrap();
        assert!(!increment_used(&db, "ghost", Utc::now()).unwrap());
    }

    #[test]
    fn test_roll_period_is_conditional() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let sub = get_or_create(&db, &defaults("u1", now)).unwrap();
        increment_used(&db, "u1", now).unwrap();

        let new_end = sub.current_period_end + Duration::days(30);
        assert!(roll_period(&db, "u1", sub.current_period_end, new_end, now).unwrap());
        // Second roller sees a different period end and does nothing.
        assert!(!roll_period(&db, "u1", sub.current_period_end, new_end, now).unwrap());

        let rolled = find(&db, "u1").unwrap().unwrap();
        assert_eq!(rolled.extractions_used, 0);
        assert_eq!(
            rolled.current_period_end.timestamp_millis(),
            new_end.timestamp_millis()
        );
    }

    #[test]
    fn test_reset_and_set_plan() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        get_or_create(&db, &defaults("u1", now)).unwrap();
        increment_used(&db, "u1", now).unwrap();
        increment_used(&db, "u1", now).unwrap();

        assert!(set_plan(&db, "u1", PlanTier::Pro, 100, now).unwrap());
        let sub = find(&db, "u1").unwrap().unwrap();
        assert_eq!(sub.plan, PlanTier::Pro);
        assert_eq!(sub.extractions_limit, 100);
        assert_eq!(sub.extractions_used, 2);

        assert!(reset_used(&db, "u1", None, now).unwrap());
        let sub = find(&db, "u1").unwrap().unwrap();
        assert_eq!(sub.extractions_used, 0);
    }
}
