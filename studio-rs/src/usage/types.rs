use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier controlling the monthly image quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Starter,
    Pro,
    Business,
}

impl Tier {
    /// Fixed monthly image limit for this tier
    pub fn monthly_limit(&self) -> u32 {
        match self {
            Tier::Free => 25,
            Tier::Starter => 200,
            Tier::Pro => 1000,
            Tier::Business => 5000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Business => "business",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Tier::Free),
            "starter" => Some(Tier::Starter),
            "pro" => Some(Tier::Pro),
            "business" => Some(Tier::Business),
            _ => None,
        }
    }
}

/// Authorization level, independent of tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    User,
    Admin,
}

impl UserLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::User => "user",
            UserLevel::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserLevel::User),
            "admin" => Some(UserLevel::Admin),
            _ => None,
        }
    }
}

/// Advance a timestamp by one calendar month.
///
/// `checked_add_months` only fails at the edge of representable time; fall
/// back to the input so the window never moves backwards.
pub fn one_month_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1)).unwrap_or(now)
}

/// Per-user usage counters over a rolling one-month period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Stable user identifier
    pub user_id: String,
    /// Contact reference, not identity
    pub email: String,
    /// Subscription tier
    pub tier: Tier,
    /// Images generated within the current period
    pub images_generated: u32,
    /// Start of the current period
    pub period_start: DateTime<Utc>,
    /// End of the current period
    pub period_end: DateTime<Utc>,
    /// Authorization level
    pub user_level: UserLevel,
}

impl UsageRecord {
    /// Create a fresh free-tier record with a one-month window starting now
    pub fn new(user_id: String, email: String, now: DateTime<Utc>) -> Self {
        UsageRecord {
            user_id,
            email,
            tier: Tier::Free,
            images_generated: 0,
            period_start: now,
            period_end: one_month_from(now),
            user_level: UserLevel::User,
        }
    }

    /// Monthly limit for this record's tier
    pub fn limit(&self) -> u32 {
        self.tier.monthly_limit()
    }

    /// Remaining quota in the current period
    pub fn remaining(&self) -> u32 {
        self.limit().saturating_sub(self.images_generated)
    }

    /// Whether the current period has ended
    pub fn period_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.period_end
    }

    /// Reset the counter and start a new one-month period from `now`
    pub fn rollover(&mut self, now: DateTime<Utc>) {
        self.images_generated = 0;
        self.period_start = now;
        self.period_end = one_month_from(now);
    }
}

/// Result of a quota check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCheck {
    pub can_generate: bool,
    pub tier: Tier,
    pub images_generated: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl UsageCheck {
    /// Check for a user with no usage record yet: free tier, nothing used
    pub fn new_user() -> Self {
        UsageCheck {
            can_generate: true,
            tier: Tier::Free,
            images_generated: 0,
            limit: Tier::Free.monthly_limit(),
            remaining: Tier::Free.monthly_limit(),
        }
    }

    /// Check derived from a record whose period is known to be active
    pub fn from_record(record: &UsageRecord) -> Self {
        let remaining = record.remaining();
        UsageCheck {
            can_generate: remaining > 0,
            tier: record.tier,
            images_generated: record.images_generated,
            limit: record.limit(),
            remaining,
        }
    }
}
