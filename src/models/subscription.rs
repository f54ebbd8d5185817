// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription record and its billing metadata.

use crate::error::AppError;
use crate::time_utils::iso8601;
use crate::validation::{MAX_NAME_LENGTH, MAX_NOTES_LENGTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Average number of weeks in a month used for weekly normalization.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// What kind of service a subscription pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionCategory {
    Streaming,
    Music,
    Gaming,
    Productivity,
    Software,
    Education,
    Health,
    Other,
}

impl SubscriptionCategory {
    pub const ALL: [SubscriptionCategory; 8] = [
        SubscriptionCategory::Streaming,
        SubscriptionCategory::Music,
        SubscriptionCategory::Gaming,
        SubscriptionCategory::Productivity,
        SubscriptionCategory::Software,
        SubscriptionCategory::Education,
        SubscriptionCategory::Health,
        SubscriptionCategory::Other,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            SubscriptionCategory::Streaming => "Streaming",
            SubscriptionCategory::Music => "Music",
            SubscriptionCategory::Gaming => "Gaming",
            SubscriptionCategory::Productivity => "Productivity",
            SubscriptionCategory::Software => "Software",
            SubscriptionCategory::Education => "Education",
            SubscriptionCategory::Health => "Health",
            SubscriptionCategory::Other => "Other",
        }
    }
}

impl fmt::Display for SubscriptionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SubscriptionCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.display_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown category: {}", s)))
    }
}

/// Recurrence period of a subscription charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingCycle {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingCycle {
    pub const ALL: [BillingCycle; 4] = [
        BillingCycle::Weekly,
        BillingCycle::Monthly,
        BillingCycle::Quarterly,
        BillingCycle::Yearly,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            BillingCycle::Weekly => "Weekly",
            BillingCycle::Monthly => "Monthly",
            BillingCycle::Quarterly => "Quarterly",
            BillingCycle::Yearly => "Yearly",
        }
    }

    /// Suffix shown after a price, e.g. `$9.99/Month`.
    pub fn abbreviation(self) -> &'static str {
        match self {
            BillingCycle::Weekly => "/Week",
            BillingCycle::Monthly => "/Month",
            BillingCycle::Quarterly => "/Quarter",
            BillingCycle::Yearly => "/Year",
        }
    }

    /// Multiplier converting one charge into a monthly amount.
    pub fn monthly_factor(self) -> f64 {
        match self {
            BillingCycle::Weekly => WEEKS_PER_MONTH,
            BillingCycle::Monthly => 1.0,
            BillingCycle::Quarterly => 1.0 / 3.0,
            BillingCycle::Yearly => 1.0 / 12.0,
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BillingCycle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.display_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown billing cycle: {}", s)))
    }
}

/// Convert a price charged every `cycle` into its monthly equivalent.
///
/// Weekly uses the 4.33 weeks/month approximation, not calendar weeks.
pub fn normalize(price: f64, cycle: BillingCycle) -> f64 {
    match cycle {
        BillingCycle::Monthly => price,
        BillingCycle::Yearly => price / 12.0,
        BillingCycle::Quarterly => price / 3.0,
        BillingCycle::Weekly => price * WEEKS_PER_MONTH,
    }
}

/// A tracked subscription.
///
/// Identity is the `id` alone: two records with the same `id` compare equal
/// even if other fields differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    /// Owner reference, used for filtering only
    pub user_id: String,
    pub name: String,
    pub category: SubscriptionCategory,
    /// Charge per billing cycle, never negative
    pub price: f64,
    pub billing_cycle: BillingCycle,
    /// Next charge date (may be in the past)
    #[serde(with = "iso8601")]
    pub renewal_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Soft-delete flag; inactive records stay listed but never count
    #[serde(rename = "isActive", default = "default_active")]
    pub is_active: bool,
    #[serde(rename = "createdAt", with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Subscription {
    /// Create a new active subscription with a fresh client-side UUID.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        category: SubscriptionCategory,
        price: f64,
        billing_cycle: BillingCycle,
        renewal_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            category,
            price,
            billing_cycle,
            renewal_date,
            notes: None,
            logo_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Monthly equivalent of this subscription's price.
    pub fn monthly_cost(&self) -> f64 {
        normalize(self.price, self.billing_cycle)
    }

    /// Check the record before it is sent to the server.
    pub fn validate(&self) -> Result<(), AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "Please fill in all required fields".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "Name must be at most {} characters",
                MAX_NAME_LENGTH
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::InvalidInput(
                "Please enter a valid price".to_string(),
            ));
        }
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LENGTH {
                return Err(AppError::InvalidInput(format!(
                    "Notes must be at most {} characters",
                    MAX_NOTES_LENGTH
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscription {}

impl Hash for Subscription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
