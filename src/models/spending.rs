//! Spending views derived from a subscription collection.
//!
//! All functions are pure and recomputed on every call; the only cached
//! state is the collection itself.

use crate::models::subscription::{Subscription, SubscriptionCategory};
use chrono::{DateTime, Duration, Utc};

/// Default look-ahead for [`upcoming_payments`].
pub const DEFAULT_UPCOMING_WINDOW_DAYS: i64 = 7;

/// Sum of monthly-normalized prices over active subscriptions.
pub fn total_monthly_cost(subscriptions: &[Subscription]) -> f64 {
    subscriptions
        .iter()
        .filter(|s| s.is_active)
        .map(Subscription::monthly_cost)
        .sum()
}

/// Active subscriptions grouped by category.
///
/// Groups appear in order of first encounter and keep encounter order
/// within each group.
pub fn subscriptions_by_category(
    subscriptions: &[Subscription],
) -> Vec<(SubscriptionCategory, Vec<Subscription>)> {
    let mut groups: Vec<(SubscriptionCategory, Vec<Subscription>)> = Vec::new();
    for sub in subscriptions.iter().filter(|s| s.is_active) {
        match groups.iter_mut().find(|(c, _)| *c == sub.category) {
            Some((_, members)) => members.push(sub.clone()),
            None => groups.push((sub.category, vec![sub.clone()])),
        }
    }
    groups
}

/// Options for the upcoming-payments view.
#[derive(Debug, Clone, Copy)]
pub struct UpcomingWindow {
    pub window: Duration,
    /// Keep active subscriptions whose renewal date has already passed.
    pub include_overdue: bool,
}

impl Default for UpcomingWindow {
    fn default() -> Self {
        Self {
            window: Duration::days(DEFAULT_UPCOMING_WINDOW_DAYS),
            include_overdue: true,
        }
    }
}

/// Active subscriptions renewing on or before `now + window`, soonest first.
///
/// With `include_overdue` set there is no lower bound, so an active
/// subscription whose renewal date is in the past still shows up.
pub fn upcoming_payments(
    subscriptions: &[Subscription],
    now: DateTime<Utc>,
    opts: UpcomingWindow,
) -> Vec<Subscription> {
    // A window too large to represent has no upper bound.
    let horizon = now.checked_add_signed(opts.window);
    let mut upcoming: Vec<Subscription> = subscriptions
        .iter()
        .filter(|s| s.is_active && horizon.map_or(true, |h| s.renewal_date <= h))
        .filter(|s| opts.include_overdue || s.renewal_date >= now)
        .cloned()
        .collect();
    upcoming.sort_by_key(|s| s.renewal_date);
    upcoming
}

/// Dashboard totals.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendingSummary {
    pub total_monthly: f64,
    pub total_yearly: f64,
    pub active_count: usize,
    /// Monthly total per category, in encounter order
    pub by_category: Vec<(SubscriptionCategory, f64)>,
}

impl SpendingSummary {
    pub fn from_subscriptions(subscriptions: &[Subscription]) -> Self {
        let total_monthly = total_monthly_cost(subscriptions);
        let by_category = subscriptions_by_category(subscriptions)
            .into_iter()
            .map(|(category, members)| (category, total_monthly_cost(&members)))
            .collect();

        Self {
            total_monthly,
            total_yearly: total_monthly * 12.0,
            active_count: subscriptions.iter().filter(|s| s.is_active).count(),
            by_category,
        }
    }
}
