// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription collection for the authenticated user.
//!
//! Handles:
//! - CRUD synchronization with the backend (server response wins locally)
//! - Derived spending views over the current collection
//! - Discarding completions that arrive after the session has ended

use crate::error::{AppError, Result};
use crate::models::spending::{self, SpendingSummary, UpcomingWindow};
use crate::models::{Subscription, SubscriptionCategory};
use crate::services::api_client::{subscription_path, ApiClient, ApiError, ApiRequest};
use crate::services::auth::{SessionContext, SessionListener};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::watch;

/// `{data: [...]}` envelope of `GET /subscriptions`.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<Subscription>,
}

/// `{data: {...}}` envelope of single-subscription writes.
#[derive(Debug, Deserialize)]
struct ItemResponse {
    data: Option<Subscription>,
}

/// Immutable view of the store published to observers.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// Subscriptions in server order
    pub subscriptions: Vec<Subscription>,
    pub error_message: Option<String>,
    in_flight: usize,
}

impl StoreSnapshot {
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

/// State shared with the session so logout can clear it.
struct StoreShared {
    state: watch::Sender<StoreSnapshot>,
}

impl SessionListener for StoreShared {
    fn session_ended(&self) {
        self.state.send_modify(|s| {
            s.subscriptions.clear();
            s.error_message = None;
        });
        tracing::debug!("Session ended, subscription store cleared");
    }
}

/// Subscriptions of the current session.
pub struct SubscriptionStore {
    api: ApiClient,
    context: Arc<SessionContext>,
    shared: Arc<StoreShared>,
    upcoming: UpcomingWindow,
}

impl SubscriptionStore {
    /// Create a store bound to the session behind `context`.
    pub fn new(api: ApiClient, context: Arc<SessionContext>) -> Self {
        let (state, _rx) = watch::channel(StoreSnapshot::default());
        let shared = Arc::new(StoreShared { state });

        let listener: Arc<dyn SessionListener> = shared.clone();
        context.register(Arc::downgrade(&listener));

        Self {
            api,
            context,
            shared,
            upcoming: UpcomingWindow::default(),
        }
    }

    /// Use a different window for [`SubscriptionStore::upcoming_payments`].
    pub fn with_upcoming_window(mut self, upcoming: UpcomingWindow) -> Self {
        self.upcoming = upcoming;
        self
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Watch collection changes.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.shared.state.subscribe()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.shared.state.borrow().subscriptions.clone()
    }

    pub fn get(&self, id: &str) -> Option<Subscription> {
        self.shared
            .state
            .borrow()
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading()
    }

    pub fn error_message(&self) -> Option<String> {
        self.shared.state.borrow().error_message.clone()
    }

    /// Drop all local entries without contacting the server.
    pub fn clear(&self) {
        self.shared.state.send_modify(|s| s.subscriptions.clear());
    }

    // ─── Remote operations ───────────────────────────────────────────────────

    /// Replace the local collection with the server's current set.
    ///
    /// On failure the previous collection is left untouched.
    pub async fn fetch_all(&self) -> Result<Vec<Subscription>> {
        let (token, generation) = self.start_op()?;

        let result = self
            .api
            .send::<ListResponse>(ApiRequest::get("/subscriptions").bearer(token))
            .await
            .map(|r| r.data);

        self.complete_op("fetch", generation, result, |subs, fetched| {
            *subs = fetched.clone();
        })
    }

    /// Create a subscription and append the server's representation.
    pub async fn add(&self, subscription: Subscription) -> Result<Subscription> {
        self.check(&subscription)?;
        let (token, generation) = self.start_op()?;

        let result = self.write(Method::POST, "/subscriptions", &subscription, token).await;

        self.complete_op("add", generation, result, |subs, created| {
            subs.push(created.clone());
        })
    }

    /// Send a full subscription by `id` and replace the first local match.
    ///
    /// If no local entry matches, the server is still updated but the local
    /// view is left as is.
    pub async fn update(&self, subscription: Subscription) -> Result<Subscription> {
        self.check(&subscription)?;
        let (token, generation) = self.start_op()?;

        let path = subscription_path(&subscription.id);
        let result = self.write(Method::PUT, &path, &subscription, token).await;

        self.complete_op("update", generation, result, |subs, updated| {
            match subs.iter_mut().find(|s| s.id == updated.id) {
                Some(existing) => *existing = updated.clone(),
                None => {
                    tracing::debug!(id = %updated.id, "Updated subscription not in local view")
                }
            }
        })
    }

    /// Delete a subscription and remove every local entry with that `id`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let (token, generation) = self.start_op()?;

        let request = ApiRequest::delete(subscription_path(id)).bearer(token);
        let result = self.api.send_empty(request).await;

        self.complete_op("delete", generation, result, |subs, _| {
            subs.retain(|s| s.id != id);
        })
    }

    /// Soft-delete: mark inactive so it no longer counts toward totals.
    pub async fn deactivate(&self, id: &str) -> Result<Subscription> {
        let mut subscription = self
            .get(id)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown subscription: {}", id)))?;
        subscription.is_active = false;
        subscription.updated_at = Utc::now();
        self.update(subscription).await
    }

    async fn write(
        &self,
        method: Method,
        path: &str,
        subscription: &Subscription,
        token: String,
    ) -> std::result::Result<Subscription, ApiError> {
        let request = ApiRequest::new(method, path).bearer(token).json(subscription)?;
        let response = self.api.send::<ItemResponse>(request).await?;
        Ok(response.data.unwrap_or_else(|| subscription.clone()))
    }

    // ─── Derived views ───────────────────────────────────────────────────────

    pub fn total_monthly_cost(&self) -> f64 {
        spending::total_monthly_cost(&self.shared.state.borrow().subscriptions)
    }

    pub fn subscriptions_by_category(&self) -> Vec<(SubscriptionCategory, Vec<Subscription>)> {
        spending::subscriptions_by_category(&self.shared.state.borrow().subscriptions)
    }

    /// Active subscriptions renewing within the configured window of `now`.
    pub fn upcoming_payments(&self, now: DateTime<Utc>) -> Vec<Subscription> {
        spending::upcoming_payments(&self.shared.state.borrow().subscriptions, now, self.upcoming)
    }

    pub fn summary(&self) -> SpendingSummary {
        SpendingSummary::from_subscriptions(&self.shared.state.borrow().subscriptions)
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn check(&self, subscription: &Subscription) -> Result<()> {
        subscription.validate().map_err(|e| self.record_error(e))
    }

    /// Capture the bearer token and mark an operation as in flight.
    fn start_op(&self) -> Result<(String, u64)> {
        let bearer = self.context.bearer().map_err(|e| self.record_error(e))?;
        self.shared.state.send_modify(|s| {
            s.in_flight += 1;
            s.error_message = None;
        });
        Ok(bearer)
    }

    /// Apply a finished operation unless its session has since ended.
    fn complete_op<T>(
        &self,
        op: &'static str,
        generation: u64,
        result: std::result::Result<T, ApiError>,
        apply: impl FnOnce(&mut Vec<Subscription>, &T),
    ) -> Result<T> {
        let current = self.context.is_current(generation);

        let mut outcome = None;
        self.shared.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            if !current {
                return;
            }
            match &result {
                Ok(value) => apply(&mut s.subscriptions, value),
                Err(e) => s.error_message = Some(e.to_string()),
            }
            outcome = Some(s.subscriptions.len());
        });

        match (current, result) {
            (false, _) => {
                tracing::info!(op, "Session ended before completion, discarding result");
                Err(AppError::NoSession)
            }
            (true, Ok(value)) => {
                tracing::debug!(op, count = outcome.unwrap_or_default(), "Subscriptions synced");
                Ok(value)
            }
            (true, Err(e)) => {
                tracing::warn!(op, error = %e, "Subscription request failed");
                Err(e.into())
            }
        }
    }

    fn record_error(&self, err: AppError) -> AppError {
        let message = err.user_message();
        self.shared
            .state
            .send_modify(|s| s.error_message = Some(message));
        err
    }
}
