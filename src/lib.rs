// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Subtrack: keep an eye on recurring subscriptions
//!
//! This crate provides the client core for a subscription tracker: OTP
//! login against the backend, synchronization of the user's subscriptions,
//! and monthly spending views.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;
pub mod validation;

use chrono::Duration;
use config::Config;
use models::UpcomingWindow;
use services::{ApiClient, ApiError, AuthSession, ResendCooldown, SubscriptionStore, TokenStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub api: ApiClient,
    pub session: AuthSession,
    pub subscriptions: SubscriptionStore,
}

impl AppState {
    /// Build and wire every component from `config`.
    pub fn new(config: Config, token_store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let api = ApiClient::from_config(&config)?;
        let session = AuthSession::new(
            api.clone(),
            token_store,
            ResendCooldown::new(config.resend_cooldown_secs),
        );
        let subscriptions = SubscriptionStore::new(api.clone(), session.context())
            .with_upcoming_window(UpcomingWindow {
                window: Duration::days(config.upcoming_window_days),
                include_overdue: config.include_overdue,
            });

        Ok(Self {
            config,
            api,
            session,
            subscriptions,
        })
    }
}
