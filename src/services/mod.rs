// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session, sync, and transport layer.

pub mod api_client;
pub mod auth;
pub mod cooldown;
pub mod subscriptions;
pub mod token_store;

pub use api_client::{ApiClient, ApiError, ApiRequest};
pub use auth::{AuthSession, AuthState, ResendOutcome, SessionContext, SessionSnapshot};
pub use cooldown::{Countdown, ResendCooldown};
pub use subscriptions::{StoreSnapshot, SubscriptionStore};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
