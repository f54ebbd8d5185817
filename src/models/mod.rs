// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod auth;
pub mod spending;
pub mod subscription;
pub mod user;

pub use auth::{IdentifierType, OtpIdentifier, SignupForm};
pub use spending::{SpendingSummary, UpcomingWindow};
pub use subscription::{normalize, BillingCycle, Subscription, SubscriptionCategory};
pub use user::User;
