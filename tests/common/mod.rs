// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use subtrack::services::{
    ApiClient, AuthSession, MemoryTokenStore, ResendCooldown, SubscriptionStore,
};
use wiremock::MockServer;

/// Token used by sessions restored in tests.
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "test-token";

/// API client pointed at a mock server.
#[allow(dead_code)]
pub fn test_api(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri(), Duration::from_secs(2), Duration::from_secs(5))
        .expect("Failed to build API client")
}

/// Session against a mock server with the given token store.
#[allow(dead_code)]
pub fn test_session(server: &MockServer, store: MemoryTokenStore) -> AuthSession {
    AuthSession::new(test_api(server), Arc::new(store), ResendCooldown::default())
}

/// Session restored from a persisted token plus a store bound to it.
#[allow(dead_code)]
pub fn authenticated(server: &MockServer) -> (AuthSession, SubscriptionStore) {
    let session = test_session(server, MemoryTokenStore::with_token(TEST_TOKEN));
    let store = SubscriptionStore::new(test_api(server), session.context());
    (session, store)
}

#[allow(dead_code)]
pub fn user_json() -> Value {
    json!({
        "id": "user-1",
        "email": "a@b.com",
        "phone_number": "81234567890",
        "fullName": "Ada Lovelace",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

#[allow(dead_code)]
pub fn subscription_json(id: &str, name: &str, price: f64, cycle: &str, active: bool) -> Value {
    json!({
        "id": id,
        "user_id": "user-1",
        "name": name,
        "category": "Streaming",
        "price": price,
        "billing_cycle": cycle,
        "renewal_date": "2024-02-01T00:00:00Z",
        "isActive": active,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

/// Number of requests the mock server saw for `path`.
#[allow(dead_code)]
pub async fn request_count(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .count()
}
