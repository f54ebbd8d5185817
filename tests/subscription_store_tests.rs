// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription store synchronization against a mock backend.

use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use subtrack::error::AppError;
use subtrack::models::{BillingCycle, Subscription, SubscriptionCategory};
use subtrack::services::{MemoryTokenStore, SubscriptionStore, TokenStore};
use subtrack::time_utils::parse_rfc3339_utc;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

mod common;

async fn mount_list(server: &MockServer, items: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": items })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_replaces_collection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .and(header("authorization", format!("Bearer {}", common::TEST_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                common::subscription_json("a", "Netflix", 15.0, "Monthly", true),
                common::subscription_json("b", "Spotify", 10.0, "Monthly", true)
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    store.clear();
    let fetched = store.fetch_all().await.unwrap();

    assert_eq!(fetched.len(), 2);
    let names: Vec<_> = store.subscriptions().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["Netflix", "Spotify"]);
    assert!(!store.is_loading());
    assert_eq!(store.error_message(), None);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_collection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [common::subscription_json("a", "Netflix", 15.0, "Monthly", true)]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    store.fetch_all().await.unwrap();

    let err = store.fetch_all().await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(store.subscriptions().len(), 1);
    assert_eq!(store.error_message().as_deref(), Some("HTTP Error: 500"));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_add_appends_server_representation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": common::subscription_json("srv-1", "Netflix HD", 19.99, "Monthly", true)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    let local = Subscription::new(
        "user-1",
        "Netflix",
        SubscriptionCategory::Streaming,
        15.49,
        BillingCycle::Monthly,
        Utc::now(),
    );

    let created = store.add(local).await.unwrap();

    assert_eq!(created.id, "srv-1");
    let subs = store.subscriptions();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].name, "Netflix HD");
    assert_eq!(subs[0].price, 19.99);
}

#[tokio::test]
async fn test_add_without_data_keeps_submitted_value() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    let local = Subscription::new(
        "user-1",
        "Gym",
        SubscriptionCategory::Health,
        40.0,
        BillingCycle::Monthly,
        Utc::now(),
    );
    let id = local.id.clone();

    store.add(local).await.unwrap();

    assert_eq!(store.get(&id).map(|s| s.name).as_deref(), Some("Gym"));
}

#[tokio::test]
async fn test_update_replaces_matching_entry() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        vec![
            common::subscription_json("a", "Netflix", 15.0, "Monthly", true),
            common::subscription_json("b", "Spotify", 10.0, "Monthly", true),
        ],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": common::subscription_json("a", "Netflix", 18.0, "Monthly", true)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    store.fetch_all().await.unwrap();

    let mut sub = store.get("a").unwrap();
    sub.price = 18.0;
    store.update(sub).await.unwrap();

    let subs = store.subscriptions();
    assert_eq!(subs.len(), 2);
    assert_eq!(subs[0].id, "a");
    assert_eq!(subs[0].price, 18.0);
    assert_eq!(store.total_monthly_cost(), 28.0);
}

#[tokio::test]
async fn test_update_without_local_match_is_not_inserted() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": common::subscription_json("ghost", "Ghost", 5.0, "Monthly", true)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    let mut sub = Subscription::new(
        "user-1",
        "Ghost",
        SubscriptionCategory::Other,
        5.0,
        BillingCycle::Monthly,
        Utc::now(),
    );
    sub.id = "ghost".to_string();

    store.update(sub).await.unwrap();

    assert!(store.subscriptions().is_empty());
}

#[tokio::test]
async fn test_delete_removes_entry() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        vec![
            common::subscription_json("a", "Netflix", 15.0, "Monthly", true),
            common::subscription_json("b", "Spotify", 10.0, "Monthly", true),
        ],
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/a"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    store.fetch_all().await.unwrap();
    store.delete("a").await.unwrap();

    let ids: Vec<_> = store.subscriptions().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["b"]);
}

#[tokio::test]
async fn test_failed_delete_keeps_entry() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        vec![common::subscription_json("a", "Netflix", 15.0, "Monthly", true)],
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    store.fetch_all().await.unwrap();

    let err = store.delete("a").await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(store.subscriptions().len(), 1);
}

#[tokio::test]
async fn test_late_update_does_not_resurrect_deleted_entry() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        vec![common::subscription_json("x", "Netflix", 15.0, "Monthly", true)],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/x"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "data": common::subscription_json("x", "Netflix", 20.0, "Monthly", true)
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/x"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (_session, store) = common::authenticated(&server);
    store.fetch_all().await.unwrap();
    let mut sub = store.get("x").unwrap();
    sub.price = 20.0;

    let (updated, deleted) = tokio::join!(store.update(sub), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.delete("x").await
    });

    assert!(updated.is_ok());
    assert!(deleted.is_ok());
    assert!(store.get("x").is_none());
    assert!(store.subscriptions().is_empty());
}

#[tokio::test]
async fn test_logout_discards_fetch_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "data": [common::subscription_json("a", "Netflix", 15.0, "Monthly", true)]
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let (session, store) = common::authenticated(&server);

    let (fetched, ()) = tokio::join!(store.fetch_all(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.logout();
    });

    assert!(matches!(fetched, Err(AppError::NoSession)));
    assert!(store.subscriptions().is_empty());
    assert_eq!(store.error_message(), None);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_logout_discards_writes_in_flight() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        vec![common::subscription_json("a", "Netflix", 15.0, "Monthly", true)],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({
                    "data": common::subscription_json("srv-1", "Gym", 40.0, "Monthly", true)
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "data": common::subscription_json("a", "Netflix", 18.0, "Monthly", true)
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let tokens = MemoryTokenStore::with_token(common::TEST_TOKEN);
    let session = common::test_session(&server, tokens.clone());
    let store = SubscriptionStore::new(common::test_api(&server), session.context());
    store.fetch_all().await.unwrap();

    let draft = Subscription::new(
        "user-1",
        "Gym",
        SubscriptionCategory::Health,
        40.0,
        BillingCycle::Monthly,
        Utc::now(),
    );
    let mut changed = store.get("a").unwrap();
    changed.price = 18.0;

    let (added, updated, ()) = tokio::join!(store.add(draft), store.update(changed), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.logout();
    });

    assert!(matches!(added, Err(AppError::NoSession)));
    assert!(matches!(updated, Err(AppError::NoSession)));
    assert!(store.subscriptions().is_empty());
    assert!(!store.is_loading());
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn test_logout_clears_store() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        vec![common::subscription_json("a", "Netflix", 15.0, "Monthly", true)],
    )
    .await;

    let (session, store) = common::authenticated(&server);
    let mut updates = store.subscribe();
    store.fetch_all().await.unwrap();
    assert_eq!(updates.borrow_and_update().subscriptions.len(), 1);

    session.logout();

    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().subscriptions.is_empty());
    assert!(matches!(store.fetch_all().await, Err(AppError::NoSession)));
}

#[tokio::test]
async fn test_requires_session() {
    let server = MockServer::start().await;
    let session = common::test_session(&server, MemoryTokenStore::new());
    let store = SubscriptionStore::new(common::test_api(&server), session.context());

    assert!(matches!(store.fetch_all().await, Err(AppError::NoSession)));
    assert_eq!(store.error_message().as_deref(), Some("No active session"));
    assert_eq!(common::request_count(&server, "/subscriptions").await, 0);
}

#[tokio::test]
async fn test_derived_views_follow_collection() {
    let server = MockServer::start().await;
    let mut music = common::subscription_json("c", "Spotify", 10.0, "Monthly", true);
    music["category"] = json!("Music");
    mount_list(
        &server,
        vec![
            common::subscription_json("a", "Netflix", 15.0, "Monthly", true),
            common::subscription_json("b", "Disney+", 120.0, "Yearly", true),
            music,
            common::subscription_json("d", "Old", 99.0, "Monthly", false),
        ],
    )
    .await;

    let (_session, store) = common::authenticated(&server);
    store.fetch_all().await.unwrap();

    assert!((store.total_monthly_cost() - 35.0).abs() < 1e-9);

    let groups = store.subscriptions_by_category();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, SubscriptionCategory::Streaming);
    assert_eq!(groups[0].1.len(), 2);
    assert_eq!(groups[1].0, SubscriptionCategory::Music);

    // Every fixture renews on 2024-02-01.
    let now = parse_rfc3339_utc("2024-01-28T12:00:00Z").unwrap();
    let upcoming = store.upcoming_payments(now);
    assert_eq!(upcoming.len(), 3);
    assert!(upcoming.iter().all(|s| s.is_active));

    let far = parse_rfc3339_utc("2024-01-01T00:00:00Z").unwrap();
    assert!(store.upcoming_payments(far).is_empty());

    let summary = store.summary();
    assert_eq!(summary.active_count, 3);
    assert!((summary.total_yearly - 420.0).abs() < 1e-9);
}
