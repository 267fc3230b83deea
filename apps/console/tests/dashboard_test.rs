mod common;

use async_trait::async_trait;
use resumatch::errors::RealtimeError;
use resumatch::notify::NoticeLevel;
use resumatch::pages::dashboard::{Dashboard, LIVE_UPDATES_STOPPED, RECENT_LIMIT};
use resumatch::realtime::{BroadcastFeed, ChangeEvent, ChangeFeed, ChangeFilter, Subscription};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_state, eventually, resume_json};

async fn mount_backend(server: &MockServer, resume_count: i64) {
    Mock::given(method("GET"))
        .and(path("/resume/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_resumes": resume_count,
            "total_matches": 4,
            "avg_score": 61.5,
            "success_rate": 50.0
        })))
        .mount(server)
        .await;
    let resumes: Vec<_> = (1..=resume_count)
        .map(|id| resume_json(id, &format!("cv-{id}.pdf"), &["rust"]))
        .collect();
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resumes))
        .mount(server)
        .await;
}

/// Feed whose subscriptions end right after they are opened, like a socket
/// that never comes back.
struct EndedFeed;

#[async_trait]
impl ChangeFeed for EndedFeed {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, RealtimeError> {
        Ok(Subscription::spawn(filter.channel, |_shutdown, _events| async {}))
    }
}

#[tokio::test]
async fn test_insert_triggers_refetch_until_unmounted() {
    let server = MockServer::start().await;
    mount_backend(&server, 7).await;

    let dashboard = Dashboard::new(app_state(&server));
    let feed = BroadcastFeed::new();
    let mounted = dashboard.mount(&feed).await.unwrap();

    let view = dashboard.view();
    assert_eq!(view.fetches, 1);
    assert!(!view.loading);
    assert_eq!(view.stats.unwrap().total_resumes, 7);
    assert_eq!(view.recent.len(), RECENT_LIMIT);
    assert!(mounted.is_live());
    assert_eq!(feed.listener_count(), 1);

    // Other tables and event kinds are filtered out by the subscription.
    feed.publish(ChangeEvent::insert("public", "matches", json!({"id": 1})));
    feed.publish(ChangeEvent::insert("public", "resumes", json!({"id": 8})));
    assert!(eventually(|| dashboard.view().fetches == 2).await);

    mounted.unmount().await;
    assert_eq!(feed.listener_count(), 0);
    assert_eq!(
        feed.publish(ChangeEvent::insert("public", "resumes", json!({"id": 9}))),
        0
    );
    assert_eq!(dashboard.view().fetches, 2);
}

#[tokio::test]
async fn test_stats_failure_keeps_dashboard_usable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(app_state(&server));
    assert!(dashboard.fetch().await.is_err());

    let view = dashboard.view();
    assert!(view.stats.is_none());
    assert!(!view.loading);
    assert_eq!(view.fetches, 1);
}

#[tokio::test]
async fn test_resume_list_failure_degrades_to_empty_panel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_resumes": 2,
            "total_matches": 0,
            "avg_score": 0.0,
            "success_rate": 0.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dashboard = Dashboard::new(app_state(&server));
    dashboard.fetch().await.unwrap();

    let view = dashboard.view();
    assert_eq!(view.stats.unwrap().total_resumes, 2);
    assert!(view.recent.is_empty());
}

#[tokio::test]
async fn test_dropping_mount_stops_refetching() {
    let server = MockServer::start().await;
    mount_backend(&server, 1).await;

    let dashboard = Dashboard::new(app_state(&server));
    let feed = BroadcastFeed::new();
    let mounted = dashboard.mount(&feed).await.unwrap();
    drop(mounted);

    assert!(eventually(|| feed.listener_count() == 0).await);
    assert_eq!(dashboard.view().fetches, 1);
}

#[tokio::test]
async fn test_ended_feed_warns_that_live_updates_stopped() {
    let server = MockServer::start().await;
    mount_backend(&server, 2).await;

    let state = app_state(&server);
    let dashboard = Dashboard::new(state.clone());
    let mounted = dashboard.mount(&EndedFeed).await.unwrap();

    assert!(eventually(|| !mounted.is_live()).await);
    assert!(eventually(|| {
        state
            .notifier
            .pending()
            .iter()
            .any(|n| n.level == NoticeLevel::Warning && n.message == LIVE_UPDATES_STOPPED)
    })
    .await);
    assert_eq!(dashboard.view().fetches, 1);
    mounted.unmount().await;
}

#[tokio::test]
async fn test_unmount_does_not_warn() {
    let server = MockServer::start().await;
    mount_backend(&server, 1).await;

    let state = app_state(&server);
    let dashboard = Dashboard::new(state.clone());
    let feed = BroadcastFeed::new();
    dashboard.mount(&feed).await.unwrap().unmount().await;

    tokio::task::yield_now().await;
    assert!(state
        .notifier
        .pending()
        .iter()
        .all(|n| n.message != LIVE_UPDATES_STOPPED));
}
