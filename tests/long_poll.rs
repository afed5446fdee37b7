//! Long polling over a real socket, using the bundled client.

use std::time::{Duration, Instant};
use talk_server::{PollResult, TalkClient};

mod common;

async fn wait_for_waiters(store: &talk_server::TalkStore, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while store.notifier().pending() != count {
        assert!(Instant::now() < deadline, "waiters never registered");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_pending_poll_resolves_on_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(common::test_config(dir.path())).await;
    let client = TalkClient::new(&server.url()).unwrap();

    let (version, talks) = client.list().await.unwrap();
    assert_eq!(version, 0);
    assert!(talks.is_empty());

    let poller = client.clone();
    let poll = tokio::spawn(async move { poller.poll(Some(0), Some(30)).await });
    wait_for_waiters(&server.store, 1).await;

    client.put("Long polling", "Ada", "Waiting well").await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .expect("poll should resolve promptly")
        .unwrap()
        .unwrap();
    match result {
        PollResult::Changed { version, talks } => {
            assert_eq!(version, 1);
            assert_eq!(talks.len(), 1);
            assert_eq!(talks[0].title, "Long polling");
        }
        PollResult::NotModified => panic!("expected the post-mutation listing"),
    }
    assert_eq!(server.store.notifier().pending(), 0);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_every_pending_poll_is_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(common::test_config(dir.path())).await;
    let client = TalkClient::new(&server.url()).unwrap();

    let polls: Vec<_> = (0..3)
        .map(|_| {
            let poller = client.clone();
            tokio::spawn(async move { poller.poll(Some(0), Some(30)).await })
        })
        .collect();
    wait_for_waiters(&server.store, 3).await;

    client.put("T", "A", "B").await.unwrap();

    for poll in polls {
        let result = poll.await.unwrap().unwrap();
        assert!(matches!(result, PollResult::Changed { version: 1, .. }));
    }

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_poll_times_out_with_304() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(common::test_config(dir.path())).await;
    let client = TalkClient::new(&server.url()).unwrap();

    let start = Instant::now();
    let result = client.poll(Some(0), Some(1)).await.unwrap();
    assert_eq!(result, PollResult::NotModified);
    assert!(start.elapsed() >= Duration::from_millis(900));
    assert_eq!(server.store.notifier().pending(), 0);
    assert_eq!(server.store.version(), 0);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_wait_is_clamped_to_configured_maximum() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path());
    config.long_poll.max_wait_secs = 1;
    let server = common::start_server(config).await;
    let client = TalkClient::new(&server.url()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), client.poll(Some(0), Some(3600)))
        .await
        .expect("wait should be clamped")
        .unwrap();
    assert_eq!(result, PollResult::NotModified);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_stale_version_returns_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(common::test_config(dir.path())).await;
    let client = TalkClient::new(&server.url()).unwrap();

    client.put("T", "A", "B").await.unwrap();
    client.comment("T", "X", "Y").await.unwrap();

    let start = Instant::now();
    let result = client.poll(Some(0), Some(30)).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
    match result {
        PollResult::Changed { version, talks } => {
            assert_eq!(version, 2);
            assert_eq!(talks[0].comments.len(), 1);
        }
        PollResult::NotModified => panic!("stale version must not wait"),
    }

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_releases_pending_polls() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(common::test_config(dir.path())).await;
    let client = TalkClient::new(&server.url()).unwrap();

    let poller = client.clone();
    let poll = tokio::spawn(async move { poller.poll(Some(0), Some(60)).await });
    wait_for_waiters(&server.store, 1).await;

    server.shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .expect("shutdown should release the poll")
        .unwrap()
        .unwrap();
    assert_eq!(result, PollResult::NotModified);

    tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_client_crud_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(common::test_config(dir.path())).await;
    let client = TalkClient::new(&server.url()).unwrap();

    client.put("Café / Rust?", "Ada", "Unicode titles").await.unwrap();
    let talk = client.get("Café / Rust?").await.unwrap().unwrap();
    assert_eq!(talk.presenter, "Ada");

    client.comment("Café / Rust?", "Bob", "Nice").await.unwrap();
    assert_eq!(client.get("Café / Rust?").await.unwrap().unwrap().comments.len(), 1);

    let err = client.comment("missing", "Bob", "Nice").await.unwrap_err();
    assert!(err.to_string().contains("404"));

    let err = client.put("T", "", "x").await.unwrap_err();
    assert!(err.to_string().contains("400"));

    client.delete("Café / Rust?").await.unwrap();
    assert!(client.get("Café / Rust?").await.unwrap().is_none());
    assert_eq!(server.store.version(), 3);

    server.shutdown.trigger();
}
