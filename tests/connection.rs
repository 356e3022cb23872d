//! Integration tests for the async connection layer

mod common;

use common::*;
use futures::StreamExt;
use resonance_tap::{EnemyAttributeUpdate, ReplaySource, Tap, TapConfig, TapConnection, TapEvent};
use std::time::Duration;

#[tokio::test]
async fn replayed_capture_streams_enemy_updates() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let login = login_response();
    let tls = vec![0x16, 0x03, 0x01, 0x00, 0x05, 1, 2, 3, 4, 5];
    let mut segments = vec![segment(web_flow(), 1, tls)];
    segments.push(segment(server_flow(), 10, login.clone()));
    let mut stream = hp_frame(0x40, 900);
    stream.extend(hp_frame(0x40, 850));
    segments.extend(split(10 + login.len() as u32, &stream, 16));

    let connection = Tap::replay(segments, TapConfig::default()).await?;
    let events: Vec<TapEvent> = connection.events().collect().await;

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], TapEvent::ServerChanged(_)));
    assert_eq!(events[2], TapEvent::EnemyUpdate(EnemyAttributeUpdate::hp(0x40, 850)));

    connection.finished().await;
    let stats = connection.stats();
    assert_eq!(stats.segments_seen, 2 + stream.len().div_ceil(16) as u64);
    assert_eq!(stats.server_changes, 1);
    Ok(())
}

#[tokio::test]
async fn later_subscribers_start_at_subscription() -> anyhow::Result<()> {
    let (sender, connection) = Tap::capture(TapConfig::default()).await?;
    let mut first = connection.events();
    let login = login_response();

    sender.send(segment(server_flow(), 0, login.clone())).await?;
    assert!(matches!(first.next().await, Some(TapEvent::ServerChanged(_))));

    let mut late = connection.enemy_updates();
    sender.send(segment(server_flow(), login.len() as u32, hp_frame(0x40, 3))).await?;

    let update = tokio::time::timeout(Duration::from_secs(5), late.next()).await?;
    assert_eq!(update, Some(EnemyAttributeUpdate::hp(0x40, 3)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn idle_stream_is_swept() -> anyhow::Result<()> {
    let (sender, connection) = Tap::capture(TapConfig::default()).await?;
    let mut events = connection.events();
    let login = login_response();

    sender.send(segment(server_flow(), 0, login.clone())).await?;
    assert!(events.next().await.is_some());
    sender.send(segment(server_flow(), login.len() as u32, hp_frame(0x40, 1)[..6].to_vec())).await?;

    tokio::time::sleep(Duration::from_secs(7)).await;

    let stats = connection.stats();
    assert_eq!(stats.segments_seen, 2);
    assert!(stats.timeout_resets >= 1);
    assert_eq!(connection.analyzer().buffered_bytes(), 0);
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = TapConfig { max_nesting_depth: 0, ..TapConfig::default() };
    let result = TapConnection::open(ReplaySource::new(Vec::new()), config).await;
    assert!(matches!(result, Err(resonance_tap::TapError::Config { .. })));
}

#[tokio::test]
async fn dropping_connection_closes_capture_queue() -> anyhow::Result<()> {
    let (sender, connection) = Tap::capture(TapConfig::default()).await?;
    drop(connection);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !sender.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await?;
    assert!(sender.try_send(segment(server_flow(), 0, vec![1])).is_err());
    Ok(())
}
