use std::time::Duration;

use httpmock::prelude::*;
use podium_net::{
    ConnectionState, ConnectorConfig, ConnectorEvent, NetworkConnector, SourceKind,
};

/// A disconnect issued while a fetch is still in flight wins: the slow
/// response completes afterwards but may not overwrite the newer state, and
/// no team payload leaks out of the cancelled request.
#[tokio::test]
async fn scenario_disconnect_supersedes_inflight_fetch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/ping");
            then.status(200);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/teams");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{ "team_id": "slow", "team_name": "Slow" }]"#)
                .delay(Duration::from_millis(400));
        })
        .await;

    let cfg = ConnectorConfig {
        server_url: server.base_url(),
        source_kind: SourceKind::BareArray,
        real_time: false,
        auto_reconnect: false,
        ..ConnectorConfig::default()
    };
    let conn = NetworkConnector::new(cfg);
    let mut rx = conn.subscribe();

    let connecting = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.connect().await })
    };

    // Let the fetch get in flight, then cut the connection.
    tokio::time::sleep(Duration::from_millis(100)).await;
    conn.disconnect();
    assert_eq!(conn.state(), ConnectionState::Disconnected);

    // The superseded attempt resolves as cancelled, not as a success.
    let result = connecting.await.unwrap();
    assert!(result.is_err());

    // Give the slow response time to land; state must not flip back.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(conn.state(), ConnectionState::Disconnected);

    while let Ok(ev) = rx.try_recv() {
        assert!(
            !matches!(ev, ConnectorEvent::TeamsReceived { .. }),
            "cancelled fetch must not publish teams"
        );
        assert!(
            !matches!(ev, ConnectorEvent::Connected { .. }),
            "cancelled fetch must not report connected"
        );
    }
}

/// Heartbeat keeps re-fetching while connected, and dies with the connection.
#[tokio::test]
async fn scenario_heartbeat_refetches_until_disconnect() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/ping");
            then.status(200);
        })
        .await;
    let teams = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/teams");
            then.status(200)
                .header("content-type", "application/json")
                .body("[]");
        })
        .await;

    let cfg = ConnectorConfig {
        server_url: server.base_url(),
        source_kind: SourceKind::BareArray,
        real_time: true,
        // Clamped to the 1 s floor.
        heartbeat_interval: Duration::from_millis(10),
        ..ConnectorConfig::default()
    };
    let conn = NetworkConnector::new(cfg);
    conn.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    let hits_while_connected = teams.hits_async().await;
    // connect fetch + at least two heartbeat refreshes
    assert!(
        hits_while_connected >= 3,
        "expected heartbeat refetches, saw {hits_while_connected}"
    );

    conn.disconnect();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let hits_after = teams.hits_async().await;
    // One tick may have been mid-flight at disconnect; none after that.
    assert!(
        hits_after <= hits_while_connected + 1,
        "heartbeat must stop after disconnect"
    );
}
