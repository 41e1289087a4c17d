use httpmock::prelude::*;
use podium_audit::AuditLog;
use podium_local::LocalSource;
use podium_net::{ConnectorConfig, NetworkConnector, SourceKind};
use podium_reconcile::{ReconcileMode, Reconciler};

fn write_team_file(dir: &std::path::Path, id: &str, solved: &[&str]) {
    let subs: Vec<String> = solved
        .iter()
        .map(|p| {
            format!(
                r#"{{ "problem_id": "{p}", "timestamp": "2024-03-01T10:00:00Z",
                     "is_correct": true, "run_time": 100, "memory_usage": 64 }}"#
            )
        })
        .collect();
    let body = format!(
        r#"{{ "team_id": "{id}", "team_name": "{id}", "submissions": [{}] }}"#,
        subs.join(",")
    );
    let path = dir.join(format!("{id}_results.json"));
    std::fs::write(&path, &body).unwrap();
    let hash = podium_integrity::canonical_hash(body.as_bytes()).unwrap();
    std::fs::write(
        podium_local::hash_companion_path(&path),
        hash,
    )
    .unwrap();
}

/// Hybrid merge: local {A, B} + remote {B', C} → {A, B', C}. The remote
/// record wins for matching ids; the locally-known team A survives a remote
/// list that omits it.
#[tokio::test]
async fn scenario_hybrid_merge_preserves_local_only() {
    let dir = tempfile::tempdir().unwrap();
    write_team_file(dir.path(), "teamA", &["P1"]);
    write_team_file(dir.path(), "teamB", &["P1", "P2"]);

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
                .body(
                    r#"[
                        { "team_id": "teamB", "team_name": "teamB",
                          "submissions": [
                            { "problem_id": "P1", "timestamp": "2024-03-01T11:00:00Z",
                              "is_correct": true, "run_time": 90, "memory_usage": 64 },
                            { "problem_id": "P2", "timestamp": "2024-03-01T11:10:00Z",
                              "is_correct": true, "run_time": 90, "memory_usage": 64 },
                            { "problem_id": "P3", "timestamp": "2024-03-01T11:20:00Z",
                              "is_correct": true, "run_time": 90, "memory_usage": 64 }
                          ] },
                        { "team_id": "teamC", "team_name": "teamC", "submissions": [] }
                    ]"#,
                );
        })
        .await;

    let conn = NetworkConnector::new(ConnectorConfig {
        server_url: server.base_url(),
        source_kind: SourceKind::BareArray,
        real_time: false,
        ..ConnectorConfig::default()
    });
    conn.connect().await.unwrap();

    let rec = Reconciler::new(
        ReconcileMode::Hybrid,
        LocalSource::new(dir.path()),
        Some(conn),
        AuditLog::in_memory(),
    );

    let snap = rec.refresh().await.unwrap();
    let view: Vec<(&str, i64)> = snap
        .teams()
        .iter()
        .map(|t| (t.id.as_str(), t.total_score()))
        .collect();
    assert_eq!(
        view,
        vec![("teamA", 100), ("teamB", 300), ("teamC", 0)],
        "remote overlays matching ids; local-only id preserved"
    );
}

/// Without a reachable remote, hybrid refresh is just the local baseline.
#[tokio::test]
async fn scenario_hybrid_without_remote_is_local_baseline() {
    let dir = tempfile::tempdir().unwrap();
    write_team_file(dir.path(), "teamA", &["P1"]);

    let rec = Reconciler::new(
        ReconcileMode::Hybrid,
        LocalSource::new(dir.path()),
        None,
        AuditLog::in_memory(),
    );
    let snap = rec.refresh().await.unwrap();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap.teams()[0].id, "teamA");
}
