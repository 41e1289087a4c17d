use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use anyhow::{bail, Result};
use tokio::sync::broadcast;

use crate::{merge_overlay, ReconcileMode};
use podium_audit::AuditLog;
use podium_local::{LocalSource, LoadReport};
use podium_model::{RosterSnapshot, TeamRecord};
use podium_net::{ConnectorEvent, NetworkConnector};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Notifications for roster consumers.
#[derive(Debug, Clone)]
pub enum ReconcileEvent {
    /// A new snapshot was published.
    Refreshed { snapshot: Arc<RosterSnapshot> },
    /// A failure was surfaced; existing data was not discarded.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Owns the canonical roster and drives refresh cycles per the configured
/// mode. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Reconciler {
    mode: ReconcileMode,
    local: LocalSource,
    connector: Option<NetworkConnector>,
    roster: Arc<RwLock<Arc<RosterSnapshot>>>,
    /// Serializes refresh cycles: one writer publishes at a time.
    refresh_gate: Arc<tokio::sync::Mutex<()>>,
    bus: broadcast::Sender<ReconcileEvent>,
    audit: Arc<Mutex<AuditLog>>,
}

impl Reconciler {
    pub fn new(
        mode: ReconcileMode,
        local: LocalSource,
        connector: Option<NetworkConnector>,
        audit: AuditLog,
    ) -> Self {
        let (bus, _rx) = broadcast::channel(64);
        Self {
            mode,
            local,
            connector,
            roster: Arc::new(RwLock::new(Arc::new(RosterSnapshot::empty()))),
            refresh_gate: Arc::new(tokio::sync::Mutex::new(())),
            bus,
            audit: Arc::new(Mutex::new(audit)),
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    pub fn connector(&self) -> Option<&NetworkConnector> {
        self.connector.as_ref()
    }

    /// The current published snapshot. Frozen: holding it across a refresh is
    /// safe, it just goes stale.
    pub fn snapshot(&self) -> Arc<RosterSnapshot> {
        self.roster
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileEvent> {
        self.bus.subscribe()
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Run one refresh cycle per the configured mode and return the snapshot
    /// current at its end.
    pub async fn refresh(&self) -> Result<Arc<RosterSnapshot>> {
        let _gate = self.refresh_gate.lock().await;
        self.audit("refresh", format!("refresh started (mode={})", self.mode.as_str()));

        match self.mode {
            ReconcileMode::LocalOnly => {
                let report = self.local.load_all();
                self.surface_file_errors(&report);
                Ok(self.publish(report.teams))
            }

            ReconcileMode::RemoteOnly => {
                let Some(conn) = &self.connector else {
                    let msg = "remote mode configured without a connector";
                    self.surface_error(msg);
                    bail!(msg);
                };
                match conn.fetch_teams().await {
                    Ok((teams, latency_ms)) => {
                        tracing::debug!(teams = teams.len(), latency_ms, "remote refresh");
                        Ok(self.publish(teams))
                    }
                    Err(err) => {
                        // Roster intentionally left as-is: no silent wipe.
                        self.surface_error(&format!("remote refresh failed: {err}"));
                        Err(err.into())
                    }
                }
            }

            ReconcileMode::Hybrid => {
                let report = self.local.load_all();
                self.surface_file_errors(&report);
                let baseline = report.teams;

                let remote = match &self.connector {
                    Some(conn) if conn.is_connected() => Some(conn.fetch_teams().await),
                    _ => None,
                };

                match remote {
                    Some(Ok((teams, _latency))) => {
                        Ok(self.publish(merge_overlay(baseline, teams)))
                    }
                    Some(Err(err)) => {
                        self.surface_error(&format!("remote refresh failed: {err}"));
                        let current = self.snapshot();
                        if current.is_empty() {
                            // Nothing to fall back on: use the local load.
                            Ok(self.publish(baseline))
                        } else {
                            // Soft fallback: keep what we have.
                            self.audit(
                                "refresh",
                                "remote unavailable; keeping existing roster",
                            );
                            Ok(current)
                        }
                    }
                    None => Ok(self.publish(baseline)),
                }
            }
        }
    }

    /// Apply a remote team list that arrived outside an explicit refresh
    /// (heartbeat push). Mode decides replace vs overlay; LocalOnly ignores.
    /// Serialized through the same gate as refresh.
    pub async fn apply_remote_teams(&self, teams: &[TeamRecord]) {
        let _gate = self.refresh_gate.lock().await;
        match self.mode {
            ReconcileMode::LocalOnly => {}
            ReconcileMode::RemoteOnly => {
                self.publish(teams.to_vec());
            }
            ReconcileMode::Hybrid => {
                let baseline = self.snapshot().teams().to_vec();
                self.publish(merge_overlay(baseline, teams.to_vec()));
            }
        }
    }

    /// Forward connector events into this reconciler: team payloads are
    /// applied per mode, errors are surfaced. Runs until the connector's bus
    /// closes.
    pub fn spawn_connector_pump(&self) -> Option<tokio::task::JoinHandle<()>> {
        let conn = self.connector.clone()?;
        let this = self.clone();
        Some(tokio::spawn(async move {
            let mut rx = conn.subscribe();
            loop {
                match rx.recv().await {
                    Ok(ConnectorEvent::TeamsReceived { teams, .. }) => {
                        this.apply_remote_teams(&teams).await;
                    }
                    Ok(ConnectorEvent::Error { message }) => {
                        this.surface_error(&format!("network error: {message}"));
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "connector event pump lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    /// Trigger a refresh for every debounced reload signal from the local
    /// watcher. Runs until the watcher's bus closes.
    pub fn spawn_reload_pump(
        &self,
        mut reloads: broadcast::Receiver<podium_local::debounce::Fire>,
    ) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                match reloads.recv().await {
                    Ok(_) => {
                        tracing::debug!("file change detected; reloading");
                        if let Err(e) = this.refresh().await {
                            tracing::warn!(error = %e, "watch-triggered refresh failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Publication
    // -----------------------------------------------------------------------

    fn publish(&self, teams: Vec<TeamRecord>) -> Arc<RosterSnapshot> {
        let snapshot = Arc::new(RosterSnapshot::new(teams));
        {
            let mut slot = self.roster.write().unwrap_or_else(|e| e.into_inner());
            *slot = snapshot.clone();
        }
        self.audit(
            "refresh",
            format!("published roster snapshot: {} teams", snapshot.len()),
        );
        let _ = self.bus.send(ReconcileEvent::Refreshed {
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    fn surface_file_errors(&self, report: &LoadReport) {
        for err in &report.errors {
            self.surface_error(&err.to_string());
        }
    }

    fn surface_error(&self, message: &str) {
        tracing::warn!(%message, "reconcile error");
        self.audit("error", message.to_string());
        let _ = self.bus.send(ReconcileEvent::Error {
            message: message.to_string(),
        });
    }

    fn audit(&self, topic: &str, message: impl Into<String>) {
        let mut log = self.audit_lock();
        if let Err(e) = log.append(topic, message) {
            tracing::warn!(error = %e, "audit append failed");
        }
    }

    fn audit_lock(&self) -> MutexGuard<'_, AuditLog> {
        self.audit.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Recent audit entries (oldest first), for status displays.
    pub fn audit_entries(&self) -> Vec<podium_audit::AuditEvent> {
        self.audit_lock().recent().cloned().collect()
    }
}
