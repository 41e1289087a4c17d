//! Connection state machine and fetch scheduling.
//!
//! Cancellation model: every connect/disconnect bumps a generation counter.
//! Timers and in-flight fetches carry the generation they were started under
//! and check it before touching state, so a stale completion can never
//! overwrite the outcome of a newer operation. Last-writer-wins follows
//! request order, not completion order.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::{
    adapter, ConnectionState, ConnectorConfig, ConnectorError, ConnectorEvent, USER_AGENT,
};
use podium_model::TeamRecord;

#[derive(Debug, Default)]
struct Inner {
    state: ConnectionState,
    /// Bumped on every connect/disconnect; stale tasks see a mismatch and stop.
    generation: u64,
    retries_used: u32,
    /// Generation of the fetch currently in flight, if any.
    in_flight: Option<u64>,
    latency_ms: i64,
    last_error: Option<String>,
    last_update: Option<DateTime<Utc>>,
}

/// Handle to one remote scoring server. Cheap to clone; all clones share the
/// same state machine and event bus.
#[derive(Clone)]
pub struct NetworkConnector {
    cfg: Arc<ConnectorConfig>,
    http: reqwest::Client,
    inner: Arc<Mutex<Inner>>,
    bus: broadcast::Sender<ConnectorEvent>,
}

impl NetworkConnector {
    pub fn new(cfg: ConnectorConfig) -> Self {
        let (bus, _rx) = broadcast::channel(64);
        Self {
            cfg: Arc::new(cfg),
            http: reqwest::Client::new(),
            inner: Arc::new(Mutex::new(Inner::default())),
            bus,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.cfg
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.bus.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Latency of the most recent successful probe, in milliseconds.
    pub fn latency_ms(&self) -> i64 {
        self.lock().latency_ms
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.lock().last_update
    }

    // -----------------------------------------------------------------------
    // Connection management
    // -----------------------------------------------------------------------

    /// Establish a connection: latency probe, initial fetch, heartbeat.
    ///
    /// Valid only from Disconnected/Error; a connect while Connecting or
    /// Connected is a no-op. Resets the retry counter and supersedes any
    /// in-flight request.
    pub async fn connect(&self) -> Result<(), ConnectorError> {
        let gen = {
            let mut g = self.lock();
            match g.state {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    tracing::debug!(state = g.state.as_str(), "connect ignored");
                    return Ok(());
                }
                ConnectionState::Disconnected | ConnectionState::Error => {}
            }
            g.generation += 1;
            g.retries_used = 0;
            g.in_flight = None;
            g.state = ConnectionState::Connecting;
            g.generation
        };
        self.emit(ConnectorEvent::StateChanged(ConnectionState::Connecting));
        tracing::info!(url = %self.cfg.teams_url(), "connecting to scoring server");

        self.attempt(gen).await
    }

    /// Drop the connection: supersedes any in-flight fetch and cancels all
    /// pending retry/heartbeat timers for this connection.
    pub fn disconnect(&self) {
        let was = {
            let mut g = self.lock();
            g.generation += 1;
            g.in_flight = None;
            let was = g.state;
            g.state = ConnectionState::Disconnected;
            was
        };
        if was != ConnectionState::Disconnected {
            self.emit(ConnectorEvent::StateChanged(ConnectionState::Disconnected));
            self.emit(ConnectorEvent::Disconnected);
            tracing::info!("disconnected from scoring server");
        }
    }

    /// One guarded fetch on the current connection, for an explicit refresh.
    /// Requires Connected; a failure drives the normal error/retry path.
    ///
    /// This is the pull path: it returns the teams to the caller and emits
    /// no `TeamsReceived` event (those come from connect and heartbeat).
    pub async fn fetch_teams(&self) -> Result<(Vec<TeamRecord>, i64), ConnectorError> {
        let gen = {
            let g = self.lock();
            if g.state != ConnectionState::Connected {
                return Err(ConnectorError::NotConnected);
            }
            g.generation
        };
        match self.fetch_guarded(gen).await {
            Ok(teams) => {
                let latency = {
                    let mut g = self.lock();
                    g.last_update = Some(Utc::now());
                    g.latency_ms
                };
                Ok((teams, latency))
            }
            Err(err @ (ConnectorError::Cancelled | ConnectorError::Busy)) => Err(err),
            Err(err) => {
                self.fail(gen, &err);
                Err(err)
            }
        }
    }

    /// One-shot fetch of a single team by id (`<endpoint>/<teamId>`).
    ///
    /// Side-channel lookup: does not touch the connection state machine and
    /// is not subject to the outstanding-fetch guard.
    pub async fn fetch_team(&self, team_id: &str) -> Result<TeamRecord, ConnectorError> {
        let url = format!("{}/{team_id}", self.cfg.teams_url());
        let resp = self
            .request(&url)
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ConnectorError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        let raw: podium_model::RawTeam = resp
            .json()
            .await
            .map_err(|e| ConnectorError::Decode(e.to_string()))?;
        Ok(raw.into_record())
    }

    // -----------------------------------------------------------------------
    // Attempt / retry / heartbeat
    // -----------------------------------------------------------------------

    /// One full connection attempt under generation `gen`.
    async fn attempt(&self, gen: u64) -> Result<(), ConnectorError> {
        if let Some(ms) = self.probe_latency().await {
            let mut g = self.lock();
            if g.generation == gen {
                g.latency_ms = ms;
            }
        }

        match self.fetch_guarded(gen).await {
            Ok(teams) => {
                let latency = {
                    let mut g = self.lock();
                    if g.generation != gen {
                        return Err(ConnectorError::Cancelled);
                    }
                    g.state = ConnectionState::Connected;
                    g.retries_used = 0;
                    g.last_error = None;
                    g.last_update = Some(Utc::now());
                    g.latency_ms
                };
                tracing::info!(teams = teams.len(), latency_ms = latency, "connected");
                self.emit(ConnectorEvent::StateChanged(ConnectionState::Connected));
                self.emit(ConnectorEvent::Connected { latency_ms: latency });
                self.emit(ConnectorEvent::TeamsReceived {
                    teams: Arc::new(teams),
                    latency_ms: latency,
                });
                self.start_heartbeat(gen);
                Ok(())
            }
            Err(ConnectorError::Cancelled) => Err(ConnectorError::Cancelled),
            Err(err) => {
                self.fail(gen, &err);
                Err(err)
            }
        }
    }

    /// Transition to Error and, if the policy allows, schedule one retry
    /// after the fixed retry interval. Past the retry budget the Error state
    /// is terminal until an explicit `connect()`.
    fn fail(&self, gen: u64, err: &ConnectorError) {
        let schedule_retry = {
            let mut g = self.lock();
            if g.generation != gen {
                return;
            }
            g.state = ConnectionState::Error;
            g.last_error = Some(err.to_string());
            if self.cfg.auto_reconnect && g.retries_used < self.cfg.max_retries {
                g.retries_used += 1;
                Some(g.retries_used)
            } else {
                None
            }
        };

        tracing::warn!(error = %err, "fetch failed");
        self.emit(ConnectorEvent::StateChanged(ConnectionState::Error));
        self.emit(ConnectorEvent::Error {
            message: err.to_string(),
        });

        if let Some(attempt) = schedule_retry {
            tracing::info!(
                attempt,
                max = self.cfg.max_retries,
                delay_secs = self.cfg.retry_interval.as_secs(),
                "scheduling reconnect"
            );
            let conn = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(conn.cfg.retry_interval).await;
                let still_current = {
                    let g = conn.lock();
                    g.generation == gen && g.state == ConnectionState::Error
                };
                if still_current {
                    let _ = Box::pin(conn.attempt(gen)).await;
                }
            });
        } else {
            tracing::warn!("retry budget exhausted; waiting for explicit reconnect");
        }
    }

    /// Periodic re-fetch while Connected, real-time mode permitting. A tick
    /// is skipped when a fetch is already in flight.
    fn start_heartbeat(&self, gen: u64) {
        if !self.cfg.real_time {
            return;
        }
        let conn = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(conn.cfg.effective_heartbeat_interval());
            ticker.tick().await; // immediate first tick; the connect fetch covers it

            loop {
                ticker.tick().await;
                let (current, busy) = {
                    let g = conn.lock();
                    (
                        g.generation == gen && g.state == ConnectionState::Connected,
                        g.in_flight.is_some(),
                    )
                };
                if !current {
                    break;
                }
                if busy {
                    tracing::debug!("heartbeat tick skipped: fetch in flight");
                    continue;
                }

                match conn.fetch_guarded(gen).await {
                    Ok(teams) => {
                        let latency = {
                            let mut g = conn.lock();
                            if g.generation != gen {
                                break;
                            }
                            g.last_update = Some(Utc::now());
                            g.latency_ms
                        };
                        tracing::debug!(teams = teams.len(), "heartbeat refresh");
                        conn.emit(ConnectorEvent::TeamsReceived {
                            teams: Arc::new(teams),
                            latency_ms: latency,
                        });
                    }
                    Err(ConnectorError::Cancelled) => break,
                    Err(err) => {
                        conn.fail(gen, &err);
                        break;
                    }
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // HTTP
    // -----------------------------------------------------------------------

    /// Fetch with the single-outstanding-request guard and generation check.
    async fn fetch_guarded(&self, gen: u64) -> Result<Vec<TeamRecord>, ConnectorError> {
        {
            let mut g = self.lock();
            if g.generation != gen {
                return Err(ConnectorError::Cancelled);
            }
            if g.in_flight == Some(gen) {
                return Err(ConnectorError::Busy);
            }
            g.in_flight = Some(gen);
        }

        let result = self.fetch_once().await;

        let mut g = self.lock();
        if g.in_flight == Some(gen) {
            g.in_flight = None;
        }
        if g.generation != gen {
            return Err(ConnectorError::Cancelled);
        }
        drop(g);
        result
    }

    async fn fetch_once(&self) -> Result<Vec<TeamRecord>, ConnectorError> {
        let url = self.cfg.teams_url();
        let resp = self
            .request(&url)
            .send()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = if status.as_u16() == 401 || status.as_u16() == 403 {
                "authentication rejected".to_string()
            } else {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            };
            return Err(ConnectorError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        adapter::parse_teams(self.cfg.source_kind, &body)
    }

    /// Round-trip probe against the ping endpoint. Failure is non-fatal: the
    /// data fetch decides connection health.
    async fn probe_latency(&self) -> Option<i64> {
        let url = self.cfg.ping_url();
        let started = Instant::now();
        match self.request(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                Some(started.elapsed().as_millis() as i64)
            }
            Ok(resp) => {
                tracing::debug!(status = resp.status().as_u16(), "latency probe rejected");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "latency probe failed");
                None
            }
        }
    }

    /// Request builder with fixed headers and the configured auth scheme.
    /// Bearer token wins over basic credentials; otherwise unauthenticated.
    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .get(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT);

        for (k, v) in &self.cfg.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        } else if let (Some(user), Some(pass)) = (&self.cfg.username, &self.cfg.password) {
            req = req.basic_auth(user, Some(pass));
        }
        req
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Poisoning only matters if a panic escaped while holding the lock;
        // recover rather than propagate the panic to every caller.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: ConnectorEvent) {
        let _ = self.bus.send(event);
    }
}
