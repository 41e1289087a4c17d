//! podium-net
//!
//! Network connector for remote scoring servers.
//!
//! - Connection state machine: `Disconnected → Connecting → Connected | Error`
//! - Fixed-interval retry with a bounded counter; retry exhaustion is a
//!   terminal Error state until an explicit reconnect
//! - Heartbeat re-fetch while Connected and real-time mode is enabled
//! - One fetch outstanding at a time; connect/disconnect supersede any
//!   in-flight request by generation, so completion order can never beat
//!   request order
//! - Three response adapters chosen by configured source kind
//! - Bearer-token > basic-credential > unauthenticated precedence
//! - Round-trip latency probe reported alongside every successful fetch

pub mod adapter;
mod connector;

pub use connector::NetworkConnector;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use podium_model::TeamRecord;
use serde::{Deserialize, Serialize};

/// Fixed User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("podium/", env!("CARGO_PKG_VERSION"));

/// Path used for the lightweight latency probe.
pub const PING_ENDPOINT: &str = "/api/ping";

// ---------------------------------------------------------------------------
// Source kind
// ---------------------------------------------------------------------------

/// Wire shape of the team list returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Top-level JSON array of team objects.
    BareArray,
    /// Object with a `teams` array of team objects.
    TeamsObject,
    /// Platform scoreboard rows: array of
    /// `[team_id, team_name, [[problem_id, ts, is_correct, run_time, mem], ...]]`.
    PlatformRows,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::BareArray => "bare-array",
            SourceKind::TeamsObject => "teams-object",
            SourceKind::PlatformRows => "platform-rows",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConnectorError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bare-array" => Ok(SourceKind::BareArray),
            "teams-object" => Ok(SourceKind::TeamsObject),
            "platform-rows" => Ok(SourceKind::PlatformRows),
            other => Err(ConnectorError::Config(format!(
                "invalid source kind '{other}'. \
                 expected one of: bare-array | teams-object | platform-rows"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors surfaced by the connector. Authentication failures arrive as
/// [`ConnectorError::Http`] with a 401/403 status and get no special
/// recovery path.
#[derive(Debug, Clone)]
pub enum ConnectorError {
    /// Invalid or missing configuration.
    Config(String),
    /// Transport-level failure (DNS, TCP, TLS, timeout).
    Transport(String),
    /// Non-success HTTP status.
    Http { status: u16, message: String },
    /// Response body could not be decoded into the configured shape.
    Decode(String),
    /// The request was superseded by a newer connect/disconnect.
    Cancelled,
    /// A fetch is already outstanding; only one may be in flight at a time.
    Busy,
    /// Operation requires an established connection.
    NotConnected,
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::Config(msg) => write!(f, "config error: {msg}"),
            ConnectorError::Transport(msg) => write!(f, "transport error: {msg}"),
            ConnectorError::Http { status, message } => {
                write!(f, "http error status={status}: {message}")
            }
            ConnectorError::Decode(msg) => write!(f, "decode error: {msg}"),
            ConnectorError::Cancelled => write!(f, "request superseded"),
            ConnectorError::Busy => write!(f, "a fetch is already in flight"),
            ConnectorError::NotConnected => write!(f, "not connected"),
        }
    }
}

impl std::error::Error for ConnectorError {}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub server_url: String,
    pub api_endpoint: String,
    pub source_kind: SourceKind,
    /// Bearer token; takes precedence over basic credentials.
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Heartbeat re-fetch interval; clamped to a 1 s floor.
    pub heartbeat_interval: Duration,
    pub real_time: bool,
    pub auto_reconnect: bool,
    pub max_retries: u32,
    /// Fixed delay between automatic retries.
    pub retry_interval: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            api_endpoint: "/api/teams".to_string(),
            source_kind: SourceKind::BareArray,
            api_key: None,
            username: None,
            password: None,
            headers: BTreeMap::new(),
            heartbeat_interval: Duration::from_secs(5),
            real_time: true,
            auto_reconnect: true,
            max_retries: 3,
            retry_interval: Duration::from_secs(5),
        }
    }
}

impl ConnectorConfig {
    /// Full URL for the team-list endpoint.
    pub fn teams_url(&self) -> String {
        join_url(&self.server_url, &self.api_endpoint)
    }

    /// Full URL for the latency probe.
    pub fn ping_url(&self) -> String {
        join_url(&self.server_url, PING_ENDPOINT)
    }

    /// Heartbeat interval with the 1 s floor applied.
    pub fn effective_heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval.max(Duration::from_secs(1))
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Notifications broadcast to collaborators (reconciler, UI shells).
#[derive(Debug, Clone)]
pub enum ConnectorEvent {
    StateChanged(ConnectionState),
    Connected { latency_ms: i64 },
    Disconnected,
    TeamsReceived {
        teams: Arc<Vec<TeamRecord>>,
        latency_ms: i64,
    },
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
