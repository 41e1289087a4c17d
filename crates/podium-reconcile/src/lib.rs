//! podium-reconcile
//!
//! Reconciliation engine: merges local files and/or remote fetches into one
//! canonical roster.
//!
//! Architectural decisions:
//! - The reconciler exclusively owns the canonical roster; consumers receive
//!   frozen `Arc<RosterSnapshot>` values, never a shared mutable list
//! - Refresh cycles are serialized through a single async gate so a merge
//!   never observes a half-updated roster
//! - Hybrid merges overlay remote records onto the local baseline by id and
//!   preserve local-only entries: a remote fetch that omits a team never
//!   prunes it
//! - A failed remote fetch degrades to stale-but-consistent data plus a
//!   surfaced error; it never silently wipes the roster

mod engine;
mod merge;

pub use engine::{ReconcileEvent, Reconciler};
pub use merge::merge_overlay;

use anyhow::{anyhow, Result};

/// Data-source policy for each refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Roster is wholesale-replaced by the local scan.
    LocalOnly,
    /// Roster is wholesale-replaced by a successful remote fetch; a failed
    /// fetch leaves it unchanged.
    RemoteOnly,
    /// Local baseline with remote records overlaid by id.
    Hybrid,
}

impl ReconcileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileMode::LocalOnly => "local",
            ReconcileMode::RemoteOnly => "remote",
            ReconcileMode::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ReconcileMode::LocalOnly),
            "remote" => Ok(ReconcileMode::RemoteOnly),
            "hybrid" => Ok(ReconcileMode::Hybrid),
            other => Err(anyhow!(
                "invalid reconcile mode '{}'. expected one of: local | remote | hybrid",
                other
            )),
        }
    }
}
