//! podium-model
//!
//! Core data model for the contest results pipeline:
//! - [`Submission`] / [`TeamRecord`] with derived scoring statistics
//! - [`RawTeam`] wire shape shared by the local file format and remote APIs
//! - [`RosterSnapshot`] immutable point-in-time roster
//!
//! Deterministic, pure types. No IO. No network calls.

mod roster;
mod team;
pub mod timefmt;

pub use roster::RosterSnapshot;
pub use team::{RawSubmission, RawTeam, Submission, TeamRecord, POINTS_PER_PROBLEM};
