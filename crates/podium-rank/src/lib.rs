//! podium-rank
//!
//! Deterministic multi-key ranking over a roster snapshot.
//!
//! - Ranks are consecutive integers starting at 1; equal primary keys never
//!   share a rank. Ties are broken by the criterion's cascade, and the sort
//!   is stable, so repeated calls on the same snapshot agree.
//! - Pure logic. No IO. Consumers hand in an immutable snapshot and get an
//!   owned ranked view back.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use podium_model::{RosterSnapshot, TeamRecord};

/// Two accuracies within this many percentage points compare equal.
const ACCURACY_EPSILON: f64 = 0.01;

// ---------------------------------------------------------------------------
// Criterion
// ---------------------------------------------------------------------------

/// Ranking criteria and their tie-break cascades:
///
/// | Criterion | Primary            | Tie-break 1      | Tie-break 2        |
/// |-----------|--------------------|------------------|--------------------|
/// | score     | total score desc   | solved desc      | last submit asc    |
/// | solved    | solved desc        | total score desc | —                  |
/// | time      | last submit asc    | —                | —                  |
/// | accuracy  | accuracy desc ±ε   | total score desc | —                  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankCriterion {
    Score,
    Solved,
    Time,
    Accuracy,
}

impl RankCriterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankCriterion::Score => "score",
            RankCriterion::Solved => "solved",
            RankCriterion::Time => "time",
            RankCriterion::Accuracy => "accuracy",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(RankCriterion::Score),
            "solved" => Ok(RankCriterion::Solved),
            "time" => Ok(RankCriterion::Time),
            "accuracy" => Ok(RankCriterion::Accuracy),
            other => Err(anyhow!(
                "invalid rank criterion '{}'. expected one of: score | solved | time | accuracy",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Compare two teams under `criterion`: `Less` means `a` ranks strictly
/// before `b`. Returns `Equal` only when the full cascade is exhausted.
pub fn compare(criterion: RankCriterion, a: &TeamRecord, b: &TeamRecord) -> Ordering {
    match criterion {
        RankCriterion::Score => b
            .total_score()
            .cmp(&a.total_score())
            .then_with(|| b.solved_count().cmp(&a.solved_count()))
            .then_with(|| cmp_last_submit_asc(a, b)),

        RankCriterion::Solved => b
            .solved_count()
            .cmp(&a.solved_count())
            .then_with(|| b.total_score().cmp(&a.total_score())),

        RankCriterion::Time => cmp_last_submit_asc(a, b),

        RankCriterion::Accuracy => {
            let da = a.accuracy();
            let db = b.accuracy();
            if (da - db).abs() > ACCURACY_EPSILON {
                db.total_cmp(&da)
            } else {
                b.total_score().cmp(&a.total_score())
            }
        }
    }
}

/// Earlier last-submit ranks first; a team with no submissions orders before
/// any concrete timestamp.
fn cmp_last_submit_asc(a: &TeamRecord, b: &TeamRecord) -> Ordering {
    match (a.last_submit_time(), b.last_submit_time()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(ta), Some(tb)) => ta.cmp(&tb),
    }
}

// ---------------------------------------------------------------------------
// Ranked view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTeam {
    /// 1-based position.
    pub rank: u32,
    pub team: TeamRecord,
}

/// Produce the full ranked view of `snapshot` under `criterion`.
pub fn rank(snapshot: &RosterSnapshot, criterion: RankCriterion) -> Vec<RankedTeam> {
    let mut teams: Vec<TeamRecord> = snapshot.teams().to_vec();
    // Stable sort: teams the cascade cannot separate keep snapshot order,
    // which is itself deterministic per refresh.
    teams.sort_by(|a, b| compare(criterion, a, b));
    teams
        .into_iter()
        .enumerate()
        .map(|(i, team)| RankedTeam {
            rank: (i + 1) as u32,
            team,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
