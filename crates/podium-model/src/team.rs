use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timefmt::{serde_iso8601, serde_iso8601_opt};

/// Points awarded per distinct solved problem. Fixed scoring rule: no partial
/// credit, no penalty term.
pub const POINTS_PER_PROBLEM: i64 = 100;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// One judged submission. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub problem_id: String,
    #[serde(with = "serde_iso8601")]
    pub timestamp: DateTime<Utc>,
    pub is_correct: bool,
    /// Run time in milliseconds. Non-negative.
    #[serde(default)]
    pub run_time: i64,
    /// Memory usage in bytes. Non-negative.
    #[serde(default)]
    pub memory_usage: i64,
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// A submission object exactly as it appears on the wire / in a team file.
///
/// Currently identical to [`Submission`]; kept as an alias so the boundary
/// type can diverge from the domain type without touching call sites.
pub type RawSubmission = Submission;

/// A team object as read verbatim from a `<teamId>_results.json` file or a
/// remote API response.
///
/// `total_score` and `last_submit_time` are advisory: a producer may have
/// written stale values, so derived statistics are always recomputed from the
/// submission list after parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeam {
    pub team_id: String,
    pub team_name: String,
    #[serde(default)]
    pub total_score: i64,
    #[serde(default, with = "serde_iso8601_opt")]
    pub last_submit_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submissions: Vec<RawSubmission>,
}

impl RawTeam {
    /// Convert into a domain record, dropping the advisory fields.
    pub fn into_record(self) -> TeamRecord {
        TeamRecord {
            id: self.team_id,
            name: self.team_name,
            submissions: self.submissions,
        }
    }
}

impl From<&TeamRecord> for RawTeam {
    fn from(t: &TeamRecord) -> Self {
        RawTeam {
            team_id: t.id.clone(),
            team_name: t.name.clone(),
            total_score: t.total_score(),
            last_submit_time: t.last_submit_time(),
            submissions: t.submissions.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// TeamRecord
// ---------------------------------------------------------------------------

/// One team's results. The submission list is ordered as produced by the
/// source; all statistics are derived on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: String,
    pub name: String,
    pub submissions: Vec<Submission>,
}

impl TeamRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            submissions: Vec::new(),
        }
    }

    /// Number of distinct problem ids with at least one correct submission.
    pub fn solved_count(&self) -> usize {
        let mut solved: Vec<&str> = Vec::new();
        for s in &self.submissions {
            if s.is_correct && !solved.contains(&s.problem_id.as_str()) {
                solved.push(&s.problem_id);
            }
        }
        solved.len()
    }

    /// `solved_count * POINTS_PER_PROBLEM`.
    pub fn total_score(&self) -> i64 {
        self.solved_count() as i64 * POINTS_PER_PROBLEM
    }

    pub fn total_submissions(&self) -> usize {
        self.submissions.len()
    }

    /// Correct submissions over total submissions, as a percentage.
    /// 0.0 when the team has no submissions.
    pub fn accuracy(&self) -> f64 {
        if self.submissions.is_empty() {
            return 0.0;
        }
        let correct = self.submissions.iter().filter(|s| s.is_correct).count();
        correct as f64 / self.submissions.len() as f64 * 100.0
    }

    /// Timestamp of the chronologically last submission, `None` when empty.
    pub fn last_submit_time(&self) -> Option<DateTime<Utc>> {
        self.submissions.iter().map(|s| s.timestamp).max()
    }

    /// Mean run time across all submissions in milliseconds, 0 when empty.
    pub fn average_run_time_ms(&self) -> i64 {
        if self.submissions.is_empty() {
            return 0;
        }
        let total: i64 = self.submissions.iter().map(|s| s.run_time).sum();
        total / self.submissions.len() as i64
    }

    pub fn is_problem_solved(&self, problem_id: &str) -> bool {
        self.submissions
            .iter()
            .any(|s| s.problem_id == problem_id && s.is_correct)
    }

    /// Per-problem score: `POINTS_PER_PROBLEM` if solved, else 0.
    pub fn problem_score(&self, problem_id: &str) -> i64 {
        if self.is_problem_solved(problem_id) {
            POINTS_PER_PROBLEM
        } else {
            0
        }
    }

    /// Timestamp of the first correct submission for `problem_id`.
    pub fn problem_solve_time(&self, problem_id: &str) -> Option<DateTime<Utc>> {
        self.submissions
            .iter()
            .find(|s| s.problem_id == problem_id && s.is_correct)
            .map(|s| s.timestamp)
    }

    pub fn push_submission(&mut self, submission: Submission) {
        self.submissions.push(submission);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
