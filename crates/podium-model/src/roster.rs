use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::team::TeamRecord;

/// Immutable point-in-time roster.
///
/// Teams are ordered by insertion and unique by id. A refresh cycle always
/// produces a *new* snapshot; published snapshots are shared as
/// `Arc<RosterSnapshot>` and never mutated, so rankers and query consumers
/// can hold one across a refresh without locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    teams: Vec<TeamRecord>,
    created_at: DateTime<Utc>,
}

impl RosterSnapshot {
    /// Build a snapshot stamped with the current time. Duplicate ids keep the
    /// last occurrence, matching overlay semantics.
    pub fn new(teams: Vec<TeamRecord>) -> Self {
        Self::at(teams, Utc::now())
    }

    /// Build a snapshot with an explicit creation time (tests, replay).
    pub fn at(teams: Vec<TeamRecord>, created_at: DateTime<Utc>) -> Self {
        let mut unique: Vec<TeamRecord> = Vec::with_capacity(teams.len());
        for team in teams {
            if let Some(existing) = unique.iter_mut().find(|t| t.id == team.id) {
                *existing = team;
            } else {
                unique.push(team);
            }
        }
        Self {
            teams: unique,
            created_at,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn teams(&self) -> &[TeamRecord] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn get(&self, team_id: &str) -> Option<&TeamRecord> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    /// Sorted distinct problem ids appearing anywhere in the roster.
    pub fn available_problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = Vec::new();
        for team in &self.teams {
            for sub in &team.submissions {
                if !problems.contains(&sub.problem_id) {
                    problems.push(sub.problem_id.clone());
                }
            }
        }
        problems.sort();
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Submission;
    use crate::timefmt::parse_iso8601;

    fn team(id: &str, problems: &[(&str, bool)]) -> TeamRecord {
        let mut t = TeamRecord::new(id, id.to_uppercase());
        for (i, (p, correct)) in problems.iter().enumerate() {
            t.push_submission(Submission {
                problem_id: p.to_string(),
                timestamp: parse_iso8601("2024-03-01T10:00:00Z").unwrap()
                    + chrono::Duration::minutes(i as i64),
                is_correct: *correct,
                run_time: 0,
                memory_usage: 0,
            });
        }
        t
    }

    #[test]
    fn preserves_insertion_order() {
        let snap = RosterSnapshot::new(vec![
            team("b", &[]),
            team("a", &[]),
            team("c", &[]),
        ]);
        let ids: Vec<&str> = snap.teams().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn duplicate_id_keeps_last_at_first_position() {
        let mut replacement = team("a", &[("A", true)]);
        replacement.name = "Replacement".to_string();
        let snap = RosterSnapshot::new(vec![team("a", &[]), team("b", &[]), replacement]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.teams()[0].name, "Replacement");
    }

    #[test]
    fn get_by_id() {
        let snap = RosterSnapshot::new(vec![team("a", &[]), team("b", &[])]);
        assert!(snap.get("b").is_some());
        assert!(snap.get("zz").is_none());
    }

    #[test]
    fn available_problems_sorted_distinct() {
        let snap = RosterSnapshot::new(vec![
            team("a", &[("C", true), ("A", false)]),
            team("b", &[("A", true), ("B", true)]),
        ]);
        assert_eq!(snap.available_problems(), vec!["A", "B", "C"]);
    }
}
