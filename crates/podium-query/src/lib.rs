//! podium-query
//!
//! Ad-hoc analytical queries over a roster snapshot.
//!
//! Pure, read-only operations: every function takes `&RosterSnapshot` and
//! returns owned results. The contract is defined independently of the
//! backing structure. Today each call is a full scan/sort, which is fine at
//! contest scale (tens to low hundreds of teams); an order-statistics tree
//! could replace the internals without touching any signature here.

use anyhow::{Context, Result};
use globset::GlobBuilder;
use std::cmp::Ordering;

use podium_model::{RosterSnapshot, TeamRecord};
use podium_rank::{compare, rank, RankCriterion, RankedTeam};

// ---------------------------------------------------------------------------
// Ranked views
// ---------------------------------------------------------------------------

/// Full ranked view under `criterion` (1-based positions, no shared ranks).
pub fn sorted_by(snapshot: &RosterSnapshot, criterion: RankCriterion) -> Vec<RankedTeam> {
    rank(snapshot, criterion)
}

/// Best `n` teams by the score cascade, clipped to roster size.
pub fn top_n(snapshot: &RosterSnapshot, n: usize) -> Vec<TeamRecord> {
    rank(snapshot, RankCriterion::Score)
        .into_iter()
        .take(n)
        .map(|r| r.team)
        .collect()
}

/// Worst `n` teams, score ascending, clipped to roster size.
pub fn bottom_n(snapshot: &RosterSnapshot, n: usize) -> Vec<TeamRecord> {
    let ranked = rank(snapshot, RankCriterion::Score);
    ranked
        .into_iter()
        .rev()
        .take(n)
        .map(|r| r.team)
        .collect()
}

/// Teams with `min <= total_score <= max`, sorted by score descending.
pub fn score_range(snapshot: &RosterSnapshot, min: i64, max: i64) -> Vec<TeamRecord> {
    rank(snapshot, RankCriterion::Score)
        .into_iter()
        .map(|r| r.team)
        .filter(|t| {
            let s = t.total_score();
            s >= min && s <= max
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Searches
// ---------------------------------------------------------------------------

/// Case-insensitive glob match (`*`, `?`) against the whole team name.
pub fn search_by_name(snapshot: &RosterSnapshot, pattern: &str) -> Result<Vec<TeamRecord>> {
    let matcher = GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid name pattern '{pattern}'"))?
        .compile_matcher();

    Ok(snapshot
        .teams()
        .iter()
        .filter(|t| matcher.is_match(&t.name))
        .cloned()
        .collect())
}

/// Teams with at least `min_count` solved problems, solved descending.
pub fn search_by_solved(snapshot: &RosterSnapshot, min_count: usize) -> Vec<TeamRecord> {
    let mut out: Vec<TeamRecord> = snapshot
        .teams()
        .iter()
        .filter(|t| t.solved_count() >= min_count)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.solved_count().cmp(&a.solved_count()));
    out
}

/// Teams with accuracy of at least `min_percent`, accuracy descending.
pub fn search_by_accuracy(snapshot: &RosterSnapshot, min_percent: f64) -> Vec<TeamRecord> {
    let mut out: Vec<TeamRecord> = snapshot
        .teams()
        .iter()
        .filter(|t| t.accuracy() >= min_percent)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.accuracy().total_cmp(&a.accuracy()));
    out
}

// ---------------------------------------------------------------------------
// Rank lookup + aggregates
// ---------------------------------------------------------------------------

/// 1-based position of `team_id` under the score criterion: one more than
/// the number of teams ordered strictly before it by the score cascade.
/// `None` when the id is not in the roster.
pub fn rank_of(snapshot: &RosterSnapshot, team_id: &str) -> Option<u32> {
    let target = snapshot.get(team_id)?;
    let before = snapshot
        .teams()
        .iter()
        .filter(|t| compare(RankCriterion::Score, t, target) == Ordering::Less)
        .count();
    Some(before as u32 + 1)
}

/// Arithmetic mean of total scores, 0 for an empty roster.
pub fn average_score(snapshot: &RosterSnapshot) -> f64 {
    if snapshot.is_empty() {
        return 0.0;
    }
    let total: i64 = snapshot.teams().iter().map(|t| t.total_score()).sum();
    total as f64 / snapshot.len() as f64
}

/// Median of total scores: middle element for odd counts, mean of the two
/// middle elements for even counts, 0 for an empty roster.
pub fn median_score(snapshot: &RosterSnapshot) -> f64 {
    if snapshot.is_empty() {
        return 0.0;
    }
    let mut scores: Vec<i64> = snapshot.teams().iter().map(|t| t.total_score()).collect();
    scores.sort_unstable();

    let n = scores.len();
    if n % 2 == 0 {
        (scores[n / 2 - 1] + scores[n / 2]) as f64 / 2.0
    } else {
        scores[n / 2] as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use podium_model::Submission;

    fn team(id: &str, name: &str, solved: usize, wrong: usize) -> TeamRecord {
        let mut t = TeamRecord::new(id, name);
        let base = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        for i in 0..solved {
            t.push_submission(Submission {
                problem_id: format!("P{i}"),
                timestamp: base + chrono::Duration::minutes(i as i64),
                is_correct: true,
                run_time: 100,
                memory_usage: 0,
            });
        }
        for i in 0..wrong {
            t.push_submission(Submission {
                problem_id: format!("W{i}"),
                timestamp: base + chrono::Duration::minutes((solved + i) as i64),
                is_correct: false,
                run_time: 100,
                memory_usage: 0,
            });
        }
        t
    }

    fn roster() -> RosterSnapshot {
        RosterSnapshot::new(vec![
            team("team01", "team01", 3, 0),   // 300
            team("team02", "team_alpha", 2, 2), // 200, 50%
            team("team03", "beta_team", 1, 0),  // 100
        ])
    }

    #[test]
    fn sorted_by_score_covers_whole_roster_with_consecutive_ranks() {
        let snap = roster();
        let ranked = sorted_by(&snap, RankCriterion::Score);
        assert_eq!(ranked.len(), snap.len());
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn top_n_clips_to_roster_size() {
        let snap = roster();
        let top = top_n(&snap, 10);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].id, "team01");
    }

    #[test]
    fn bottom_n_is_score_ascending() {
        let snap = roster();
        let bottom = bottom_n(&snap, 2);
        assert_eq!(bottom[0].id, "team03");
        assert_eq!(bottom[1].id, "team02");
    }

    #[test]
    fn score_range_inclusive_descending() {
        let snap = roster();
        let hits = score_range(&snap, 100, 200);
        let ids: Vec<&str> = hits.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["team02", "team03"]);
    }

    #[test]
    fn name_search_glob_prefix() {
        let snap = roster();
        let hits = search_by_name(&snap, "team*").unwrap();
        let names: Vec<&str> = hits.iter().map(|t| t.name.as_str()).collect();
        // Prefix wildcard: matches "team01" and "team_alpha", not "beta_team".
        assert_eq!(names, vec!["team01", "team_alpha"]);
    }

    #[test]
    fn name_search_is_case_insensitive() {
        let snap = roster();
        let hits = search_by_name(&snap, "TEAM*").unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn name_search_single_char_wildcard() {
        let snap = roster();
        let hits = search_by_name(&snap, "team0?").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "team01");
    }

    #[test]
    fn solved_search_filters_and_sorts() {
        let snap = roster();
        let hits = search_by_solved(&snap, 2);
        let ids: Vec<&str> = hits.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["team01", "team02"]);
    }

    #[test]
    fn accuracy_search_filters_and_sorts() {
        let snap = roster();
        let hits = search_by_accuracy(&snap, 60.0);
        // team02 is at 50% and drops out.
        let ids: Vec<&str> = hits.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["team01", "team03"]);
    }

    #[test]
    fn rank_of_matches_sorted_position() {
        let snap = roster();
        let ranked = sorted_by(&snap, RankCriterion::Score);
        for r in &ranked {
            assert_eq!(rank_of(&snap, &r.team.id), Some(r.rank));
        }
        assert_eq!(rank_of(&snap, "ghost"), None);
    }

    #[test]
    fn average_score_mean() {
        let snap = roster();
        assert!((average_score(&snap) - 200.0).abs() < 1e-9);
        assert_eq!(average_score(&RosterSnapshot::empty()), 0.0);
    }

    #[test]
    fn median_odd_is_middle() {
        // scores 300, 200, 100
        assert_eq!(median_score(&roster()), 200.0);
    }

    #[test]
    fn median_even_is_mean_of_middle_two() {
        let snap = RosterSnapshot::new(vec![team("a", "a", 1, 0), team("b", "b", 2, 0)]);
        assert_eq!(median_score(&snap), 150.0);
        assert_eq!(median_score(&RosterSnapshot::empty()), 0.0);
    }
}
