use podium_model::TeamRecord;

/// Overlay `remote` onto `baseline` by team id.
///
/// Ids present in both take the remote record at the baseline position; new
/// remote ids are appended in remote order; baseline-only ids are preserved.
/// This is the deliberate merge-don't-replace policy that tolerates a
/// transiently incomplete remote team list.
pub fn merge_overlay(baseline: Vec<TeamRecord>, remote: Vec<TeamRecord>) -> Vec<TeamRecord> {
    let mut merged = baseline;
    for team in remote {
        match merged.iter_mut().find(|t| t.id == team.id) {
            Some(slot) => *slot = team,
            None => merged.push(team),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_model::Submission;

    fn team(id: &str, solved: usize) -> TeamRecord {
        let mut t = TeamRecord::new(id, id.to_uppercase());
        for i in 0..solved {
            t.push_submission(Submission {
                problem_id: format!("P{i}"),
                timestamp: chrono::DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
                    .unwrap()
                    .with_timezone(&chrono::Utc),
                is_correct: true,
                run_time: 0,
                memory_usage: 0,
            });
        }
        t
    }

    #[test]
    fn remote_overlays_matching_ids_and_preserves_local_only() {
        // local {A:100, B:200}, remote {B:300, C:100}
        let baseline = vec![team("A", 1), team("B", 2)];
        let remote = vec![team("B", 3), team("C", 1)];

        let merged = merge_overlay(baseline, remote);
        let view: Vec<(&str, i64)> = merged
            .iter()
            .map(|t| (t.id.as_str(), t.total_score()))
            .collect();
        assert_eq!(view, vec![("A", 100), ("B", 300), ("C", 100)]);
    }

    #[test]
    fn empty_remote_changes_nothing() {
        let merged = merge_overlay(vec![team("A", 1)], Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "A");
    }

    #[test]
    fn empty_baseline_takes_remote_order() {
        let merged = merge_overlay(Vec::new(), vec![team("Z", 1), team("A", 1)]);
        let ids: Vec<&str> = merged.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "A"]);
    }
}
