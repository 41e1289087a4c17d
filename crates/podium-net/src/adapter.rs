//! Response adapters: raw HTTP bodies → [`TeamRecord`] lists.
//!
//! One adapter per configured [`SourceKind`]. A malformed individual record
//! is skipped with a warning; only a body whose overall shape is wrong fails
//! the whole parse.

use serde_json::Value;

use crate::{ConnectorError, SourceKind};
use podium_model::{timefmt, RawTeam, Submission, TeamRecord};

/// Decode `body` according to `kind`.
pub fn parse_teams(kind: SourceKind, body: &[u8]) -> Result<Vec<TeamRecord>, ConnectorError> {
    let doc: Value = serde_json::from_slice(body)
        .map_err(|e| ConnectorError::Decode(format!("response is not valid JSON: {e}")))?;

    match kind {
        SourceKind::BareArray => {
            let arr = doc
                .as_array()
                .ok_or_else(|| ConnectorError::Decode("expected a top-level array".to_string()))?;
            Ok(parse_team_objects(arr))
        }
        SourceKind::TeamsObject => {
            let arr = doc
                .get("teams")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ConnectorError::Decode("expected an object with a 'teams' array".to_string())
                })?;
            Ok(parse_team_objects(arr))
        }
        SourceKind::PlatformRows => {
            let arr = doc.as_array().ok_or_else(|| {
                ConnectorError::Decode("expected a top-level array of rows".to_string())
            })?;
            Ok(parse_platform_rows(arr))
        }
    }
}

/// Map an array of team objects, skipping records that don't fit the schema.
fn parse_team_objects(values: &[Value]) -> Vec<TeamRecord> {
    let mut teams = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        match serde_json::from_value::<RawTeam>(v.clone()) {
            Ok(raw) => teams.push(raw.into_record()),
            Err(e) => {
                tracing::warn!(record = i, error = %e, "skipping malformed team record");
            }
        }
    }
    teams
}

/// Platform scoreboard rows:
/// `[team_id, team_name, [[problem_id, ts, is_correct, run_time, mem], ...]]`.
fn parse_platform_rows(rows: &[Value]) -> Vec<TeamRecord> {
    let mut teams = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        match parse_platform_row(row) {
            Some(team) => teams.push(team),
            None => {
                tracing::warn!(row = i, "skipping malformed scoreboard row");
            }
        }
    }
    teams
}

fn parse_platform_row(row: &Value) -> Option<TeamRecord> {
    let fields = row.as_array()?;
    let id = fields.first()?.as_str()?;
    let name = fields.get(1)?.as_str()?;
    let subs = fields.get(2)?.as_array()?;

    let mut team = TeamRecord::new(id, name);
    for sub in subs {
        // A bad submission entry invalidates the whole row: a partial team
        // would silently under-count its score.
        team.push_submission(parse_platform_submission(sub)?);
    }
    Some(team)
}

fn parse_platform_submission(v: &Value) -> Option<Submission> {
    let fields = v.as_array()?;
    let problem_id = fields.first()?.as_str()?;
    let timestamp = timefmt::parse_iso8601(fields.get(1)?.as_str()?)?;
    let is_correct = fields.get(2)?.as_bool()?;
    let run_time = fields.get(3)?.as_i64()?;
    let memory_usage = fields.get(4)?.as_i64()?;
    Some(Submission {
        problem_id: problem_id.to_string(),
        timestamp,
        is_correct,
        run_time,
        memory_usage,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TEAM_OBJ: &str = r#"{ "team_id": "team01", "team_name": "Alpha",
        "submissions": [
            { "problem_id": "A", "timestamp": "2024-03-01T10:00:00Z",
              "is_correct": true, "run_time": 120, "memory_usage": 1024 }
        ] }"#;

    #[test]
    fn bare_array_shape() {
        let body = format!("[{TEAM_OBJ}]");
        let teams = parse_teams(SourceKind::BareArray, body.as_bytes()).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].id, "team01");
        assert_eq!(teams[0].total_score(), 100);
    }

    #[test]
    fn teams_object_shape() {
        let body = format!(r#"{{ "contest": "Regional", "teams": [{TEAM_OBJ}] }}"#);
        let teams = parse_teams(SourceKind::TeamsObject, body.as_bytes()).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].name, "Alpha");
    }

    #[test]
    fn platform_rows_shape() {
        let body = r#"[
            ["team01", "Alpha", [["A", "2024-03-01T10:00:00Z", true, 120, 1024],
                                  ["B", "2024-03-01T10:30:00Z", false, 500, 2048]]],
            ["team02", "Beta", []]
        ]"#;
        let teams = parse_teams(SourceKind::PlatformRows, body.as_bytes()).unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].solved_count(), 1);
        assert_eq!(teams[0].total_submissions(), 2);
        assert_eq!(teams[1].total_submissions(), 0);
    }

    #[test]
    fn malformed_record_skipped_not_fatal() {
        let body = format!(r#"[{TEAM_OBJ}, {{ "name_only": true }}, {TEAM_OBJ2}]"#,
            TEAM_OBJ2 = r#"{ "team_id": "team02", "team_name": "Beta" }"#);
        let teams = parse_teams(SourceKind::BareArray, body.as_bytes()).unwrap();
        let ids: Vec<&str> = teams.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["team01", "team02"]);
    }

    #[test]
    fn malformed_platform_row_skipped() {
        let body = r#"[
            ["team01", "Alpha", []],
            ["missing-submissions-field"],
            ["team02", "Beta", [["A", "not a timestamp", true, 1, 1]]]
        ]"#;
        let teams = parse_teams(SourceKind::PlatformRows, body.as_bytes()).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].id, "team01");
    }

    #[test]
    fn wrong_overall_shape_is_an_error() {
        assert!(parse_teams(SourceKind::BareArray, br#"{ "teams": [] }"#).is_err());
        assert!(parse_teams(SourceKind::TeamsObject, b"[]").is_err());
        assert!(parse_teams(SourceKind::PlatformRows, br#"{ "rows": [] }"#).is_err());
        assert!(parse_teams(SourceKind::BareArray, b"not json").is_err());
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(parse_teams(SourceKind::BareArray, b"[]").unwrap().is_empty());
        let teams = parse_teams(SourceKind::TeamsObject, br#"{ "teams": [] }"#).unwrap();
        assert!(teams.is_empty());
    }
}
