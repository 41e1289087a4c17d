//! podium-testkit
//!
//! Shared fixtures for integration scenarios: team builders and data-dir
//! writers that produce files exactly as a contest producer would, pretty
//! JSON plus a canonical-compact hash companion.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};

use podium_local::{hash_companion_path, TEAM_FILE_SUFFIX};
use podium_model::{RawTeam, Submission, TeamRecord};

/// Contest-morning baseline used across fixtures.
pub fn contest_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// A submission `minutes` into the contest.
pub fn submission(problem: &str, minutes: i64, correct: bool) -> Submission {
    Submission {
        problem_id: problem.to_string(),
        timestamp: contest_start() + chrono::Duration::minutes(minutes),
        is_correct: correct,
        run_time: 100,
        memory_usage: 64 * 1024,
    }
}

/// Team with the given `(problem, minutes, correct)` submission history.
pub fn team(id: &str, name: &str, history: &[(&str, i64, bool)]) -> TeamRecord {
    let mut t = TeamRecord::new(id, name);
    for (p, m, ok) in history {
        t.push_submission(submission(p, *m, *ok));
    }
    t
}

/// Write `team` as `<id>_results.json` (pretty-printed) with a matching
/// canonical-compact hash companion. Returns the team file path.
pub fn write_team_file(dir: &Path, team: &TeamRecord) -> Result<PathBuf> {
    let raw = RawTeam::from(team);
    let body = serde_json::to_string_pretty(&raw).context("serialize team file")?;
    let path = dir.join(format!("{}{TEAM_FILE_SUFFIX}", team.id));
    std::fs::write(&path, &body).with_context(|| format!("write {:?}", path))?;

    let hash = podium_integrity::canonical_hash(body.as_bytes())
        .context("hash team file")?;
    std::fs::write(hash_companion_path(&path), hash).context("write hash companion")?;
    Ok(path)
}

/// Write `team` with a deliberately wrong hash companion, simulating a
/// partially-written or tampered file.
pub fn write_tampered_team_file(dir: &Path, team: &TeamRecord) -> Result<PathBuf> {
    let path = write_team_file(dir, team)?;
    std::fs::write(hash_companion_path(&path), "0".repeat(64))
        .context("write bogus hash companion")?;
    Ok(path)
}

/// Write `team` without any hash companion (integrity checking not opted in).
pub fn write_team_file_without_hash(dir: &Path, team: &TeamRecord) -> Result<PathBuf> {
    let raw = RawTeam::from(team);
    let body = serde_json::to_string_pretty(&raw).context("serialize team file")?;
    let path = dir.join(format!("{}{TEAM_FILE_SUFFIX}", team.id));
    std::fs::write(&path, &body).with_context(|| format!("write {:?}", path))?;
    Ok(path)
}
