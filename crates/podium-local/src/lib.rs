//! podium-local
//!
//! Local file source for contest results.
//!
//! Scans a data directory for `<teamId>_results.json` files, parsing and
//! integrity-checking each one. Partial-failure semantics throughout: one bad
//! file never aborts the batch, it is recorded as a per-file error and the
//! scan continues. A missing directory is an empty source, not a failure.
//!
//! Change notification lives in [`watch`]: filesystem events are coalesced by
//! the [`debounce`] primitive so a burst of near-simultaneous writes becomes
//! one reload.

pub mod debounce;
pub mod watch;

use std::fmt;
use std::path::{Path, PathBuf};

use podium_model::{RawTeam, TeamRecord};

/// Per-team file naming convention: `<teamId>_results.json`.
pub const TEAM_FILE_SUFFIX: &str = "_results.json";

/// Companion integrity file extension, appended to the full file name.
pub const HASH_FILE_SUFFIX: &str = ".sha256";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// Malformed JSON document.
    Parse,
    /// Companion hash present but mismatched.
    Integrity,
    /// File unreadable.
    Io,
}

#[derive(Debug, Clone)]
pub struct LoadError {
    pub path: PathBuf,
    pub kind: LoadErrorKind,
    pub detail: String,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            LoadErrorKind::Parse => "parse error",
            LoadErrorKind::Integrity => "integrity error",
            LoadErrorKind::Io => "io error",
        };
        write!(f, "{kind} in {}: {}", self.path.display(), self.detail)
    }
}

impl std::error::Error for LoadError {}

// ---------------------------------------------------------------------------
// Load report
// ---------------------------------------------------------------------------

/// Result of one directory scan: successfully verified teams plus per-file
/// errors for everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub teams: Vec<TeamRecord>,
    pub errors: Vec<LoadError>,
}

// ---------------------------------------------------------------------------
// LocalSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LocalSource {
    dir: PathBuf,
}

impl LocalSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the directory and load every team file.
    ///
    /// File order is sorted by name so repeated scans of an unchanged
    /// directory produce an identical roster order.
    pub fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::default();

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                // Missing/unreadable directory degrades to an empty source.
                tracing::debug!(dir = %self.dir.display(), error = %e, "data directory not readable");
                return report;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_team_file(p))
            .collect();
        paths.sort();

        for path in paths {
            match load_team_file(&path) {
                Ok(team) => report.teams.push(team),
                Err(err) => {
                    tracing::warn!(file = %err.path.display(), %err, "skipping team file");
                    report.errors.push(err);
                }
            }
        }

        tracing::debug!(
            dir = %self.dir.display(),
            loaded = report.teams.len(),
            skipped = report.errors.len(),
            "local scan complete"
        );
        report
    }

    /// Load a single team by id via the naming convention.
    pub fn load_team(&self, team_id: &str) -> Result<TeamRecord, LoadError> {
        let path = self.dir.join(format!("{team_id}{TEAM_FILE_SUFFIX}"));
        load_team_file(&path)
    }
}

/// `true` when `path` names a regular team results file.
pub fn is_team_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(TEAM_FILE_SUFFIX))
        .unwrap_or(false)
}

/// Extract the team id from a `<teamId>_results.json` file name.
pub fn team_id_from_file_name(path: &Path) -> Option<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(TEAM_FILE_SUFFIX))
}

/// Companion hash path: the full file name plus `.sha256`.
pub fn hash_companion_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(HASH_FILE_SUFFIX);
    PathBuf::from(os)
}

/// Parse and verify one team file: read → parse → hash-check against the
/// companion (if one exists) → convert to a domain record.
pub fn load_team_file(path: &Path) -> Result<TeamRecord, LoadError> {
    let raw = std::fs::read(path).map_err(|e| LoadError {
        path: path.to_path_buf(),
        kind: LoadErrorKind::Io,
        detail: e.to_string(),
    })?;

    let team: RawTeam = serde_json::from_slice(&raw).map_err(|e| LoadError {
        path: path.to_path_buf(),
        kind: LoadErrorKind::Parse,
        detail: e.to_string(),
    })?;

    let companion = hash_companion_path(path);
    if companion.exists() {
        let stored = std::fs::read_to_string(&companion).map_err(|e| LoadError {
            path: companion.clone(),
            kind: LoadErrorKind::Io,
            detail: e.to_string(),
        })?;
        podium_integrity::verify_bytes(&raw, &stored).map_err(|e| LoadError {
            path: path.to_path_buf(),
            kind: LoadErrorKind::Integrity,
            detail: e.to_string(),
        })?;
    }

    Ok(team.into_record())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
