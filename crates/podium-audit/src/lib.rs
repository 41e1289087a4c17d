//! podium-audit
//!
//! Append-only audit trail for refresh/reconcile/network activity.
//!
//! Single-writer. Events are held in an in-memory ring capped at the most
//! recent [`DEFAULT_CAP`] entries and optionally appended to a JSON Lines
//! file (one canonical-JSON event per line). An optional hash chain
//! (hash_prev + hash_self) makes the file tamper-evident; the chain can be
//! verified offline with [`verify_hash_chain_str`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// In-memory retention: most recent 1000 entries.
pub const DEFAULT_CAP: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonically increasing sequence number, starting at 0.
    pub seq: u64,
    pub ts_utc: DateTime<Utc>,
    pub topic: String,
    pub message: String,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Append-only audit writer with a bounded in-memory ring.
pub struct AuditLog {
    path: Option<PathBuf>,
    hash_chain: bool,
    last_hash: Option<String>,
    seq: u64,
    ring: VecDeque<AuditEvent>,
    cap: usize,
}

impl AuditLog {
    /// In-memory only log, default cap.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            hash_chain: false,
            last_hash: None,
            seq: 0,
            ring: VecDeque::new(),
            cap: DEFAULT_CAP,
        }
    }

    /// Log that also appends to a JSONL file, creating parent dirs.
    pub fn with_file(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {:?}", parent))?;
        }
        Ok(Self {
            path: Some(path),
            hash_chain,
            last_hash: None,
            seq: 0,
            ring: VecDeque::new(),
            cap: DEFAULT_CAP,
        })
    }

    /// Override the in-memory retention cap (tests).
    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap.max(1);
        while self.ring.len() > self.cap {
            self.ring.pop_front();
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Retained events, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &AuditEvent> {
        self.ring.iter()
    }

    /// Append one event. Oldest retained entry is dropped beyond the cap;
    /// the file (if any) keeps everything.
    pub fn append(&mut self, topic: &str, message: impl Into<String>) -> Result<AuditEvent> {
        let mut ev = AuditEvent {
            seq: self.seq,
            ts_utc: Utc::now(),
            topic: topic.to_string(),
            message: message.into(),
            hash_prev: None,
            hash_self: None,
        };
        self.seq += 1;

        if self.hash_chain {
            ev.hash_prev = self.last_hash.clone();
            let self_hash = compute_event_hash(&ev)?;
            ev.hash_self = Some(self_hash.clone());
            self.last_hash = Some(self_hash);
        }

        if let Some(path) = &self.path {
            let line = canonical_json_line(&ev)?;
            append_line(path, &line)?;
        }

        self.ring.push_back(ev.clone());
        while self.ring.len() > self.cap {
            self.ring.pop_front();
        }

        Ok(ev)
    }
}

// ---------------------------------------------------------------------------
// Canonical JSON + hash chain
// ---------------------------------------------------------------------------

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
/// One event == one JSON line.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit event failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Event hash over canonical JSON WITHOUT hash_self (to avoid self-reference).
pub fn compute_event_hash(ev: &AuditEvent) -> Result<String> {
    let mut clone = ev.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

/// Verify the hash chain integrity of JSONL audit content.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let ev: AuditEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit event at line {}", i + 1))?;

        line_count += 1;

        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, ev.hash_prev
                ),
            });
        }

        if let Some(ref claimed) = ev.hash_self {
            let recomputed = compute_event_hash(&ev)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed, recomputed
                    ),
                });
            }
        }

        prev_hash = ev.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

/// Verify the hash chain of an audit log file.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read audit log {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
