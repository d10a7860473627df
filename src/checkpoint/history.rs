use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use thiserror::Error;

use super::record::CheckpointRecord;

/// Maximum number of checkpoint records retained per vbucket.
pub const MAX_CHECKPOINTS_KEPT: usize = 100;

/// Errors surfaced when restoring a persisted checkpoint document.
#[derive(Debug, Error)]
pub enum CheckpointDocError {
    #[error("persisted checkpoint document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("checkpoint document checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },
}

#[derive(Serialize, Deserialize)]
struct PersistedCheckpoints {
    checkpoints: Vec<CheckpointRecord>,
    checksum: String,
}

/// Newest-first ring of checkpoint records for one vbucket.
///
/// A logical ring: insert at the head, drop from the tail past
/// [`MAX_CHECKPOINTS_KEPT`]. Adding a record identical to the head is a no-op,
/// so an idle pipeline does not churn its persisted history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointHistory {
    records: VecDeque<CheckpointRecord>,
}

impl CheckpointHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent record, if any.
    pub fn head(&self) -> Option<&CheckpointRecord> {
        self.records.front()
    }

    /// Retained records, newest first.
    pub fn records(&self) -> impl Iterator<Item = &CheckpointRecord> {
        self.records.iter()
    }

    /// Inserts `record` at the head, dropping the oldest record once the ring
    /// is full. Returns `false` when the record equals the current head.
    pub fn add(&mut self, record: CheckpointRecord) -> bool {
        if self.records.front().is_some_and(|head| *head == record) {
            return false;
        }
        self.records.push_front(record);
        self.records.truncate(MAX_CHECKPOINTS_KEPT);
        true
    }

    /// Serializes the history into a checksummed document.
    pub fn to_persisted(&self) -> Result<String, serde_json::Error> {
        let checkpoints: Vec<CheckpointRecord> = self.records.iter().cloned().collect();
        let checksum = records_checksum(&checkpoints)?;
        serde_json::to_string(&PersistedCheckpoints {
            checkpoints,
            checksum,
        })
    }

    /// Restores a history from a persisted document, verifying its checksum.
    ///
    /// Corruption refuses the restore; the caller starts from an empty
    /// history (and the tracker from seqno 0) instead of trusting the
    /// document.
    pub fn from_persisted(payload: &str) -> Result<Self, CheckpointDocError> {
        let doc: PersistedCheckpoints = serde_json::from_str(payload)?;
        let computed = records_checksum(&doc.checkpoints)?;
        if computed != doc.checksum {
            return Err(CheckpointDocError::ChecksumMismatch {
                stored: doc.checksum,
                computed,
            });
        }
        let mut records: VecDeque<CheckpointRecord> = doc.checkpoints.into();
        records.truncate(MAX_CHECKPOINTS_KEPT);
        Ok(Self { records })
    }
}

fn records_checksum(records: &[CheckpointRecord]) -> Result<String, serde_json::Error> {
    let body = serde_json::to_vec(records)?;
    let digest = Sha256::digest(&body);
    let mut encoded = String::with_capacity(digest.len() * 2);
    for byte in digest {
        encoded.push_str(&format!("{byte:02x}"));
    }
    Ok(encoded)
}
