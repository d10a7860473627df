use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

/// Change-journal entries retained for observers.
pub const SPEC_JOURNAL_RETENTION: usize = 256;

/// Metadata describing one replication between a source bucket and a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationSpec {
    pub id: String,
    pub source_bucket: String,
    pub target_cluster: String,
    pub target_bucket: String,
    pub active: bool,
}

impl ReplicationSpec {
    /// Creates an active spec with the conventional id
    /// `source_bucket/target_cluster/target_bucket`.
    pub fn new(
        source_bucket: impl Into<String>,
        target_cluster: impl Into<String>,
        target_bucket: impl Into<String>,
    ) -> Self {
        let source_bucket = source_bucket.into();
        let target_cluster = target_cluster.into();
        let target_bucket = target_bucket.into();
        Self {
            id: format!("{source_bucket}/{target_cluster}/{target_bucket}"),
            source_bucket,
            target_cluster,
            target_bucket,
            active: true,
        }
    }
}

/// Mutation recorded in the registry's change journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecChange {
    Added { id: String },
    Updated { id: String },
    Deleted { id: String },
}

/// Journal entry pairing a change with the revision that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecChangeEntry {
    pub revision: u64,
    pub change: SpecChange,
}

/// Errors raised by registry mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecRegistryError {
    #[error("replication spec {id} already exists")]
    SpecExists { id: String },
    #[error("replication spec {id} is not registered")]
    UnknownSpec { id: String },
}

/// In-memory registry of replication specs.
///
/// Every mutation bumps a revision counter and appends to a bounded change
/// journal; observers poll `changes_since` instead of registering callbacks.
#[derive(Debug, Clone, Default)]
pub struct ReplicationSpecRegistry {
    specs: BTreeMap<String, ReplicationSpec>,
    revision: u64,
    journal: VecDeque<SpecChangeEntry>,
}

impl ReplicationSpecRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision of the most recent mutation (0 when pristine).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Registers a new spec.
    pub fn add_spec(&mut self, spec: ReplicationSpec) -> Result<(), SpecRegistryError> {
        if self.specs.contains_key(&spec.id) {
            return Err(SpecRegistryError::SpecExists { id: spec.id });
        }
        let id = spec.id.clone();
        self.specs.insert(id.clone(), spec);
        self.record(SpecChange::Added { id });
        Ok(())
    }

    /// Replaces an existing spec.
    pub fn set_spec(&mut self, spec: ReplicationSpec) -> Result<(), SpecRegistryError> {
        if !self.specs.contains_key(&spec.id) {
            return Err(SpecRegistryError::UnknownSpec { id: spec.id });
        }
        let id = spec.id.clone();
        self.specs.insert(id.clone(), spec);
        self.record(SpecChange::Updated { id });
        Ok(())
    }

    /// Removes a spec and returns it.
    pub fn del_spec(&mut self, id: &str) -> Result<ReplicationSpec, SpecRegistryError> {
        let spec = self
            .specs
            .remove(id)
            .ok_or_else(|| SpecRegistryError::UnknownSpec { id: id.to_string() })?;
        self.record(SpecChange::Deleted { id: id.to_string() });
        Ok(spec)
    }

    /// Looks up a spec by id.
    pub fn spec(&self, id: &str) -> Result<&ReplicationSpec, SpecRegistryError> {
        self.specs
            .get(id)
            .ok_or_else(|| SpecRegistryError::UnknownSpec { id: id.to_string() })
    }

    /// All currently active specs.
    pub fn active_specs(&self) -> Vec<&ReplicationSpec> {
        self.specs.values().filter(|spec| spec.active).collect()
    }

    /// Ids of active specs replicating out of `bucket`.
    pub fn active_spec_ids_for_bucket(&self, bucket: &str) -> Vec<String> {
        self.specs
            .values()
            .filter(|spec| spec.active && spec.source_bucket == bucket)
            .map(|spec| spec.id.clone())
            .collect()
    }

    /// Journal entries with revision strictly greater than `revision`.
    pub fn changes_since(&self, revision: u64) -> Vec<SpecChangeEntry> {
        self.journal
            .iter()
            .filter(|entry| entry.revision > revision)
            .cloned()
            .collect()
    }

    fn record(&mut self, change: SpecChange) {
        self.revision += 1;
        if self.journal.len() == SPEC_JOURNAL_RETENTION {
            self.journal.pop_front();
        }
        self.journal.push_back(SpecChangeEntry {
            revision: self.revision,
            change,
        });
    }
}
