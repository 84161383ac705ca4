// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Commit records.
//!
//! A commit is immutable once sealed. Its hash covers the parent hash, the
//! metadata and the ordered mutation set, so editing any of them, or
//! re-parenting the commit, is detectable by re-walking the chain.

use crate::snapshot::blake3::hash_commit;
use crate::state::mutation::Mutation;
use crate::types::id::Hash;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetadata {
    /// Milliseconds since the Unix epoch, supplied by the writer.
    pub timestamp: u64,
    #[serde(default)]
    pub label: Option<String>,
    /// Opaque caller data. Hashed, never interpreted.
    #[serde(default)]
    pub user_data: Option<Vec<u8>>,
}

impl CommitMetadata {
    pub fn at(timestamp: u64) -> Self {
        Self {
            timestamp,
            label: None,
            user_data: None,
        }
    }

    /// Metadata stamped with the current wall-clock time. Only writers read
    /// the clock; replay never does.
    pub fn now() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::at(timestamp)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_user_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.user_data = Some(data.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub(crate) seq: u64,
    pub(crate) parent_hash: Option<Hash>,
    pub(crate) hash: Hash,
    pub(crate) metadata: CommitMetadata,
    pub(crate) mutations: Vec<Mutation>,
}

impl Commit {
    /// Builds a commit and computes its chained hash.
    pub(crate) fn seal(
        seq: u64,
        parent_hash: Option<Hash>,
        metadata: CommitMetadata,
        mutations: Vec<Mutation>,
    ) -> Self {
        let hash = hash_commit(parent_hash.as_ref(), &metadata, &mutations);
        Self {
            seq,
            parent_hash,
            hash,
            metadata,
            mutations,
        }
    }

    /// Re-parents the commit and recomputes its hash. Only compaction does
    /// this, when the prefix the commit used to hang off is retired.
    pub(crate) fn reanchor(&mut self, parent_hash: Option<Hash>) {
        self.parent_hash = parent_hash;
        self.hash = self.computed_hash();
    }

    pub fn computed_hash(&self) -> Hash {
        hash_commit(self.parent_hash.as_ref(), &self.metadata, &self.mutations)
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn parent_hash(&self) -> Option<Hash> {
        self.parent_hash
    }

    pub fn metadata(&self) -> &CommitMetadata {
        &self.metadata
    }

    pub fn label(&self) -> Option<&str> {
        self.metadata.label.as_deref()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}

/// Compact view of a commit for history listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSummary {
    pub seq: u64,
    pub hash: Hash,
    pub timestamp: u64,
    pub label: Option<String>,
    pub mutation_count: usize,
}

impl From<&Commit> for CommitSummary {
    fn from(c: &Commit) -> Self {
        Self {
            seq: c.seq,
            hash: c.hash,
            timestamp: c.metadata.timestamp,
            label: c.metadata.label.clone(),
            mutation_count: c.mutations.len(),
        }
    }
}
