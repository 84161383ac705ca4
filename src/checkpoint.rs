// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Checkpoint store.
//!
//! Checkpoints are a cache: full states captured at a commit so replay can
//! start there instead of at genesis. The log stays canonical. A checkpoint
//! is only trusted after its state hash has been recomputed and its commit
//! hash matched against the log; dropping every checkpoint loses nothing.

use crate::commit::Commit;
use crate::error::IntegrityViolation;
use crate::log::CommitLog;
use crate::snapshot::blake3::hash_state;
use crate::state::graph::GraphState;
use crate::types::id::Hash;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub(crate) commit_seq: u64,
    pub(crate) commit_hash: Hash,
    pub(crate) state: GraphState,
    pub(crate) state_hash: Hash,
}

impl Checkpoint {
    /// Captures `state`, which must be the materialized state at `commit`.
    pub fn capture(commit: &Commit, state: GraphState) -> Self {
        let state_hash = hash_state(&state);
        Self {
            commit_seq: commit.seq(),
            commit_hash: commit.hash(),
            state,
            state_hash,
        }
    }

    pub fn commit_seq(&self) -> u64 {
        self.commit_seq
    }

    pub fn commit_hash(&self) -> Hash {
        self.commit_hash
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn state_hash(&self) -> Hash {
        self.state_hash
    }

    /// Recomputes the state hash over the whole node table and compares it
    /// to the stored one.
    pub fn verify(&self) -> bool {
        hash_state(&self.state) == self.state_hash
    }

    /// Full check: state hash intact and the commit it claims to belong to
    /// is the one the log holds at that sequence number.
    pub fn verify_against(&self, log: &CommitLog) -> Result<(), IntegrityViolation> {
        if !self.verify() {
            return Err(IntegrityViolation::CheckpointState { seq: self.commit_seq });
        }
        match log.get(self.commit_seq) {
            Some(commit) if commit.hash() == self.commit_hash => Ok(()),
            _ => Err(IntegrityViolation::CheckpointCommit { seq: self.commit_seq }),
        }
    }
}

/// Checkpoints ordered by commit sequence, at most one per commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckpointStore {
    entries: Vec<Checkpoint>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(mut entries: Vec<Checkpoint>) -> Self {
        entries.sort_by_key(|c| c.commit_seq);
        entries.dedup_by_key(|c| c.commit_seq);
        Self { entries }
    }

    pub fn insert(&mut self, checkpoint: Checkpoint) {
        match self
            .entries
            .binary_search_by_key(&checkpoint.commit_seq, |c| c.commit_seq)
        {
            Ok(i) => self.entries[i] = checkpoint,
            Err(i) => self.entries.insert(i, checkpoint),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Checkpoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.entries.last()
    }

    pub fn get(&self, seq: u64) -> Option<&Checkpoint> {
        self.entries
            .binary_search_by_key(&seq, |c| c.commit_seq)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Candidates for replaying up to `seq`, newest first.
    pub fn at_or_before(&self, seq: u64) -> impl Iterator<Item = &Checkpoint> {
        let end = self.entries.partition_point(|c| c.commit_seq <= seq);
        self.entries[..end].iter().rev()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn into_vec(self) -> Vec<Checkpoint> {
        self.entries
    }
}
