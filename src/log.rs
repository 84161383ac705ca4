// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only, hash-chained commit log.
//!
//! The log is the canonical history. It never edits an appended commit;
//! the only rewrite is compaction retiring a prefix, which produces a new
//! log rather than changing this one.

use crate::commit::{Commit, CommitMetadata};
use crate::error::{IntegrityViolation, MutationFault, MyosotisError, Result};
use crate::state::graph::GraphState;
use crate::state::mutation::Mutation;
use crate::types::id::Hash;
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct CommitLog {
    /// Sequence number the genesis state stands for (0 for true genesis).
    base_seq: u64,
    /// Hash the first commit chains to (`None` for true genesis).
    anchor: Option<Hash>,
    commits: Vec<Commit>,
    by_hash: FxHashMap<Hash, usize>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from stored parts. Nothing is verified here; see
    /// [`CommitLog::verify_chain`].
    pub fn from_parts(base_seq: u64, anchor: Option<Hash>, commits: Vec<Commit>) -> Self {
        let by_hash = commits
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash, i))
            .collect();
        Self {
            base_seq,
            anchor,
            commits,
            by_hash,
        }
    }

    // --- Read APIs ---

    pub fn base_seq(&self) -> u64 {
        self.base_seq
    }

    pub fn anchor(&self) -> Option<Hash> {
        self.anchor
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn tip_seq(&self) -> u64 {
        self.commits.last().map_or(self.base_seq, |c| c.seq)
    }

    pub fn tip_hash(&self) -> Option<Hash> {
        self.commits.last().map(|c| c.hash).or(self.anchor)
    }

    /// True if `seq` names the genesis point or a retained commit.
    pub fn contains(&self, seq: u64) -> bool {
        seq >= self.base_seq && seq <= self.tip_seq()
    }

    pub fn get(&self, seq: u64) -> Option<&Commit> {
        if seq <= self.base_seq {
            return None;
        }
        let index = usize::try_from(seq - self.base_seq - 1).ok()?;
        self.commits.get(index)
    }

    pub fn get_by_hash(&self, hash: &Hash) -> Option<&Commit> {
        self.by_hash.get(hash).and_then(|&i| self.commits.get(i))
    }

    /// Commits with `after < seq <= upto`, in order.
    ///
    /// Bounds are positional and clamped to the stored commits, so a log
    /// with broken sequence numbers (only reachable through a recovery
    /// open) yields a shorter slice instead of indexing out of range.
    pub fn range(&self, after: u64, upto: u64) -> &[Commit] {
        let len = self.commits.len();
        let offset = |seq: u64| {
            usize::try_from(seq.saturating_sub(self.base_seq)).map_or(len, |i| i.min(len))
        };
        let lo = offset(after);
        let hi = offset(upto.min(self.tip_seq()));
        if lo >= hi {
            return &[];
        }
        &self.commits[lo..hi]
    }

    // --- Write Logic ---

    /// Appends a mutation set as one commit chained to the current tip.
    ///
    /// The set is folded onto a copy of `state` first; if any mutation is
    /// invalid nothing is appended and `state` is left as it was. On success
    /// `state` becomes the new head.
    pub fn append(
        &mut self,
        state: &mut GraphState,
        mutations: Vec<Mutation>,
        metadata: CommitMetadata,
    ) -> Result<&Commit> {
        if mutations.is_empty() {
            return Err(MyosotisError::InvalidMutation {
                node: None,
                reason: MutationFault::EmptyMutationSet,
            });
        }
        let mut next = state.clone();
        next.apply_all(&mutations)?;
        *state = next;
        Ok(self.push_folded(mutations, metadata))
    }

    /// Seals a mutation set the caller has already folded successfully.
    pub(crate) fn push_folded(&mut self, mutations: Vec<Mutation>, metadata: CommitMetadata) -> &Commit {
        let seq = self.tip_seq() + 1;
        let commit = Commit::seal(seq, self.tip_hash(), metadata, mutations);
        debug!(seq, hash = %commit.hash, mutations = commit.mutations.len(), "appended commit");

        self.by_hash.insert(commit.hash, self.commits.len());
        self.commits.push(commit);
        &self.commits[self.commits.len() - 1]
    }

    /// Returns a copy of this log with every commit up to and including
    /// `upto` retired, and the suffix re-chained onto `anchor`.
    pub(crate) fn rebased(&self, upto: u64, anchor: Hash) -> CommitLog {
        let mut parent = Some(anchor);
        let mut suffix = Vec::with_capacity(self.commits.len());
        for commit in self.commits.iter().filter(|c| c.seq > upto) {
            let mut commit = commit.clone();
            commit.reanchor(parent);
            parent = Some(commit.hash);
            suffix.push(commit);
        }
        CommitLog::from_parts(upto, Some(anchor), suffix)
    }

    // --- Verification ---

    /// Re-walks the chain: contiguous sequence numbers, every parent hash
    /// equal to its predecessor's hash (or the anchor), every stored hash
    /// equal to the recomputed one.
    pub fn verify_chain(&self) -> core::result::Result<(), IntegrityViolation> {
        let mut expected_parent = self.anchor;
        for (position, commit) in self.commits.iter().enumerate() {
            let expected_seq = self.base_seq + position as u64 + 1;
            if commit.seq != expected_seq {
                return Err(IntegrityViolation::Sequence {
                    position,
                    found: commit.seq,
                    expected: expected_seq,
                });
            }
            if commit.parent_hash != expected_parent {
                return Err(IntegrityViolation::ParentHash { seq: commit.seq });
            }
            let computed = commit.computed_hash();
            if computed != commit.hash {
                return Err(IntegrityViolation::CommitHash {
                    seq: commit.seq,
                    stored: commit.hash,
                    computed,
                });
            }
            expected_parent = Some(commit.hash);
        }
        Ok(())
    }
}
