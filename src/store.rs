// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The Store: genesis, commit log, checkpoints and the materialized head.
//!
//! Writers (`commit`, `apply`, checkpoint creation, `compact`, `repair`) take
//! `&mut self`, readers take `&self`, so the borrow checker already gives
//! single-writer / multiple-reader semantics; share a `Store` across threads
//! behind an `RwLock` when needed. New state becomes visible only when a
//! commit is appended; staged mutations are never seen by readers of the
//! log.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::commit::{Commit, CommitMetadata, CommitSummary};
use crate::compact::{self, GenesisSnapshot};
use crate::config::{StoreConfig, FIRST_NODE_ID};
use crate::diff::StructuralDelta;
use crate::error::{MutationFault, MyosotisError, Result};
use crate::graph::node::Node;
use crate::log::CommitLog;
use crate::replay::{replay_from, ReplaySource, Replayer};
use crate::state::graph::GraphState;
use crate::state::mutation::Mutation;
use crate::types::id::{Hash, NodeId};
use crate::types::value::Value;
use crate::verify::{verify_integrity, IntegrityReport};
use tracing::{info, warn};

/// How strictly stored history is checked when a store is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Every hash is verified; any violation refuses the open.
    #[default]
    Strict,
    /// Opens even if verification fails, but blocks writes until
    /// [`Store::repair`] succeeds.
    Recovery,
}

/// Result of a compaction request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactionOutcome {
    /// Sequence number the genesis snapshot now stands for.
    pub genesis_seq: u64,
    pub genesis_hash: Option<Hash>,
    pub retired: usize,
}

#[derive(Clone, Debug)]
pub struct Store {
    config: StoreConfig,
    genesis: Option<GenesisSnapshot>,
    log: CommitLog,
    checkpoints: CheckpointStore,
    /// State at the tip of the log.
    head: GraphState,
    /// `head` with `pending` applied; created on first staged mutation.
    staged: Option<GraphState>,
    pending: Vec<Mutation>,
    /// Lowest id never handed out by this store. Only moves forward, so ids
    /// from discarded staging are skipped rather than reissued.
    reserved: NodeId,
    writes_blocked: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            genesis: None,
            log: CommitLog::new(),
            checkpoints: CheckpointStore::new(),
            head: GraphState::new(),
            staged: None,
            pending: Vec::new(),
            reserved: NodeId(FIRST_NODE_ID),
            writes_blocked: false,
        }
    }

    /// Reassembles a store from persisted parts.
    pub(crate) fn open(
        config: StoreConfig,
        genesis: Option<GenesisSnapshot>,
        log: CommitLog,
        checkpoints: CheckpointStore,
        next_node_id: NodeId,
        mode: LoadMode,
    ) -> Result<Self> {
        let mut store = Self {
            config,
            genesis,
            log,
            checkpoints,
            head: GraphState::new(),
            staged: None,
            pending: Vec::new(),
            reserved: NodeId(FIRST_NODE_ID),
            writes_blocked: false,
        };

        if let Some(genesis) = &store.genesis {
            genesis.state.check_invariants()?;
        }

        match verify_integrity(store.genesis.as_ref(), &store.log, &store.checkpoints, next_node_id) {
            Ok(report) => {
                info!(commits = report.commits_checked, tip = %report.tip_state_hash, "store verified");
            }
            Err(err) if mode == LoadMode::Recovery && err.is_integrity() => {
                warn!(%err, "integrity check failed; store opened read-only");
                store.writes_blocked = true;
            }
            Err(err) => return Err(err),
        }

        store.head = store.replayer().materialize(store.log.tip_seq())?;
        store.reserved = store.head.next_node_id();
        Ok(store)
    }

    pub(crate) fn replayer(&self) -> Replayer<'_> {
        Replayer::new(self.genesis.as_ref(), &self.log, &self.checkpoints)
    }

    // --- Read APIs ---

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn head(&self) -> &GraphState {
        &self.head
    }

    /// Node as of the last commit; staged changes are not visible here.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.head.get(id)
    }

    /// Node as it would be if the pending mutations were committed now.
    pub fn staged_node(&self, id: NodeId) -> Option<&Node> {
        self.staged.as_ref().unwrap_or(&self.head).get(id)
    }

    /// Id the next `create_node` will hand out.
    pub fn staged_next_node_id(&self) -> NodeId {
        self.staged
            .as_ref()
            .unwrap_or(&self.head)
            .next_node_id()
            .max(self.reserved)
    }

    pub fn pending(&self) -> &[Mutation] {
        &self.pending
    }

    pub fn next_node_id(&self) -> NodeId {
        self.head.next_node_id()
    }

    pub fn log(&self) -> &CommitLog {
        &self.log
    }

    pub fn commits(&self) -> &[Commit] {
        self.log.commits()
    }

    pub fn commit_at(&self, seq: u64) -> Option<&Commit> {
        self.log.get(seq)
    }

    pub fn commit_by_hash(&self, hash: &Hash) -> Option<&Commit> {
        self.log.get_by_hash(hash)
    }

    pub fn tip_seq(&self) -> u64 {
        self.log.tip_seq()
    }

    pub fn genesis(&self) -> Option<&GenesisSnapshot> {
        self.genesis.as_ref()
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn history(&self) -> Vec<CommitSummary> {
        self.log.commits().iter().map(CommitSummary::from).collect()
    }

    pub fn is_writable(&self) -> bool {
        !self.writes_blocked
    }

    /// Reconstructs the full state at `seq`.
    pub fn materialize(&self, seq: u64) -> Result<GraphState> {
        self.replayer().materialize(seq)
    }

    pub fn materialize_traced(&self, seq: u64) -> Result<(GraphState, ReplaySource)> {
        self.replayer().materialize_traced(seq)
    }

    /// Reconstructs `seq` from genesis, ignoring checkpoints.
    pub fn materialize_from_genesis(&self, seq: u64) -> Result<GraphState> {
        self.replayer().materialize_from_genesis(seq)
    }

    pub fn diff(&self, a: u64, b: u64) -> Result<StructuralDelta> {
        let sa = self.materialize(a)?;
        let sb = self.materialize(b)?;
        Ok(StructuralDelta::between(a, &sa, b, &sb))
    }

    pub fn verify_integrity(&self) -> Result<IntegrityReport> {
        verify_integrity(
            self.genesis.as_ref(),
            &self.log,
            &self.checkpoints,
            self.head.next_node_id(),
        )
    }

    // --- Staging ---

    fn ensure_writable(&self) -> Result<()> {
        if self.writes_blocked {
            return Err(MyosotisError::WritesBlocked);
        }
        Ok(())
    }

    fn stage(&mut self, mutation: Mutation) -> Result<()> {
        self.ensure_writable()?;
        let staged = self.staged.get_or_insert_with(|| self.head.clone());
        staged.apply(&mutation)?;
        self.pending.push(mutation);
        Ok(())
    }

    /// Stages creation of a node and returns its freshly allocated id.
    pub fn create_node(&mut self, ty: impl Into<String>) -> Result<NodeId> {
        let id = self.staged_next_node_id();
        self.stage(Mutation::CreateNode { id, ty: ty.into() })?;
        self.reserved = id.next();
        Ok(id)
    }

    pub fn set_field(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.stage(Mutation::SetField {
            id,
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn delete_field(&mut self, id: NodeId, key: impl Into<String>) -> Result<()> {
        self.stage(Mutation::DeleteField { id, key: key.into() })
    }

    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        self.stage(Mutation::DeleteNode { id })
    }

    /// Drops every staged mutation. Ids they allocated stay reserved and are
    /// never handed out again.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.staged = None;
    }

    // --- Write Logic ---

    /// Appends the staged mutations as one commit.
    pub fn commit(&mut self, metadata: CommitMetadata) -> Result<&Commit> {
        self.ensure_writable()?;
        let staged = match self.staged.take() {
            Some(staged) if !self.pending.is_empty() => staged,
            _ => {
                return Err(MyosotisError::InvalidMutation {
                    node: None,
                    reason: MutationFault::EmptyMutationSet,
                })
            }
        };
        let mutations = std::mem::take(&mut self.pending);
        self.head = staged;
        let seq = self.log.push_folded(mutations, metadata).seq();
        self.after_append(seq)
    }

    /// Stamps the staged mutations with the current time and a label.
    pub fn commit_labeled(&mut self, label: impl Into<String>) -> Result<&Commit> {
        self.commit(CommitMetadata::now().with_label(label))
    }

    /// Appends a whole mutation set at once. Staged mutations, if any, go
    /// first and become part of the same commit. Nothing changes on failure.
    pub fn apply(&mut self, mutations: Vec<Mutation>, metadata: CommitMetadata) -> Result<&Commit> {
        self.ensure_writable()?;
        let stale = mutations.iter().find_map(|m| match m {
            Mutation::CreateNode { id, .. } if *id < self.reserved => Some(*id),
            _ => None,
        });
        if let Some(id) = stale {
            return Err(MyosotisError::mutation(
                id,
                MutationFault::StaleNodeId { next: self.reserved },
            ));
        }
        if self.pending.is_empty() {
            let seq = self.log.append(&mut self.head, mutations, metadata)?.seq();
            return self.after_append(seq);
        }

        let mark = self.pending.len();
        let saved = self.staged.clone();
        for mutation in mutations {
            if let Err(err) = self.stage(mutation) {
                self.pending.truncate(mark);
                self.staged = saved;
                return Err(err);
            }
        }
        self.commit(metadata)
    }

    fn after_append(&mut self, seq: u64) -> Result<&Commit> {
        self.reserved = self.reserved.max(self.head.next_node_id());
        let commit = self.log.get(seq).ok_or(MyosotisError::UnknownCommit(seq))?;
        if self.config.is_checkpoint_due(seq) {
            self.checkpoints.insert(Checkpoint::capture(commit, self.head.clone()));
            info!(seq, "recorded checkpoint");
        }
        Ok(commit)
    }

    /// Materializes `seq` and records it as a checkpoint.
    pub fn create_checkpoint(&mut self, seq: u64) -> Result<&Checkpoint> {
        self.ensure_writable()?;
        let state = self.materialize(seq)?;
        let commit = self.log.get(seq).ok_or(MyosotisError::UnknownCommit(seq))?;
        self.checkpoints.insert(Checkpoint::capture(commit, state));
        info!(seq, "recorded checkpoint");
        self.checkpoints
            .get(seq)
            .ok_or(MyosotisError::UnknownCommit(seq))
    }

    pub fn prune_checkpoints(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.checkpoints.clear();
        Ok(())
    }

    /// Rebuilds every checkpoint at the configured interval by replaying
    /// from genesis.
    pub fn regenerate_checkpoints(&mut self) -> Result<usize> {
        self.ensure_writable()?;
        self.rebuild_checkpoints()
    }

    fn rebuild_checkpoints(&mut self) -> Result<usize> {
        let mut rebuilt = CheckpointStore::new();
        let mut state = self.replayer().genesis_state()?;
        for commit in self.log.commits() {
            state = replay_from(state, std::slice::from_ref(commit))?;
            if self.config.is_checkpoint_due(commit.seq()) {
                rebuilt.insert(Checkpoint::capture(commit, state.clone()));
            }
        }
        let count = rebuilt.len();
        self.checkpoints = rebuilt;
        info!(count, "regenerated checkpoints");
        Ok(count)
    }

    /// Collapses history up to `upto` (default: newest checkpoint, else the
    /// tip) into a genesis snapshot. Idempotent; never runs implicitly.
    pub fn compact(&mut self, upto: Option<u64>) -> Result<CompactionOutcome> {
        self.ensure_writable()?;
        let compacted = compact::compact(&self.replayer(), upto)?;
        match compacted {
            Some(done) => {
                let outcome = CompactionOutcome {
                    genesis_seq: done.genesis.commit_seq(),
                    genesis_hash: Some(done.genesis.state_hash()),
                    retired: done.retired,
                };
                self.genesis = Some(done.genesis);
                self.log = done.log;
                self.checkpoints = done.checkpoints;
                Ok(outcome)
            }
            None => Ok(CompactionOutcome {
                genesis_seq: self.log.base_seq(),
                genesis_hash: self.genesis.as_ref().map(GenesisSnapshot::state_hash),
                retired: 0,
            }),
        }
    }

    /// Drops every checkpoint, regenerates them from genesis and re-verifies
    /// the whole store. Writes are re-enabled only if that succeeds.
    pub fn repair(&mut self) -> Result<IntegrityReport> {
        self.rebuild_checkpoints()?;
        let tip = self.log.tip_seq();
        self.head = self.materialize_from_genesis(tip)?;
        self.discard_pending();
        self.reserved = self.reserved.max(self.head.next_node_id());

        let report = self.verify_integrity()?;
        self.writes_blocked = false;
        info!(tip = report.tip_seq, "store repaired");
        Ok(report)
    }
}
