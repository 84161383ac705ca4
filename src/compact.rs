// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Prefix compaction.
//!
//! Collapses every commit up to a target into a genesis snapshot equal to
//! the state materialized at that target, tombstones included. The retained
//! suffix is re-chained onto the snapshot's hash. The result is built on the
//! side and only handed back once replaying it reproduces the pre-compaction
//! tip exactly; the caller swaps it in whole or not at all.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{IntegrityViolation, MyosotisError, Result};
use crate::log::CommitLog;
use crate::replay::{replay_from, Replayer};
use crate::snapshot::blake3::hash_state;
use crate::state::graph::GraphState;
use crate::types::id::Hash;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The canonical starting state after compaction ("commit zero").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisSnapshot {
    /// Sequence number of the last commit folded into this snapshot.
    pub(crate) commit_seq: u64,
    pub(crate) state: GraphState,
    pub(crate) state_hash: Hash,
}

impl GenesisSnapshot {
    pub fn new(commit_seq: u64, state: GraphState) -> Self {
        let state_hash = hash_state(&state);
        Self {
            commit_seq,
            state,
            state_hash,
        }
    }

    pub fn commit_seq(&self) -> u64 {
        self.commit_seq
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn state_hash(&self) -> Hash {
        self.state_hash
    }

    pub fn verify(&self) -> bool {
        hash_state(&self.state) == self.state_hash
    }
}

/// A fully built replacement for a store's history.
#[derive(Clone, Debug)]
pub struct Compaction {
    pub genesis: GenesisSnapshot,
    pub log: CommitLog,
    pub checkpoints: CheckpointStore,
    /// Number of commits retired from the log.
    pub retired: usize,
}

/// Picks the compaction point: the explicit target, else the newest
/// checkpoint, else the tip.
pub fn resolve_target(replayer: &Replayer<'_>, upto: Option<u64>) -> Result<u64> {
    match upto {
        Some(seq) if replayer.log.contains(seq) => Ok(seq),
        Some(seq) => Err(MyosotisError::UnknownCommit(seq)),
        None => Ok(replayer
            .checkpoints
            .latest()
            .map_or(replayer.log.tip_seq(), |c| c.commit_seq())),
    }
}

/// Builds the compacted history for `upto`. Returns `None` when `upto` is
/// already the genesis point, since there is nothing left to retire.
pub fn compact(replayer: &Replayer<'_>, upto: Option<u64>) -> Result<Option<Compaction>> {
    let target = resolve_target(replayer, upto)?;
    let log = replayer.log;
    if target == log.base_seq() {
        return Ok(None);
    }

    // Precondition: the whole history verifies from genesis.
    log.verify_chain()?;
    let before = hash_state(&replayer.materialize_from_genesis(log.tip_seq())?);

    let genesis = GenesisSnapshot::new(target, replayer.materialize_from_genesis(target)?);
    let rebased = log.rebased(target, genesis.state_hash);

    let mut checkpoints = CheckpointStore::new();
    for checkpoint in replayer.checkpoints.iter() {
        if checkpoint.commit_seq() <= target || checkpoint.verify_against(log).is_err() {
            continue;
        }
        if let Some(commit) = rebased.get(checkpoint.commit_seq()) {
            checkpoints.insert(Checkpoint {
                commit_hash: commit.hash(),
                ..checkpoint.clone()
            });
        }
    }

    let after = hash_state(&replay_from(genesis.state.clone(), rebased.commits())?);
    if after != before {
        return Err(IntegrityViolation::CompactionDivergence { before, after }.into());
    }

    let retired = log.len() - rebased.len();
    info!(target, retired, genesis = %genesis.state_hash, "compacted commit log");
    Ok(Some(Compaction {
        genesis,
        log: rebased,
        checkpoints,
        retired,
    }))
}
