// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic Replay Logic.
//!
//! Materializing a commit is a left fold of mutation sets onto a starting
//! state: the nearest verified checkpoint at or before the target, or the
//! genesis snapshot. The fold reads nothing but its inputs (no clock, no
//! hash-map iteration), so the same start and the same commits always give
//! the same state, whichever start was chosen.

use crate::checkpoint::CheckpointStore;
use crate::commit::Commit;
use crate::compact::GenesisSnapshot;
use crate::error::{IntegrityViolation, MyosotisError, Result};
use crate::log::CommitLog;
use crate::state::graph::GraphState;
use tracing::{debug, warn};

/// Folds `commits` onto `state` in order.
///
/// A stored commit that does not apply means the history itself is broken,
/// so the failure is reported as an integrity violation at that commit.
pub fn replay_from(mut state: GraphState, commits: &[Commit]) -> Result<GraphState> {
    for commit in commits {
        for mutation in commit.mutations() {
            if let Err(err) = state.apply(mutation) {
                return Err(match err {
                    MyosotisError::InvalidMutation { node, reason } => {
                        IntegrityViolation::Replay {
                            seq: commit.seq(),
                            node,
                            fault: reason,
                        }
                        .into()
                    }
                    other => other,
                });
            }
        }
    }
    Ok(state)
}

/// Folds `commits` onto an empty state.
pub fn replay(commits: &[Commit]) -> Result<GraphState> {
    replay_from(GraphState::new(), commits)
}

/// Where a materialization started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplaySource {
    Genesis,
    Checkpoint(u64),
}

/// Read-only view over the parts of a store replay needs.
#[derive(Clone, Copy)]
pub struct Replayer<'a> {
    pub(crate) genesis: Option<&'a GenesisSnapshot>,
    pub(crate) log: &'a CommitLog,
    pub(crate) checkpoints: &'a CheckpointStore,
}

impl<'a> Replayer<'a> {
    pub fn new(
        genesis: Option<&'a GenesisSnapshot>,
        log: &'a CommitLog,
        checkpoints: &'a CheckpointStore,
    ) -> Self {
        Self {
            genesis,
            log,
            checkpoints,
        }
    }

    /// The verified genesis state: the compaction snapshot if there is one,
    /// otherwise the empty initial state.
    pub fn genesis_state(&self) -> Result<GraphState> {
        match self.genesis {
            Some(genesis) => {
                if !genesis.verify() {
                    return Err(IntegrityViolation::GenesisHash.into());
                }
                Ok(genesis.state.clone())
            }
            None => Ok(GraphState::new()),
        }
    }

    /// Materializes the state at `target` starting from the nearest
    /// checkpoint that verifies, falling back to older ones and finally to
    /// genesis.
    pub fn materialize(&self, target: u64) -> Result<GraphState> {
        self.materialize_traced(target).map(|(state, _)| state)
    }

    pub fn materialize_traced(&self, target: u64) -> Result<(GraphState, ReplaySource)> {
        if !self.log.contains(target) {
            return Err(MyosotisError::UnknownCommit(target));
        }

        for checkpoint in self.checkpoints.at_or_before(target) {
            match checkpoint.verify_against(self.log) {
                Ok(()) => {
                    let suffix = self.log.range(checkpoint.commit_seq(), target);
                    debug!(
                        target,
                        from = checkpoint.commit_seq(),
                        commits = suffix.len(),
                        "replaying from checkpoint"
                    );
                    let state = replay_from(checkpoint.state().clone(), suffix)?;
                    return Ok((state, ReplaySource::Checkpoint(checkpoint.commit_seq())));
                }
                Err(violation) => {
                    warn!(%violation, "skipping checkpoint that failed verification");
                }
            }
        }

        let state = self.materialize_from_genesis(target)?;
        Ok((state, ReplaySource::Genesis))
    }

    /// Materializes `target` ignoring every checkpoint.
    pub fn materialize_from_genesis(&self, target: u64) -> Result<GraphState> {
        if !self.log.contains(target) {
            return Err(MyosotisError::UnknownCommit(target));
        }
        let suffix = self.log.range(self.log.base_seq(), target);
        debug!(target, commits = suffix.len(), "replaying from genesis");
        replay_from(self.genesis_state()?, suffix)
    }
}
