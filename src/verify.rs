// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! End-to-end integrity verification.
//!
//! Covers, in order:
//! - the genesis snapshot (state hash, anchor, sequence point)
//! - the hash chain of every retained commit
//! - a full replay from genesis, which must apply cleanly
//! - every checkpoint, both its own hash and equality with the replayed
//!   state at its commit
//! - the stored allocator mark against the replayed tip

use crate::checkpoint::CheckpointStore;
use crate::compact::GenesisSnapshot;
use crate::error::{IntegrityViolation, Result};
use crate::log::CommitLog;
use crate::replay::{replay_from, Replayer};
use crate::snapshot::blake3::hash_state;
use crate::types::id::{Hash, NodeId};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrityReport {
    pub commits_checked: usize,
    pub checkpoints_checked: usize,
    pub tip_seq: u64,
    pub tip_state_hash: Hash,
}

pub fn verify_integrity(
    genesis: Option<&GenesisSnapshot>,
    log: &CommitLog,
    checkpoints: &CheckpointStore,
    stored_next_node_id: NodeId,
) -> Result<IntegrityReport> {
    match genesis {
        Some(g) => {
            if !g.verify() || log.anchor() != Some(g.state_hash()) || log.base_seq() != g.commit_seq() {
                return Err(IntegrityViolation::GenesisHash.into());
            }
        }
        None => {
            if log.anchor().is_some() || log.base_seq() != 0 {
                return Err(IntegrityViolation::GenesisHash.into());
            }
        }
    }

    log.verify_chain()?;

    let replayer = Replayer::new(genesis, log, checkpoints);
    let mut state = replayer.genesis_state()?;
    let mut cursor = log.base_seq();

    for checkpoint in checkpoints.iter() {
        let seq = checkpoint.commit_seq();
        checkpoint.verify_against(log)?;
        state = replay_from(state, log.range(cursor, seq))?;
        cursor = seq;
        if &state != checkpoint.state() {
            return Err(IntegrityViolation::CheckpointState { seq }.into());
        }
    }

    let tip = replay_from(state, log.range(cursor, log.tip_seq()))?;
    if tip.next_node_id() != stored_next_node_id {
        return Err(IntegrityViolation::Allocator {
            stored: stored_next_node_id,
            replayed: tip.next_node_id(),
        }
        .into());
    }

    let report = IntegrityReport {
        commits_checked: log.len(),
        checkpoints_checked: checkpoints.len(),
        tip_seq: log.tip_seq(),
        tip_state_hash: hash_state(&tip),
    };
    debug!(?report, "integrity verified");
    Ok(report)
}
