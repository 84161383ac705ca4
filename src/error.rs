// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::types::id::{Hash, NodeId};
use thiserror::Error;

/// Why a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationFault {
    /// The mutation set was empty.
    EmptyMutationSet,
    /// The target node was never created.
    UnknownNode,
    /// A create named an id below the allocator mark, i.e. one already
    /// handed out.
    StaleNodeId { next: NodeId },
    /// The node is already tombstoned.
    AlreadyDeleted,
    /// The field to remove is not present.
    MissingField,
    /// A reference value names a node that does not exist yet.
    DanglingReference(NodeId),
    /// NaN and infinities cannot be hashed or persisted stably.
    NonFiniteFloat,
}

impl core::fmt::Display for MutationFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MutationFault::EmptyMutationSet => write!(f, "empty mutation set"),
            MutationFault::UnknownNode => write!(f, "node does not exist"),
            MutationFault::StaleNodeId { next } => {
                write!(f, "create must use a node id at or above {}", next)
            }
            MutationFault::AlreadyDeleted => write!(f, "node is already deleted"),
            MutationFault::MissingField => write!(f, "field not present"),
            MutationFault::DanglingReference(id) => write!(f, "reference to missing node {}", id),
            MutationFault::NonFiniteFloat => write!(f, "non-finite float value"),
        }
    }
}

/// A hash-chain, checkpoint or genesis check that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("commit {seq}: stored hash {stored} does not match recomputed {computed}")]
    CommitHash { seq: u64, stored: Hash, computed: Hash },

    #[error("commit {seq}: parent hash does not link to its predecessor")]
    ParentHash { seq: u64 },

    #[error("commit at position {position} has sequence {found}, expected {expected}")]
    Sequence { position: usize, found: u64, expected: u64 },

    #[error("commit {seq}: stored mutations do not replay: {fault}")]
    Replay { seq: u64, node: Option<NodeId>, fault: MutationFault },

    #[error("checkpoint at commit {seq}: state hash mismatch")]
    CheckpointState { seq: u64 },

    #[error("checkpoint at commit {seq}: commit hash does not match the log")]
    CheckpointCommit { seq: u64 },

    #[error("genesis snapshot hash mismatch")]
    GenesisHash,

    #[error("allocator high-water mark {stored} does not match replayed {replayed}")]
    Allocator { stored: NodeId, replayed: NodeId },

    #[error("compaction would change the tip state (before {before}, after {after})")]
    CompactionDivergence { before: Hash, after: Hash },
}

#[derive(Debug, Error)]
pub enum MyosotisError {
    #[error("invalid mutation{}: {reason}", fmt_node(.node))]
    InvalidMutation { node: Option<NodeId>, reason: MutationFault },

    #[error("unknown commit {0}")]
    UnknownCommit(u64),

    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityViolation),

    #[error("unsupported format version {found} (supported up to {supported})")]
    FormatUnsupported { found: u32, supported: u32 },

    #[error("invalid file magic")]
    InvalidMagic,

    #[error("missing format version")]
    MissingFormatVersion,

    #[error("malformed file structure: {0}")]
    MalformedFile(String),

    #[error("writes are blocked until the store is repaired")]
    WritesBlocked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn fmt_node(node: &Option<NodeId>) -> String {
    match node {
        Some(id) => format!(" on node {}", id),
        None => String::new(),
    }
}

impl MyosotisError {
    pub(crate) fn mutation(node: NodeId, reason: MutationFault) -> Self {
        MyosotisError::InvalidMutation { node: Some(node), reason }
    }

    /// True for errors raised by a hash or chain check.
    pub fn is_integrity(&self) -> bool {
        matches!(self, MyosotisError::Integrity(_))
    }
}

pub type Result<T> = core::result::Result<T, MyosotisError>;
