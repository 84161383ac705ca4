// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical BLAKE3 Hashing
//!
//! Every externally visible digest in a store comes from here: commit
//! hashes (which form the chain), state hashes (checkpoints, genesis
//! snapshots, compaction checks).
//!
//! # Hash Input Structure
//! ```text
//! commit:  "myosotis/commit/v1"
//!          parent hash (Option)
//!          timestamp (u64 LE), label (Option<str>), user data (Option<bytes>)
//!          mutation count (u64 LE), mutations in order
//!
//! state:   "myosotis/state/v1"
//!          next_node_id (u64 LE)
//!          node count (u64 LE)
//!          for each node (ascending id, tombstones included):
//!            id, type tag, deleted (u8), field count, fields by name
//! ```

use crate::commit::CommitMetadata;
use crate::snapshot::canonical::CanonicalHasher;
use crate::state::graph::GraphState;
use crate::state::mutation::Mutation;
use crate::types::id::Hash;

const COMMIT_DOMAIN: &str = "myosotis/commit/v1";
const STATE_DOMAIN: &str = "myosotis/state/v1";

/// Hash of one commit's content chained to its parent.
pub fn hash_commit(parent: Option<&Hash>, metadata: &CommitMetadata, mutations: &[Mutation]) -> Hash {
    let mut hasher = CanonicalHasher::new(COMMIT_DOMAIN);
    hasher.put_opt_hash(parent);
    hasher.put_metadata(metadata);
    hasher.put_u64(mutations.len() as u64);
    for mutation in mutations {
        hasher.put_mutation(mutation);
    }
    hasher.finish()
}

/// Hash of a full materialized state.
pub fn hash_state(state: &GraphState) -> Hash {
    let mut hasher = CanonicalHasher::new(STATE_DOMAIN);
    hasher.put_node_id(state.next_node_id);
    hasher.put_u64(state.nodes.len() as u64);
    for node in state.nodes.values() {
        hasher.put_node(node);
    }
    hasher.finish()
}
