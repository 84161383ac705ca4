// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! myosotis: an embedded, versioned object-graph engine.
//!
//! Program state is recorded as typed nodes whose every change is captured
//! in an immutable, hash-chained commit. Any historical state can be
//! reconstructed deterministically, from genesis or from the nearest
//! verified checkpoint, and any two states can be diffed structurally.

pub mod checkpoint;
pub mod commit;
pub mod compact;
pub mod config;
pub mod diff;
pub mod error;
pub mod graph;
pub mod log;
pub mod replay;
pub mod snapshot;
pub mod state;
pub mod storage;
pub mod store;
pub mod types;
pub mod verify;

pub use checkpoint::Checkpoint;
pub use commit::{Commit, CommitMetadata, CommitSummary};
pub use compact::GenesisSnapshot;
pub use config::StoreConfig;
pub use diff::{Change, DeltaEntry, StructuralDelta};
pub use error::{IntegrityViolation, MutationFault, MyosotisError, Result};
pub use graph::Node;
pub use state::{GraphState, Mutation};
pub use store::{LoadMode, Store};
pub use types::{Hash, NodeId, Value};

#[cfg(test)]
pub mod tests;
