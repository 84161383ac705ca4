// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Magic string written at the head of every store file.
pub const FILE_MAGIC: &str = "MYOSOTIS";

/// Newest persisted layout this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// First id handed out by the allocator of an empty store.
pub const FIRST_NODE_ID: u64 = 1;

/// Commits between automatic checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 50;

/// Runtime knobs for a [`crate::store::Store`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// A checkpoint is recorded after every commit whose sequence number is a
    /// multiple of this value. Zero disables automatic checkpoints.
    pub checkpoint_interval: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

impl StoreConfig {
    pub fn without_checkpoints() -> Self {
        Self { checkpoint_interval: 0 }
    }

    pub fn with_interval(checkpoint_interval: u64) -> Self {
        Self { checkpoint_interval }
    }

    pub(crate) fn is_checkpoint_due(&self, seq: u64) -> bool {
        self.checkpoint_interval != 0 && seq % self.checkpoint_interval == 0
    }
}
