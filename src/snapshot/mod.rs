// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod blake3;
pub mod canonical;

pub use self::blake3::{hash_commit, hash_state};
