#[cfg(test)]
// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod support;
pub mod store_tests;
pub mod compaction_tests;
pub mod integrity_tests;
