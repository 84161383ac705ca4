// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod graph;
pub mod mutation;

pub use graph::GraphState;
pub use mutation::Mutation;
