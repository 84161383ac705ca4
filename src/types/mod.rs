// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod id;
pub mod value;

pub use id::{Hash, NodeId};
pub use value::Value;
