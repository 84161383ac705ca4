// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Mutation definitions.

use crate::types::id::NodeId;
use crate::types::value::Value;
use serde::{Deserialize, Serialize};

/// One field-level or node-level change inside a commit.
///
/// A commit's mutations are applied strictly in order; later entries see the
/// effects of earlier ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    CreateNode { id: NodeId, ty: String },
    SetField { id: NodeId, key: String, value: Value },
    DeleteField { id: NodeId, key: String },
    DeleteNode { id: NodeId },
}

impl Mutation {
    /// The node this mutation targets.
    pub fn node(&self) -> NodeId {
        match self {
            Mutation::CreateNode { id, .. }
            | Mutation::SetField { id, .. }
            | Mutation::DeleteField { id, .. }
            | Mutation::DeleteNode { id } => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::CreateNode { .. } => "CreateNode",
            Mutation::SetField { .. } => "SetField",
            Mutation::DeleteField { .. } => "DeleteField",
            Mutation::DeleteNode { .. } => "DeleteNode",
        }
    }
}
