// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Graph Node definition.

use crate::types::id::NodeId;
use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An addressable graph entity.
///
/// Nodes are never erased. Deleting one only sets `deleted`; its fields keep
/// their last values and references to it stay resolvable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Free-form type tag, not a schema.
    pub ty: String,
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub deleted: bool,
}

impl Node {
    pub fn new(id: NodeId, ty: impl Into<String>) -> Self {
        Self {
            id,
            ty: ty.into(),
            fields: BTreeMap::new(),
            deleted: false,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_live(&self) -> bool {
        !self.deleted
    }
}
