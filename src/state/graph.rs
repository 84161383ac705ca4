// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Materialized graph state.

use crate::config::FIRST_NODE_ID;
use crate::error::{MutationFault, MyosotisError, Result};
use crate::graph::node::Node;
use crate::state::mutation::Mutation;
use crate::types::id::NodeId;
use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The full node table at one point in history, tombstones included, plus
/// the allocator high-water mark.
///
/// `BTreeMap` keeps iteration in ascending `NodeId` order, which the state
/// hash and the diff engine both rely on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphState {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) next_node_id: NodeId,
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphState {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_node_id: NodeId(FIRST_NODE_ID),
        }
    }

    // --- Read APIs ---

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Every node in ascending id order, tombstones included.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_live())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    // --- Write Logic ---

    /// Applies a single mutation, or leaves the state untouched and reports
    /// why it is invalid here.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<()> {
        self.check(mutation)?;

        match mutation {
            Mutation::CreateNode { id, ty } => {
                self.nodes.insert(*id, Node::new(*id, ty.clone()));
                self.next_node_id = id.next();
            }
            Mutation::SetField { id, key, value } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.fields.insert(key.clone(), value.clone());
                }
            }
            Mutation::DeleteField { id, key } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.fields.remove(key);
                }
            }
            Mutation::DeleteNode { id } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.deleted = true;
                }
            }
        }
        Ok(())
    }

    /// Applies mutations in order. Stops at the first invalid one; the caller
    /// owns the accumulator and discards it on error.
    pub fn apply_all<'a>(&mut self, mutations: impl IntoIterator<Item = &'a Mutation>) -> Result<()> {
        for mutation in mutations {
            self.apply(mutation)?;
        }
        Ok(())
    }

    /// Validates `mutation` against the current state without applying it.
    pub fn check(&self, mutation: &Mutation) -> Result<()> {
        let id = mutation.node();
        match mutation {
            Mutation::CreateNode { .. } => {
                if id < self.next_node_id {
                    return Err(MyosotisError::mutation(
                        id,
                        MutationFault::StaleNodeId { next: self.next_node_id },
                    ));
                }
            }
            Mutation::SetField { value, .. } => {
                self.existing(id)?;
                self.check_value(id, value)?;
            }
            Mutation::DeleteField { key, .. } => {
                let node = self.existing(id)?;
                if !node.fields.contains_key(key) {
                    return Err(MyosotisError::mutation(id, MutationFault::MissingField));
                }
            }
            Mutation::DeleteNode { .. } => {
                let node = self.existing(id)?;
                if node.deleted {
                    return Err(MyosotisError::mutation(id, MutationFault::AlreadyDeleted));
                }
            }
        }
        Ok(())
    }

    fn existing(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| MyosotisError::mutation(id, MutationFault::UnknownNode))
    }

    fn check_value(&self, owner: NodeId, value: &Value) -> Result<()> {
        if value.has_non_finite() {
            return Err(MyosotisError::mutation(owner, MutationFault::NonFiniteFloat));
        }
        value.visit_refs(&mut |target| {
            if self.nodes.contains_key(&target) {
                Ok(())
            } else {
                Err(MyosotisError::mutation(owner, MutationFault::DanglingReference(target)))
            }
        })
    }

    // --- Invariant Checker ---

    /// Checks the internal consistency of a state that did not come out of
    /// the fold, e.g. a snapshot read back from disk.
    pub fn check_invariants(&self) -> Result<()> {
        // Ids skipped by discarded staging leave gaps, so the table may hold
        // fewer nodes than the allocator has handed out, never more.
        let first = NodeId(FIRST_NODE_ID);
        for (key, node) in &self.nodes {
            if *key != node.id || node.id < first || node.id >= self.next_node_id {
                return Err(MyosotisError::MalformedFile(format!(
                    "node table key {} holds node {} (allocator at {})",
                    key, node.id, self.next_node_id
                )));
            }
            for value in node.fields.values() {
                self.check_value(node.id, value)?;
            }
        }
        Ok(())
    }
}
