// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Structural diff between two materialized states.
//!
//! A delta is defined purely over `materialize` output, so it does not care
//! where checkpoints or compaction boundaries fall. Entries are ordered by
//! ascending `NodeId`, then lifecycle change before field changes, then
//! ascending field name. Applying `diff(a, b)` to the state at `a` yields
//! the state at `b`, in either direction.

use crate::error::{MutationFault, MyosotisError, Result};
use crate::graph::node::Node;
use crate::state::graph::GraphState;
use crate::types::id::NodeId;
use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Present only in the target state; carries the node as it is there.
    Created(Node),
    /// Present only in the source state (the target predates its creation).
    Removed,
    /// Live in the source, tombstoned in the target.
    Deleted,
    /// Tombstoned in the source, live in the target.
    Restored,
    /// A field differs. `None` means absent on that side.
    Field {
        name: String,
        old: Option<Value>,
        new: Option<Value>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEntry {
    pub node: NodeId,
    pub change: Change,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralDelta {
    pub from: u64,
    pub to: u64,
    /// Allocator marks of the source and target states.
    pub next_node_id: (NodeId, NodeId),
    pub entries: Vec<DeltaEntry>,
}

impl StructuralDelta {
    pub fn between(from: u64, a: &GraphState, to: u64, b: &GraphState) -> Self {
        Self {
            from,
            to,
            next_node_id: (a.next_node_id, b.next_node_id),
            entries: diff_states(a, b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.next_node_id.0 == self.next_node_id.1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries touching one node.
    pub fn for_node(&self, id: NodeId) -> impl Iterator<Item = &Change> {
        self.entries.iter().filter(move |e| e.node == id).map(|e| &e.change)
    }

    /// Rewrites `state` (the source state) into the target state.
    pub fn apply_to(&self, state: &mut GraphState) -> Result<()> {
        for entry in &self.entries {
            let id = entry.node;
            match &entry.change {
                Change::Created(node) => {
                    state.nodes.insert(id, node.clone());
                }
                Change::Removed => {
                    state.nodes.remove(&id);
                }
                Change::Deleted => node_mut(state, id)?.deleted = true,
                Change::Restored => node_mut(state, id)?.deleted = false,
                Change::Field { name, new, .. } => {
                    let node = node_mut(state, id)?;
                    match new {
                        Some(value) => {
                            node.fields.insert(name.clone(), value.clone());
                        }
                        None => {
                            node.fields.remove(name);
                        }
                    }
                }
            }
        }
        state.next_node_id = self.next_node_id.1;
        Ok(())
    }
}

fn node_mut(state: &mut GraphState, id: NodeId) -> Result<&mut Node> {
    state
        .nodes
        .get_mut(&id)
        .ok_or_else(|| MyosotisError::mutation(id, MutationFault::UnknownNode))
}

/// Merge-walks both node tables in id order.
pub fn diff_states(a: &GraphState, b: &GraphState) -> Vec<DeltaEntry> {
    let mut entries = Vec::new();
    let mut left = a.nodes.iter().peekable();
    let mut right = b.nodes.iter().peekable();

    loop {
        let order = match (left.peek(), right.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((ka, _)), Some((kb, _))) => ka.cmp(kb),
        };
        match order {
            Ordering::Less => {
                if let Some((id, _)) = left.next() {
                    entries.push(DeltaEntry { node: *id, change: Change::Removed });
                }
            }
            Ordering::Greater => {
                if let Some((id, node)) = right.next() {
                    entries.push(DeltaEntry { node: *id, change: Change::Created(node.clone()) });
                }
            }
            Ordering::Equal => {
                if let (Some((id, na)), Some((_, nb))) = (left.next(), right.next()) {
                    diff_node(*id, na, nb, &mut entries);
                }
            }
        }
    }
    entries
}

fn diff_node(id: NodeId, a: &Node, b: &Node, out: &mut Vec<DeltaEntry>) {
    if a.ty != b.ty {
        // Type tags never change over a node's life; treat as a replacement.
        out.push(DeltaEntry { node: id, change: Change::Created(b.clone()) });
        return;
    }
    match (a.deleted, b.deleted) {
        (false, true) => out.push(DeltaEntry { node: id, change: Change::Deleted }),
        (true, false) => out.push(DeltaEntry { node: id, change: Change::Restored }),
        _ => {}
    }
    for (name, old, new) in diff_fields(&a.fields, &b.fields) {
        out.push(DeltaEntry {
            node: id,
            change: Change::Field { name, old, new },
        });
    }
}

fn diff_fields(
    a: &BTreeMap<String, Value>,
    b: &BTreeMap<String, Value>,
) -> Vec<(String, Option<Value>, Option<Value>)> {
    let mut changes = Vec::new();
    let mut left = a.iter().peekable();
    let mut right = b.iter().peekable();

    loop {
        let order = match (left.peek(), right.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((ka, _)), Some((kb, _))) => ka.cmp(kb),
        };
        match order {
            Ordering::Less => {
                if let Some((k, v)) = left.next() {
                    changes.push((k.clone(), Some(v.clone()), None));
                }
            }
            Ordering::Greater => {
                if let Some((k, v)) = right.next() {
                    changes.push((k.clone(), None, Some(v.clone())));
                }
            }
            Ordering::Equal => {
                if let (Some((k, va)), Some((_, vb))) = (left.next(), right.next()) {
                    if va != vb {
                        changes.push((k.clone(), Some(va.clone()), Some(vb.clone())));
                    }
                }
            }
        }
    }
    changes
}
