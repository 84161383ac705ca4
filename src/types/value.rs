// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Field values.

use crate::types::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed field value. Closed set; no opaque payloads.
///
/// Equality is structural. Floats compare by bit pattern so that a value is
/// always equal to itself and equality agrees with the canonical hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ref(NodeId),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    /// Calls `f` for every reference reachable from this value, depth first.
    pub fn visit_refs<E>(&self, f: &mut impl FnMut(NodeId) -> Result<(), E>) -> Result<(), E> {
        match self {
            Value::Ref(id) => f(*id),
            Value::List(items) => {
                for item in items {
                    item.visit_refs(f)?;
                }
                Ok(())
            }
            Value::Map(entries) => {
                for item in entries.values() {
                    item.visit_refs(f)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// True if any float inside this value is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        match self {
            Value::Float(v) => !v.is_finite(),
            Value::List(items) => items.iter().any(Value::has_non_finite),
            Value::Map(entries) => entries.values().any(Value::has_non_finite),
            _ => false,
        }
    }

    pub fn as_ref_id(&self) -> Option<NodeId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NodeId> for Value {
    fn from(v: NodeId) -> Self {
        Value::Ref(v)
    }
}
