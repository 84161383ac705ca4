// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical byte encoding fed straight into a BLAKE3 hasher.
//!
//! Hashes never depend on the on-disk representation. Every hashed structure
//! is walked here in a fixed order:
//!
//! ```text
//! integers      little-endian, fixed width
//! strings/bytes u64 length, then raw bytes
//! Option<T>     0x00 | 0x01 T
//! sequences     u64 count, then items in order
//! maps          u64 count, then (key, value) in ascending key order
//! floats        IEEE-754 bit pattern as u64
//! ```

use crate::commit::CommitMetadata;
use crate::graph::node::Node;
use crate::state::mutation::Mutation;
use crate::types::id::{Hash, NodeId};
use crate::types::value::Value;
use byteorder::{ByteOrder, LittleEndian};

const TAG_INT: u8 = 0x01;
const TAG_FLOAT: u8 = 0x02;
const TAG_BOOL: u8 = 0x03;
const TAG_STR: u8 = 0x04;
const TAG_REF: u8 = 0x05;
const TAG_LIST: u8 = 0x06;
const TAG_MAP: u8 = 0x07;

const TAG_CREATE: u8 = 0x10;
const TAG_SET: u8 = 0x11;
const TAG_DELETE_FIELD: u8 = 0x12;
const TAG_DELETE_NODE: u8 = 0x13;

pub struct CanonicalHasher {
    hasher: blake3::Hasher,
}

impl CanonicalHasher {
    /// Starts a hash under a domain label so that different record kinds can
    /// never collide.
    pub fn new(domain: &str) -> Self {
        let mut this = Self {
            hasher: blake3::Hasher::new(),
        };
        this.put_str(domain);
        this
    }

    pub fn finish(self) -> Hash {
        self.hasher.finalize().into()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.hasher.update(&[v]);
    }

    pub fn put_u64(&mut self, v: u64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, v);
        self.hasher.update(&buf);
    }

    pub fn put_i64(&mut self, v: i64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_i64(&mut buf, v);
        self.hasher.update(&buf);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_u64(bytes.len() as u64);
        self.hasher.update(bytes);
    }

    pub fn put_str(&mut self, s: &str) {
        self.put_bytes(s.as_bytes());
    }

    pub fn put_hash(&mut self, h: &Hash) {
        self.hasher.update(h.as_bytes());
    }

    pub fn put_node_id(&mut self, id: NodeId) {
        self.put_u64(id.0);
    }

    pub fn put_opt_hash(&mut self, h: Option<&Hash>) {
        match h {
            Some(h) => {
                self.put_u8(1);
                self.put_hash(h);
            }
            None => self.put_u8(0),
        }
    }

    pub fn put_opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.put_u8(1);
                self.put_str(s);
            }
            None => self.put_u8(0),
        }
    }

    pub fn put_opt_bytes(&mut self, b: Option<&[u8]>) {
        match b {
            Some(b) => {
                self.put_u8(1);
                self.put_bytes(b);
            }
            None => self.put_u8(0),
        }
    }

    pub fn put_value(&mut self, value: &Value) {
        match value {
            Value::Int(v) => {
                self.put_u8(TAG_INT);
                self.put_i64(*v);
            }
            Value::Float(v) => {
                self.put_u8(TAG_FLOAT);
                self.put_u64(v.to_bits());
            }
            Value::Bool(v) => {
                self.put_u8(TAG_BOOL);
                self.put_u8(*v as u8);
            }
            Value::Str(s) => {
                self.put_u8(TAG_STR);
                self.put_str(s);
            }
            Value::Ref(id) => {
                self.put_u8(TAG_REF);
                self.put_node_id(*id);
            }
            Value::List(items) => {
                self.put_u8(TAG_LIST);
                self.put_u64(items.len() as u64);
                for item in items {
                    self.put_value(item);
                }
            }
            Value::Map(entries) => {
                self.put_u8(TAG_MAP);
                self.put_u64(entries.len() as u64);
                for (k, v) in entries {
                    self.put_str(k);
                    self.put_value(v);
                }
            }
        }
    }

    pub fn put_mutation(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::CreateNode { id, ty } => {
                self.put_u8(TAG_CREATE);
                self.put_node_id(*id);
                self.put_str(ty);
            }
            Mutation::SetField { id, key, value } => {
                self.put_u8(TAG_SET);
                self.put_node_id(*id);
                self.put_str(key);
                self.put_value(value);
            }
            Mutation::DeleteField { id, key } => {
                self.put_u8(TAG_DELETE_FIELD);
                self.put_node_id(*id);
                self.put_str(key);
            }
            Mutation::DeleteNode { id } => {
                self.put_u8(TAG_DELETE_NODE);
                self.put_node_id(*id);
            }
        }
    }

    pub fn put_metadata(&mut self, metadata: &CommitMetadata) {
        self.put_u64(metadata.timestamp);
        self.put_opt_str(metadata.label.as_deref());
        self.put_opt_bytes(metadata.user_data.as_deref());
    }

    pub fn put_node(&mut self, node: &Node) {
        self.put_node_id(node.id);
        self.put_str(&node.ty);
        self.put_u8(node.deleted as u8);
        self.put_u64(node.fields.len() as u64);
        for (k, v) in &node.fields {
            self.put_str(k);
            self.put_value(v);
        }
    }
}
