// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared test fixtures.

use crate::commit::CommitMetadata;
use crate::config::{StoreConfig, FIRST_NODE_ID};
use crate::store::Store;
use crate::types::id::NodeId;
use crate::types::value::Value;
use std::collections::BTreeMap;

/// A simple deterministic RNG for tests.
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed, inc: 1 }
    }

    pub fn next_u32(&mut self) -> u32 {
        let oldstate = self.state;
        self.state = oldstate.wrapping_mul(6364136223846793005).wrapping_add(self.inc);
        let xorshifted = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
        let rot = (oldstate >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    pub fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }
}

pub fn meta(seq: u64) -> CommitMetadata {
    CommitMetadata::at(1_700_000_000_000 + seq).with_label(format!("c{}", seq))
}

fn random_value(rng: &mut Pcg32, max_id: u64) -> Value {
    match rng.below(7) {
        0 => Value::Int(rng.next_u32() as i64 - 1_000),
        1 => Value::Float(rng.below(10_000) as f64 / 8.0),
        2 => Value::Bool(rng.below(2) == 1),
        3 => Value::Str(format!("s{}", rng.below(50))),
        4 if max_id > 0 => Value::Ref(NodeId(1 + rng.below(max_id as u32) as u64)),
        5 => Value::List(vec![Value::Int(rng.below(5) as i64), Value::Str("x".into())]),
        _ => {
            let mut map = BTreeMap::new();
            map.insert(format!("k{}", rng.below(3)), Value::Bool(true));
            Value::Map(map)
        }
    }
}

/// Drives a store through `commits` random but valid commits.
pub fn random_history(seed: u64, commits: u64, config: StoreConfig) -> Store {
    const KEYS: [&str; 4] = ["name", "goal", "score", "link"];

    let mut store = Store::with_config(config);
    let mut rng = Pcg32::new(seed);

    for seq in 1..=commits {
        let ops = 1 + rng.below(4);
        for _ in 0..ops {
            let created = (store.staged_next_node_id().0 - FIRST_NODE_ID) as usize;
            if created == 0 || rng.below(4) == 0 {
                let ty = if rng.below(2) == 0 { "Agent" } else { "Task" };
                store.create_node(ty).unwrap();
                continue;
            }
            let id = NodeId(1 + rng.below(created as u32) as u64);
            let key = KEYS[rng.below(KEYS.len() as u32) as usize];
            let has_field = store.staged_node(id).map_or(false, |n| n.fields.contains_key(key));
            let live = store.staged_node(id).map_or(false, |n| n.is_live());
            match rng.below(10) {
                0 if live => store.delete_node(id).unwrap(),
                1 if has_field => store.delete_field(id, key).unwrap(),
                _ => {
                    let value = random_value(&mut rng, created as u64);
                    store.set_field(id, key, value).unwrap();
                }
            }
        }
        store.commit(meta(seq)).unwrap();
    }
    store
}
