// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::support::{meta, random_history};
use crate::commit::CommitMetadata;
use crate::config::StoreConfig;
use crate::error::MyosotisError;
use crate::snapshot::blake3::hash_state;
use crate::store::Store;
use crate::types::value::Value;

#[test]
fn test_compaction_preserves_retained_states() {
    let mut store = random_history(12, 40, StoreConfig::with_interval(8));
    let before: Vec<_> = (25..=40).map(|s| store.materialize(s).unwrap()).collect();
    let tip_hash = hash_state(store.head());

    let outcome = store.compact(Some(25)).unwrap();
    assert_eq!(outcome.genesis_seq, 25);
    assert_eq!(outcome.retired, 25);
    assert_eq!(outcome.genesis_hash, Some(hash_state(&before[0])));

    let after: Vec<_> = (25..=40).map(|s| store.materialize(s).unwrap()).collect();
    assert_eq!(before, after);
    assert_eq!(hash_state(store.head()), tip_hash);
    assert_eq!(store.commits().len(), 15);
    assert_eq!(store.commits()[0].seq(), 26);
    assert!(store.verify_integrity().is_ok());
}

#[test]
fn test_retired_commits_are_unknown() {
    let mut store = random_history(13, 20, StoreConfig::without_checkpoints());
    store.compact(Some(10)).unwrap();

    assert!(matches!(store.materialize(9), Err(MyosotisError::UnknownCommit(9))));
    assert!(matches!(store.materialize(0), Err(MyosotisError::UnknownCommit(0))));
    assert!(store.commit_at(10).is_none());
    assert!(store.materialize(10).is_ok());
    assert!(store.diff(10, 20).is_ok());
}

#[test]
fn test_compaction_is_idempotent() {
    let mut store = random_history(14, 20, StoreConfig::without_checkpoints());
    let first = store.compact(Some(12)).unwrap();
    let genesis = store.genesis().cloned();
    let commits = store.commits().to_vec();

    let second = store.compact(Some(12)).unwrap();
    assert_eq!(second.retired, 0);
    assert_eq!(second.genesis_seq, first.genesis_seq);
    assert_eq!(second.genesis_hash, first.genesis_hash);
    assert_eq!(store.genesis().cloned(), genesis);
    assert_eq!(store.commits(), &commits[..]);
}

#[test]
fn test_default_target_is_latest_checkpoint() {
    let mut store = random_history(15, 23, StoreConfig::with_interval(10));
    let outcome = store.compact(None).unwrap();
    assert_eq!(outcome.genesis_seq, 20);
    assert_eq!(store.commits().len(), 3);
    assert!(store.checkpoints().is_empty());

    let mut bare = random_history(15, 23, StoreConfig::without_checkpoints());
    let outcome = bare.compact(None).unwrap();
    assert_eq!(outcome.genesis_seq, 23);
    assert!(bare.commits().is_empty());
    assert_eq!(bare.head(), store.head());
}

#[test]
fn test_checkpoints_after_target_survive() {
    let mut store = random_history(16, 30, StoreConfig::with_interval(5));
    store.compact(Some(12)).unwrap();

    let seqs: Vec<_> = store.checkpoints().iter().map(|c| c.commit_seq()).collect();
    assert_eq!(seqs, vec![15, 20, 25, 30]);
    for checkpoint in store.checkpoints().iter() {
        assert!(checkpoint.verify_against(store.log()).is_ok());
    }
    assert!(store.verify_integrity().is_ok());
}

#[test]
fn test_compaction_keeps_tombstones_and_allocator() {
    let mut store = Store::with_config(StoreConfig::without_checkpoints());
    let a = store.create_node("Agent").unwrap();
    let b = store.create_node("Agent").unwrap();
    store.set_field(b, "name", "Old").unwrap();
    store.commit(meta(1)).unwrap();
    store.delete_node(b).unwrap();
    store.commit(meta(2)).unwrap();
    store.set_field(a, "peer", "x").unwrap();
    store.commit(meta(3)).unwrap();

    store.compact(Some(2)).unwrap();
    let genesis = store.genesis().unwrap();
    let tomb = genesis.state().get(b).unwrap();
    assert!(tomb.deleted);
    assert_eq!(tomb.field("name"), Some(&Value::from("Old")));

    let c = store.create_node("Agent").unwrap();
    assert!(c > b);
    store.commit(CommitMetadata::at(4)).unwrap();
    assert_eq!(store.tip_seq(), 4);
    assert_eq!(store.commit_at(4).unwrap().parent_hash(), Some(store.commit_at(3).unwrap().hash()));
}

#[test]
fn test_compaction_rejects_unknown_target() {
    let mut store = random_history(17, 5, StoreConfig::without_checkpoints());
    assert!(matches!(store.compact(Some(6)), Err(MyosotisError::UnknownCommit(6))));
    assert_eq!(store.commits().len(), 5);
}
