// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::support::random_history;
use crate::checkpoint::CheckpointStore;
use crate::commit::CommitMetadata;
use crate::config::StoreConfig;
use crate::error::{IntegrityViolation, MyosotisError};
use crate::log::CommitLog;
use crate::store::{LoadMode, Store};
use crate::types::id::NodeId;
use crate::types::value::Value;
use crate::verify::verify_integrity;

fn tampered_log(store: &Store, edit: impl FnOnce(&mut Vec<crate::commit::Commit>)) -> CommitLog {
    let mut commits = store.commits().to_vec();
    edit(&mut commits);
    CommitLog::from_parts(store.log().base_seq(), store.log().anchor(), commits)
}

#[test]
fn test_clean_history_verifies() {
    let store = random_history(41, 30, StoreConfig::with_interval(6));
    let report = store.verify_integrity().unwrap();
    assert_eq!(report.commits_checked, 30);
    assert_eq!(report.checkpoints_checked, 5);
    assert_eq!(report.tip_seq, 30);
    assert_eq!(report.tip_state_hash, crate::snapshot::blake3::hash_state(store.head()));
}

#[test]
fn test_edited_metadata_is_detected() {
    let store = random_history(42, 10, StoreConfig::without_checkpoints());
    let log = tampered_log(&store, |commits| {
        commits[4].metadata.label = Some("rewritten".into());
    });
    match log.verify_chain() {
        Err(IntegrityViolation::CommitHash { seq, .. }) => assert_eq!(seq, 5),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_rehashed_commit_breaks_the_link() {
    let store = random_history(43, 10, StoreConfig::without_checkpoints());
    let log = tampered_log(&store, |commits| {
        let commit = &mut commits[3];
        commit.mutations.push(crate::state::mutation::Mutation::CreateNode {
            id: NodeId(999),
            ty: "Ghost".into(),
        });
        commit.hash = commit.computed_hash();
    });
    assert_eq!(log.verify_chain(), Err(IntegrityViolation::ParentHash { seq: 5 }));
}

#[test]
fn test_removed_commit_breaks_sequence() {
    let store = random_history(44, 10, StoreConfig::without_checkpoints());
    let log = tampered_log(&store, |commits| {
        commits.remove(6);
    });
    assert_eq!(
        log.verify_chain(),
        Err(IntegrityViolation::Sequence { position: 6, found: 8, expected: 7 })
    );
}

#[test]
fn test_stale_allocator_mark_is_detected() {
    let store = random_history(45, 10, StoreConfig::without_checkpoints());
    let stale = NodeId(store.next_node_id().0 - 1);
    let err = verify_integrity(store.genesis(), store.log(), store.checkpoints(), stale).unwrap_err();
    assert!(matches!(
        err,
        MyosotisError::Integrity(IntegrityViolation::Allocator { .. })
    ));
}

#[test]
fn test_tampered_genesis_is_detected() {
    let mut store = random_history(46, 12, StoreConfig::without_checkpoints());
    store.compact(Some(6)).unwrap();

    let mut genesis = store.genesis().unwrap().clone();
    let node = genesis.state.nodes.values_mut().next().unwrap();
    node.fields.insert("forged".into(), Value::Bool(true));

    let err = verify_integrity(Some(&genesis), store.log(), store.checkpoints(), store.next_node_id())
        .unwrap_err();
    assert!(matches!(err, MyosotisError::Integrity(IntegrityViolation::GenesisHash)));
}

#[test]
fn test_open_rejects_bad_checkpoint_in_strict_mode() {
    let store = random_history(47, 20, StoreConfig::with_interval(5));
    let mut entries = store.checkpoints().clone().into_vec();
    entries[1].commit_hash = entries[0].commit_hash;
    let checkpoints = CheckpointStore::from_vec(entries);

    let err = Store::open(
        *store.config(),
        None,
        store.log().clone(),
        checkpoints,
        store.next_node_id(),
        LoadMode::Strict,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        MyosotisError::Integrity(IntegrityViolation::CheckpointCommit { seq: 10 })
    ));
}

#[test]
fn test_recovery_mode_blocks_writes_until_repair() {
    let store = random_history(48, 20, StoreConfig::with_interval(5));
    let mut entries = store.checkpoints().clone().into_vec();
    entries[2]
        .state
        .nodes
        .values_mut()
        .next()
        .unwrap()
        .fields
        .insert("forged".into(), Value::Int(0));
    let checkpoints = CheckpointStore::from_vec(entries);

    let mut opened = Store::open(
        *store.config(),
        None,
        store.log().clone(),
        checkpoints,
        store.next_node_id(),
        LoadMode::Recovery,
    )
    .unwrap();
    assert!(!opened.is_writable());
    assert_eq!(opened.head(), store.head());
    assert!(matches!(opened.create_node("Agent"), Err(MyosotisError::WritesBlocked)));
    assert!(matches!(opened.compact(None), Err(MyosotisError::WritesBlocked)));
    assert!(matches!(opened.prune_checkpoints(), Err(MyosotisError::WritesBlocked)));
    assert!(matches!(opened.regenerate_checkpoints(), Err(MyosotisError::WritesBlocked)));
    assert_eq!(opened.checkpoints().len(), 4);

    let report = opened.repair().unwrap();
    assert_eq!(report.tip_seq, 20);
    assert!(opened.is_writable());
    assert_eq!(opened.checkpoints(), store.checkpoints());

    opened.create_node("Agent").unwrap();
    opened.commit(CommitMetadata::at(99)).unwrap();
    assert_eq!(opened.tip_seq(), 21);
}

#[test]
fn test_repair_cannot_fix_a_broken_chain() {
    let store = random_history(49, 8, StoreConfig::without_checkpoints());
    let log = tampered_log(&store, |commits| {
        commits[2].metadata.timestamp += 1;
    });

    let mut opened = Store::open(
        *store.config(),
        None,
        log,
        CheckpointStore::new(),
        store.next_node_id(),
        LoadMode::Recovery,
    )
    .unwrap();
    assert!(!opened.is_writable());
    assert!(opened.repair().unwrap_err().is_integrity());
    assert!(!opened.is_writable());
}

#[test]
fn test_edited_mutation_value_is_detected() {
    use crate::state::mutation::Mutation;

    let store = random_history(50, 12, StoreConfig::without_checkpoints());
    let target = store
        .commits()
        .iter()
        .position(|c| c.mutations().iter().any(|m| matches!(m, Mutation::SetField { .. })))
        .unwrap();

    let log = tampered_log(&store, |commits| {
        for mutation in &mut commits[target].mutations {
            if let Mutation::SetField { value, .. } = mutation {
                *value = Value::Str("tampered".into());
                break;
            }
        }
    });
    let err = verify_integrity(None, &log, &CheckpointStore::new(), store.next_node_id()).unwrap_err();
    assert!(matches!(
        err,
        MyosotisError::Integrity(IntegrityViolation::CommitHash { seq, .. }) if seq == target as u64 + 1
    ));
}
