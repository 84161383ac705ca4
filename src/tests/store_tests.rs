// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::commit::CommitMetadata;
use crate::diff::{Change, DeltaEntry};
use crate::error::MyosotisError;
use crate::state::mutation::Mutation;
use crate::store::Store;
use crate::types::value::Value;

#[test]
fn test_agent_goal_scenario() {
    let mut store = Store::new();
    let agent = store.create_node("Agent").unwrap();
    store.set_field(agent, "name", "Iris").unwrap();
    let c0 = store.commit(CommitMetadata::at(1).with_label("init")).unwrap().seq();

    store.set_field(agent, "goal", "Explore").unwrap();
    let c1 = store.commit(CommitMetadata::at(2).with_label("goal")).unwrap().seq();

    let s0 = store.materialize(c0).unwrap();
    let node0 = s0.get(agent).unwrap();
    assert_eq!(node0.field("name"), Some(&Value::from("Iris")));
    assert!(node0.field("goal").is_none());

    let s1 = store.materialize(c1).unwrap();
    assert_eq!(s1.get(agent).unwrap().field("goal"), Some(&Value::from("Explore")));

    let delta = store.diff(c0, c1).unwrap();
    assert_eq!(
        delta.entries,
        vec![DeltaEntry {
            node: agent,
            change: Change::Field {
                name: "goal".into(),
                old: None,
                new: Some(Value::from("Explore")),
            },
        }]
    );
}

#[test]
fn test_delete_scenario_keeps_tombstone_in_history() {
    let mut store = Store::new();
    let agent = store.create_node("Agent").unwrap();
    store.set_field(agent, "name", "Iris").unwrap();
    store.commit(CommitMetadata::at(1).with_label("init")).unwrap();
    store.set_field(agent, "goal", "Explore").unwrap();
    store.commit(CommitMetadata::at(2).with_label("goal")).unwrap();

    store.delete_node(agent).unwrap();
    let deleted_at = store.commit(CommitMetadata::at(3).with_label("delete")).unwrap().seq();

    let after = store.materialize(deleted_at).unwrap();
    let node = after.get(agent).unwrap();
    assert!(node.deleted);
    assert_eq!(node.field("name"), Some(&Value::from("Iris")));
    assert_eq!(node.field("goal"), Some(&Value::from("Explore")));

    store.set_field(agent, "goal", "Rest").unwrap();
    let later = store.commit(CommitMetadata::at(4)).unwrap().seq();

    assert!(store.materialize(deleted_at).unwrap().get(agent).unwrap().deleted);
    assert_eq!(
        store.materialize(deleted_at).unwrap().get(agent).unwrap().field("goal"),
        Some(&Value::from("Explore"))
    );
    assert_eq!(
        store.materialize(later).unwrap().get(agent).unwrap().field("goal"),
        Some(&Value::from("Rest"))
    );
    assert!(store
        .commit_at(deleted_at)
        .unwrap()
        .mutations()
        .contains(&Mutation::DeleteNode { id: agent }));
}

#[test]
fn test_tombstones_stay_enumerable() {
    let mut store = Store::new();
    let a = store.create_node("Agent").unwrap();
    let b = store.create_node("Agent").unwrap();
    store.set_field(b, "n", 7i64).unwrap();
    store.commit(CommitMetadata::at(1)).unwrap();
    store.delete_node(b).unwrap();
    store.commit(CommitMetadata::at(2)).unwrap();

    let ids: Vec<_> = store.head().nodes().map(|n| n.id).collect();
    assert_eq!(ids, vec![a, b]);
    let live: Vec<_> = store.head().live_nodes().map(|n| n.id).collect();
    assert_eq!(live, vec![a]);
    assert_eq!(store.node(b).unwrap().field("n"), Some(&Value::Int(7)));
}

#[test]
fn test_staged_changes_invisible_until_commit() {
    let mut store = Store::new();
    let id = store.create_node("Agent").unwrap();
    assert!(store.node(id).is_none());
    assert!(store.staged_node(id).is_some());
    assert_eq!(store.tip_seq(), 0);

    store.commit(CommitMetadata::at(1)).unwrap();
    assert!(store.node(id).is_some());
}

#[test]
fn test_history_lists_commits_in_order() {
    let mut store = Store::new();
    let id = store.create_node("Agent").unwrap();
    store
        .commit(CommitMetadata::at(10).with_label("init").with_user_data(b"ctx".to_vec()))
        .unwrap();
    store.set_field(id, "a", 1i64).unwrap();
    store.set_field(id, "b", 2i64).unwrap();
    store.commit(CommitMetadata::at(20)).unwrap();

    let history = store.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].seq, 1);
    assert_eq!(history[0].label.as_deref(), Some("init"));
    assert_eq!(history[1].seq, 2);
    assert_eq!(history[1].mutation_count, 2);
    assert_eq!(history[1].timestamp, 20);

    let c2 = store.commit_at(2).unwrap();
    assert_eq!(c2.parent_hash(), Some(history[0].hash));
    assert_eq!(store.commit_by_hash(&history[0].hash).unwrap().seq(), 1);
    assert_eq!(store.commit_at(1).unwrap().metadata().user_data.as_deref(), Some(&b"ctx"[..]));
}

#[test]
fn test_unknown_commit() {
    let mut store = Store::new();
    store.create_node("Agent").unwrap();
    store.commit(CommitMetadata::at(1)).unwrap();

    assert!(matches!(store.materialize(2), Err(MyosotisError::UnknownCommit(2))));
    assert!(matches!(store.diff(0, 9), Err(MyosotisError::UnknownCommit(9))));
    assert!(store.materialize(0).unwrap().is_empty());
}

#[test]
fn test_concurrent_readers() {
    let store = super::support::random_history(7, 40, Default::default());
    let tip = store.tip_seq();

    let states: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| store.materialize(tip).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for state in &states {
        assert_eq!(state, store.head());
    }
}
