use super::*;
use crate::record::Record;
use crate::schema::{FieldDescriptor, FieldType, Schema};
use crate::value::{Attributes, Expect, Value};
use ntest::timeout;
use std::sync::Arc;

fn attrs(pairs: &[(&str, Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn post_schema() -> Arc<Schema> {
    Schema::builder("post")
        .field(
            FieldDescriptor::builder("title", FieldType::String)
                .storage_key("t")
                .build(),
        )
        .field(FieldDescriptor::new("tags", FieldType::Array))
        .field(FieldDescriptor::new("labels", FieldType::Set))
        .field(FieldDescriptor::new("body", FieldType::String))
        .build()
        .unwrap()
}

fn persisted_post(pairs: &[(&str, Value)]) -> Record {
    Record::hydrate(post_schema(), Some("p1".to_string()), attrs(pairs))
}

// ChangeSet

#[test]
#[timeout(1000)]
fn test_mark_pending_records_first_old_value() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);

    assert!(set.mark_pending("name", &live));
    live.insert("name".to_string(), Value::from("b"));
    assert!(!set.mark_pending("name", &live));

    let change = set.diff_for("name", &live).unwrap();
    assert_eq!(change.old, Value::from("a"));
    assert_eq!(change.new, Value::from("b"));
}

#[test]
#[timeout(1000)]
fn test_mark_pending_detaches_from_live_value() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("tags", Value::from(vec![1, 2]))]);

    set.mark_pending("tags", &live);
    live.get_mut("tags")
        .and_then(Value::as_array_mut)
        .unwrap()
        .push(Value::from(3));

    let change = set.diff_for("tags", &live).unwrap();
    assert_eq!(change.old, Value::from(vec![1, 2]));
    assert_eq!(change.new, Value::from(vec![1, 2, 3]));
}

#[test]
#[timeout(1000)]
fn test_pending_entry_equal_to_live_is_not_a_change() {
    let mut set = ChangeSet::new();
    let live = attrs(&[("name", Value::from("a"))]);
    set.mark_pending("name", &live);

    assert!(set.is_pending("name"));
    assert!(!set.is_changed("name", &live, &Expect::Any, &Expect::Any));
    assert!(set.all_changed_names(&live).is_empty());
    assert!(!set.has_changes(&live));
    assert_eq!(set.changed_attributes().len(), 1);
}

#[test]
#[timeout(1000)]
fn test_is_changed_with_bounds() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);
    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("b"));

    assert!(set.is_changed("name", &live, &Expect::is("a"), &Expect::Any));
    assert!(set.is_changed("name", &live, &Expect::Any, &Expect::is("b")));
    assert!(set.is_changed("name", &live, &Expect::is("a"), &Expect::is("b")));
    assert!(!set.is_changed("name", &live, &Expect::is("x"), &Expect::Any));
    assert!(!set.is_changed("name", &live, &Expect::Any, &Expect::is("x")));
    assert!(!set.is_changed("other", &live, &Expect::Any, &Expect::Any));
}

#[test]
#[timeout(1000)]
fn test_commit_promotes_and_clears() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);
    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("b"));

    assert_eq!(set.commit(&live), 1);
    assert!(!set.has_changes(&live));
    assert!(set.changed_attributes().is_empty());
    assert_eq!(
        set.change_during_last_save("name"),
        Some(&Change::new(Value::from("a"), Value::from("b")))
    );
    assert_eq!(set.previous_attributes(), &live);
    assert!(set.changes_before_last_save().is_empty());
}

#[test]
#[timeout(1000)]
fn test_commit_with_nothing_pending_keeps_history() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);
    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("b"));
    set.commit(&live);
    let after_first = set.clone();

    assert_eq!(set.commit(&live), 0);
    assert_eq!(set, after_first);
    assert!(set.changed_during_last_save("name", &Expect::Any, &Expect::Any));
}

#[test]
#[timeout(1000)]
fn test_second_commit_shifts_history() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);

    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("b"));
    set.commit(&live);
    assert!(set.value_before_last_save("name").is_none());

    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("c"));
    set.commit(&live);

    assert_eq!(set.value_before_last_save("name"), Some(&Value::from("b")));
    assert_eq!(
        set.changes_before_last_save().get("name"),
        Some(&Change::new(Value::from("a"), Value::from("b")))
    );
    assert_eq!(set.value_before_committed_change("name"), Some(&Value::from("b")));
}

#[test]
#[timeout(1000)]
fn test_revert_restores_old_value() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);
    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("b"));

    assert_eq!(set.revert("name", &mut live), Some(Value::from("a")));
    assert_eq!(live["name"], Value::from("a"));
    assert!(!set.is_pending("name"));
    assert_eq!(set.revert("name", &mut live), None);
}

#[test]
#[timeout(1000)]
fn test_value_before_pending_change() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);
    assert_eq!(set.value_before_pending_change("name", &live), Some(&Value::from("a")));

    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("b"));
    assert_eq!(set.value_before_pending_change("name", &live), Some(&Value::from("a")));
    assert_eq!(set.value_before_pending_change("missing", &live), None);
}

#[test]
#[timeout(1000)]
fn test_reset_all() {
    let mut set = ChangeSet::new();
    let mut live = attrs(&[("name", Value::from("a"))]);
    set.mark_pending("name", &live);
    live.insert("name".to_string(), Value::from("b"));
    set.commit(&live);
    set.mark_pending("name", &live);

    set.reset_all();
    assert_eq!(set, ChangeSet::new());
}

// Incremental diffs

#[test]
#[timeout(1000)]
fn test_members_delta_counts_duplicates() {
    let old = vec![Value::from(1), Value::from(1), Value::from(2)];
    let new = vec![Value::from(1), Value::from(3)];
    let (added, removed) = MembershipDiff::members_delta(&old, &new);
    assert_eq!(added, vec![Value::from(3)]);
    assert_eq!(removed.len(), 2);
    assert!(removed.contains(&Value::from(1)));
    assert!(removed.contains(&Value::from(2)));
}

#[test]
#[timeout(1000)]
fn test_append_becomes_push() {
    let mut record = persisted_post(&[("tags", Value::from(vec![1, 2]))]);
    record.modify_attribute("tags", |tags| {
        if let Some(items) = tags.as_array_mut() {
            items.push(Value::from(3));
        }
    });

    let mods = build_update_ops(&record);
    assert_eq!(mods.len(), 1);
    assert_eq!(mods["tags"], UpdateOp::Push(vec![Value::from(3)]));
}

#[test]
#[timeout(1000)]
fn test_non_append_array_change_replaces() {
    let mut record = persisted_post(&[("tags", Value::from(vec![1, 2]))]);
    record.write_attribute("tags", vec![2, 1]);

    let mods = build_update_ops(&record);
    assert_eq!(mods["tags"], UpdateOp::Replace(Value::from(vec![2, 1])));
}

#[test]
#[timeout(1000)]
fn test_set_membership_operations() {
    let mut record = persisted_post(&[("labels", Value::from(vec!["a", "b"]))]);
    record.write_attribute("labels", vec!["a", "b", "c"]);
    assert_eq!(
        build_update_ops(&record)["labels"],
        UpdateOp::AddToSet(vec![Value::from("c")])
    );

    let mut record = persisted_post(&[("labels", Value::from(vec!["a", "b"]))]);
    record.write_attribute("labels", vec!["b"]);
    assert_eq!(
        build_update_ops(&record)["labels"],
        UpdateOp::Pull(vec![Value::from("a")])
    );

    let mut record = persisted_post(&[("labels", Value::from(vec!["a", "b"]))]);
    record.write_attribute("labels", vec!["b", "a"]);
    assert!(build_update_ops(&record).is_empty());
}

#[test]
#[timeout(1000)]
fn test_dropping_a_duplicate_member_replaces() {
    let mut record = persisted_post(&[("labels", Value::from(vec!["u1", "u1", "u2"]))]);
    record.write_attribute("labels", vec!["u1", "u2"]);
    assert_eq!(
        build_update_ops(&record)["labels"],
        UpdateOp::Replace(Value::from(vec!["u1", "u2"]))
    );
}

#[test]
#[timeout(1000)]
fn test_adding_a_duplicate_member_replaces() {
    let mut record = persisted_post(&[("labels", Value::from(vec!["u1"]))]);
    record.write_attribute("labels", vec!["u1", "u1"]);
    assert_eq!(
        build_update_ops(&record)["labels"],
        UpdateOp::Replace(Value::from(vec!["u1", "u1"]))
    );

    // Distinct new members still go out as AddToSet next to kept duplicates.
    let mut record = persisted_post(&[("labels", Value::from(vec!["u1", "u1"]))]);
    record.write_attribute("labels", vec!["u1", "u1", "u2"]);
    assert_eq!(
        build_update_ops(&record)["labels"],
        UpdateOp::AddToSet(vec![Value::from("u2")])
    );
}

#[test]
#[timeout(1000)]
fn test_collection_from_null_replaces() {
    let mut record = persisted_post(&[]);
    record.write_attribute("tags", vec![1]);
    assert_eq!(
        build_update_ops(&record)["tags"],
        UpdateOp::Replace(Value::from(vec![1]))
    );
}

// Update building

#[test]
#[timeout(1000)]
fn test_scalar_change_uses_storage_key() {
    let mut record = persisted_post(&[("title", Value::from("a"))]);
    record.write_attribute("title", "b");

    let mods = build_update_ops(&record);
    assert_eq!(mods.len(), 1);
    assert_eq!(mods["t"], UpdateOp::Replace(Value::from("b")));
    assert!(!mods.contains_key("title"));
}

#[test]
#[timeout(1000)]
fn test_unset_wins_over_other_operations() {
    let mut record = persisted_post(&[
        ("title", Value::from("a")),
        ("tags", Value::from(vec![1])),
    ]);
    record.write_attribute("title", "b");
    record.unset("title");
    record.modify_attribute("tags", |tags| {
        if let Some(items) = tags.as_array_mut() {
            items.push(Value::from(2));
        }
    });
    record.unset("tags");

    let mods = build_update_ops(&record);
    assert_eq!(mods["t"], UpdateOp::Unset);
    assert_eq!(mods["tags"], UpdateOp::Unset);
    assert_eq!(mods.len(), 2);
}

#[test]
#[timeout(1000)]
fn test_reverted_attribute_not_in_update() {
    let mut record = persisted_post(&[("title", Value::from("a"))]);
    record.write_attribute("title", "b");
    record.write_attribute("title", "a");
    assert!(build_update_ops(&record).is_empty());
}

#[test]
#[timeout(1000)]
fn test_undeclared_attribute_replaced_under_own_name() {
    let mut record = persisted_post(&[]);
    record.write_attribute("extra", 5);
    assert_eq!(
        build_update_ops(&record)["extra"],
        UpdateOp::Replace(Value::from(5))
    );
}

#[test]
#[timeout(1000)]
fn test_update_set_json() {
    let mut record = persisted_post(&[("title", Value::from("a")), ("body", Value::from("x"))]);
    record.write_attribute("title", "b");
    record.unset("body");

    let json = update_set_to_json(&build_update_ops(&record));
    assert_eq!(
        json,
        serde_json::json!({"t": {"$set": "b"}, "body": {"$unset": true}})
    );
}
