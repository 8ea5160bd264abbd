//! Incremental diff strategies for collection-typed attributes.

use std::fmt;

use crate::record::Record;
use crate::value::Value;

use super::setters::{UpdateOp, UpdateSet};

/// Translates one changed collection attribute into update operations.
///
/// Implementations own the policy: they may write zero, one, or several
/// entries into `mods`, and may choose a full replacement over element
/// operations.
pub trait IncrementalDiff: Send + Sync + fmt::Debug {
    /// Adds the operations for the change `old` → `new` of `name`, persisted
    /// under `key`.
    fn add_atomic_changes(
        &self,
        record: &Record,
        name: &str,
        key: &str,
        mods: &mut UpdateSet,
        new: &Value,
        old: &Value,
    );
}

/// Strategy for ordered arrays: appends become `Push`, anything else a
/// full `Replace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendDiff;

impl IncrementalDiff for AppendDiff {
    fn add_atomic_changes(
        &self,
        _record: &Record,
        name: &str,
        key: &str,
        mods: &mut UpdateSet,
        new: &Value,
        old: &Value,
    ) {
        let (Some(old_items), Some(new_items)) = (old.as_array(), new.as_array()) else {
            mods.insert(key.to_string(), UpdateOp::Replace(new.clone()));
            return;
        };

        if new_items.len() >= old_items.len() && new_items[..old_items.len()] == *old_items {
            let tail = &new_items[old_items.len()..];
            if !tail.is_empty() {
                tracing::trace!("Appending {} members to '{}'", tail.len(), name);
                mods.insert(key.to_string(), UpdateOp::Push(tail.to_vec()));
            }
        } else {
            mods.insert(key.to_string(), UpdateOp::Replace(new.clone()));
        }
    }
}

/// Strategy for sets and many-valued references: added members become
/// `AddToSet`, removed members `Pull`. When both happen in one cycle the
/// collection is replaced, since one key carries one operation.
///
/// `Pull` drops every copy of a member and `AddToSet` skips members already
/// present, so a change in how often a member occurs is also a `Replace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipDiff;

impl MembershipDiff {
    /// Splits the change into (added, removed) members, counting duplicates.
    pub fn members_delta(old: &[Value], new: &[Value]) -> (Vec<Value>, Vec<Value>) {
        let mut remaining: Vec<&Value> = old.iter().collect();
        let mut added = Vec::new();

        for item in new {
            match remaining.iter().position(|candidate| *candidate == item) {
                Some(pos) => {
                    remaining.swap_remove(pos);
                }
                None => added.push(item.clone()),
            }
        }

        let removed = remaining.into_iter().cloned().collect();
        (added, removed)
    }
}

impl IncrementalDiff for MembershipDiff {
    fn add_atomic_changes(
        &self,
        _record: &Record,
        name: &str,
        key: &str,
        mods: &mut UpdateSet,
        new: &Value,
        old: &Value,
    ) {
        let (Some(old_items), Some(new_items)) = (old.as_array(), new.as_array()) else {
            mods.insert(key.to_string(), UpdateOp::Replace(new.clone()));
            return;
        };

        let (added, removed) = Self::members_delta(old_items, new_items);
        tracing::trace!(
            "Membership diff for '{}': {} added, {} removed",
            name,
            added.len(),
            removed.len()
        );

        let multiplicity_changed = removed.iter().any(|item| new_items.contains(item))
            || added.iter().any(|item| old_items.contains(item));
        if multiplicity_changed {
            mods.insert(key.to_string(), UpdateOp::Replace(new.clone()));
            return;
        }

        match (added.is_empty(), removed.is_empty()) {
            (true, true) => {}
            (false, true) => {
                mods.insert(key.to_string(), UpdateOp::AddToSet(added));
            }
            (true, false) => {
                mods.insert(key.to_string(), UpdateOp::Pull(removed));
            }
            (false, false) => {
                mods.insert(key.to_string(), UpdateOp::Replace(new.clone()));
            }
        }
    }
}
