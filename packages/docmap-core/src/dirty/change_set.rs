use std::collections::BTreeMap;
use std::mem;

use crate::value::{Attributes, Expect, Value};

use super::change::Change;

static NULL: Value = Value::Null;

/// Per-record attribute change tracking.
///
/// Holds the pending diff (attribute → value at the start of the cycle;
/// the new value is always read from the live attributes), the diff and
/// attribute snapshot taken at the last commit, and one older generation
/// of both snapshots.
///
/// The change set never owns the live attributes; every query takes them
/// as an argument so the record stays the single source of current state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Pending old values, recorded on first mutation in the cycle
    current: BTreeMap<String, Value>,
    /// Diff promoted by the most recent commit
    previous: BTreeMap<String, Change>,
    /// Full attribute snapshot taken at the most recent commit
    previous_attributes: Attributes,
    /// `previous` as it stood before the most recent commit
    changes_before_last_save: BTreeMap<String, Change>,
    /// `previous_attributes` as it stood before the most recent commit
    attributes_before_last_save: Attributes,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current live value of `attr` as its pending old value.
    ///
    /// No-op if `attr` already has a pending entry, so the first recorded
    /// old value survives any number of later writes in the cycle. The
    /// value is cloned, which detaches it from later in-place mutation of
    /// the live value.
    ///
    /// # Returns
    /// `true` if a new entry was recorded.
    pub fn mark_pending(&mut self, attr: &str, live: &Attributes) -> bool {
        let old = live.get(attr).cloned().unwrap_or(Value::Null);
        self.record_old(attr, old)
    }

    /// Records `old` as the pending old value unless one already exists.
    pub(crate) fn record_old(&mut self, attr: &str, old: Value) -> bool {
        if self.current.contains_key(attr) {
            return false;
        }
        tracing::trace!("Marking attribute '{}' pending", attr);
        self.current.insert(attr.to_string(), old);
        true
    }

    /// Returns `true` if `attr` has a pending entry, reverted or not.
    pub fn is_pending(&self, attr: &str) -> bool {
        self.current.contains_key(attr)
    }

    /// Determines whether `attr` has a pending change.
    ///
    /// False when there is no pending entry, when the live value equals
    /// the recorded old value again, when `from` rejects the old value, or
    /// when `to` rejects the live value.
    pub fn is_changed(&self, attr: &str, live: &Attributes, from: &Expect, to: &Expect) -> bool {
        let Some(old) = self.current.get(attr) else {
            return false;
        };
        let new = live.get(attr).unwrap_or(&NULL);

        if old == new {
            return false;
        }
        if !from.matches(old) {
            return false;
        }
        if !to.matches(new) {
            return false;
        }
        true
    }

    /// Old and live value of `attr` when it has a pending change.
    pub fn diff_for(&self, attr: &str, live: &Attributes) -> Option<Change> {
        if !self.is_changed(attr, live, &Expect::Any, &Expect::Any) {
            return None;
        }
        let old = self.current.get(attr)?.clone();
        let new = live.get(attr).cloned().unwrap_or(Value::Null);
        Some(Change::new(old, new))
    }

    /// Names of all attributes with a pending change, sorted.
    pub fn all_changed_names(&self, live: &Attributes) -> Vec<String> {
        self.current
            .keys()
            .filter(|attr| self.is_changed(attr, live, &Expect::Any, &Expect::Any))
            .cloned()
            .collect()
    }

    /// Every pending change keyed by attribute name.
    pub fn snapshot_all_diffs(&self, live: &Attributes) -> BTreeMap<String, Change> {
        self.all_changed_names(live)
            .into_iter()
            .filter_map(|attr| self.diff_for(&attr, live).map(|change| (attr, change)))
            .collect()
    }

    /// Returns `true` if any attribute has a pending change.
    pub fn has_changes(&self, live: &Attributes) -> bool {
        self.current
            .keys()
            .any(|attr| self.is_changed(attr, live, &Expect::Any, &Expect::Any))
    }

    /// Promotes pending changes into the last-save history.
    ///
    /// Shifts the previous diff and attribute snapshot one generation back,
    /// snapshots the pending diff and the live attributes, then clears the
    /// pending diff. Snapshots are taken before the clear.
    ///
    /// Committing with nothing pending leaves the history untouched, so a
    /// repeated commit does not overwrite the last save's diff.
    ///
    /// # Returns
    /// Number of changes promoted.
    pub fn commit(&mut self, live: &Attributes) -> usize {
        if self.current.is_empty() {
            tracing::trace!("Commit with nothing pending; history unchanged");
            return 0;
        }

        let snapshot = self.snapshot_all_diffs(live);
        let promoted = snapshot.len();

        self.changes_before_last_save = mem::replace(&mut self.previous, snapshot);
        self.attributes_before_last_save =
            mem::replace(&mut self.previous_attributes, live.clone());
        self.current.clear();

        tracing::debug!("Committed {} attribute changes", promoted);
        promoted
    }

    /// Restores the recorded old value of `attr` into `live`.
    ///
    /// # Returns
    /// The restored value, or `None` if `attr` had no pending change.
    pub fn revert(&mut self, attr: &str, live: &mut Attributes) -> Option<Value> {
        if !self.is_changed(attr, live, &Expect::Any, &Expect::Any) {
            return None;
        }
        let old = self.current.remove(attr)?;
        live.insert(attr.to_string(), old.clone());
        Some(old)
    }

    /// Discards every pending and committed entry.
    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Value of `attr` as of the save before the most recent one.
    ///
    /// Reads the one-generation-back attribute snapshot, so it is absent
    /// until a second commit has happened or when the attribute did not
    /// exist then.
    pub fn value_before_last_save(&self, attr: &str) -> Option<&Value> {
        self.attributes_before_last_save.get(attr)
    }

    /// Change recorded for `attr` by the most recent commit.
    pub fn change_during_last_save(&self, attr: &str) -> Option<&Change> {
        self.previous.get(attr)
    }

    /// Determines whether the most recent commit changed `attr`, optionally
    /// constrained on the old (`from`) and new (`to`) values.
    pub fn changed_during_last_save(&self, attr: &str, from: &Expect, to: &Expect) -> bool {
        self.previous
            .get(attr)
            .map(|change| change.matches(from, to))
            .unwrap_or(false)
    }

    /// Old value when `attr` has a pending change, otherwise the live value.
    pub fn value_before_pending_change<'a>(
        &'a self,
        attr: &str,
        live: &'a Attributes,
    ) -> Option<&'a Value> {
        if self.is_changed(attr, live, &Expect::Any, &Expect::Any) {
            self.current.get(attr)
        } else {
            live.get(attr)
        }
    }

    /// Old value from the last commit's diff, falling back to the attribute
    /// snapshot taken at that commit.
    pub fn value_before_committed_change(&self, attr: &str) -> Option<&Value> {
        match self.previous.get(attr) {
            Some(change) => Some(&change.old),
            None => self.previous_attributes.get(attr),
        }
    }

    /// Raw pending map (attribute → recorded old value).
    pub fn changed_attributes(&self) -> &BTreeMap<String, Value> {
        &self.current
    }

    /// Diff promoted by the most recent commit.
    pub fn previous_changes(&self) -> &BTreeMap<String, Change> {
        &self.previous
    }

    /// Attribute snapshot taken at the most recent commit.
    pub fn previous_attributes(&self) -> &Attributes {
        &self.previous_attributes
    }

    /// Diff promoted by the commit before the most recent one.
    pub fn changes_before_last_save(&self) -> &BTreeMap<String, Change> {
        &self.changes_before_last_save
    }

    /// Attribute snapshot taken at the commit before the most recent one.
    pub fn attributes_before_last_save(&self) -> &Attributes {
        &self.attributes_before_last_save
    }
}
