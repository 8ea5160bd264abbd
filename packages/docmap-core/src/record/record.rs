use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::dirty::{build_update_ops, Change, ChangeSet, UpdateSet};
use crate::error::{ModelError, Result};
use crate::schema::{FieldType, Schema};
use crate::value::{json_type_name, Attributes, Expect, Value};

/// In-memory record bound to a persisted document.
///
/// Owns the live attribute values and exactly one [`ChangeSet`]. Every
/// write goes through [`Record::write_attribute`], which records the
/// pending old value; hydration bypasses tracking.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    id: Option<String>,
    attributes: Attributes,
    changes: ChangeSet,
    /// Storage keys marked for removal
    unsets: BTreeSet<String>,
    new_record: bool,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("kind", &self.schema.kind())
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("changes", &self.changes)
            .field("unsets", &self.unsets)
            .field("new_record", &self.new_record)
            .finish()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.kind() == other.schema.kind()
            && self.id == other.id
            && self.attributes == other.attributes
    }
}

impl Record {
    /// Creates a new record with every declared attribute at its default.
    ///
    /// Defaults are evaluated in declaration order, so an evaluator sees the
    /// defaults of earlier fields. Nothing is marked as changed.
    pub fn new(schema: Arc<Schema>) -> Self {
        let attributes = schema
            .field_names()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        let mut record = Self {
            schema: Arc::clone(&schema),
            id: None,
            attributes,
            changes: ChangeSet::new(),
            unsets: BTreeSet::new(),
            new_record: true,
        };

        for field in schema.fields().iter().filter(|f| f.has_default()) {
            let value = field.eval_default(&record);
            record.attributes.insert(field.name().to_string(), value);
        }
        record
    }

    /// Creates a new record and writes `attributes` through the tracked
    /// writer, so each differing value shows up as a change.
    pub fn with_attributes<I, K, V>(schema: Arc<Schema>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Self::new(schema);
        for (name, value) in attributes {
            record.write_attribute(name.as_ref(), value);
        }
        record
    }

    /// Builds a record from stored attributes without recording changes.
    pub fn hydrate(schema: Arc<Schema>, id: Option<String>, attributes: Attributes) -> Self {
        let mut record = Self::new(schema);
        record.attributes.extend(attributes);
        record.id = id;
        record.new_record = false;
        record
    }

    /// Builds a record from a stored JSON object without recording changes.
    ///
    /// An `id` key in the object is ignored; the identifier is passed
    /// separately.
    pub fn from_json(
        schema: Arc<Schema>,
        id: Option<String>,
        json: &serde_json::Value,
    ) -> Result<Self> {
        let attributes = Self::attributes_from_json(&schema, json)?;
        Ok(Self::hydrate(schema, id, attributes))
    }

    /// Converts a stored JSON object, keyed by storage key, into attribute
    /// values. The `id` key is skipped.
    pub(crate) fn attributes_from_json(
        schema: &Schema,
        json: &serde_json::Value,
    ) -> Result<Attributes> {
        let serde_json::Value::Object(map) = json else {
            return Err(ModelError::TypeMismatch {
                expected: "object".to_string(),
                got: json_type_name(json).to_string(),
            });
        };

        let mut attributes = Attributes::new();
        for (key, value) in map.iter().filter(|(key, _)| key.as_str() != "id") {
            let name = schema.attribute_for_key(key);
            attributes.insert(name.to_string(), schema.hydrate_value(name, value)?);
        }
        Ok(attributes)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Returns `true` until the record has been persisted or hydrated.
    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    pub(crate) fn mark_persisted(&mut self, id: String) {
        self.id = Some(id);
        self.new_record = false;
    }

    /// Live attribute values.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The record's change set.
    pub fn change_set(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn read_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Writes an attribute, recording the previous value as the pending old
    /// value when the write changes it and nothing is pending yet.
    pub fn write_attribute(&mut self, name: &str, value: impl Into<Value>) {
        let previous = self
            .attributes
            .insert(name.to_string(), value.into())
            .unwrap_or(Value::Null);

        if self.attributes.get(name) != Some(&previous) {
            self.changes.record_old(name, previous);
        }
    }

    /// Mutates an attribute in place after marking it pending.
    pub fn modify_attribute<F>(&mut self, name: &str, mutate: F)
    where
        F: FnOnce(&mut Value),
    {
        self.attribute_will_change(name);
        let value = self
            .attributes
            .entry(name.to_string())
            .or_insert(Value::Null);
        mutate(value);
    }

    /// Replaces all attributes from storage and discards change history.
    pub(crate) fn replace_attributes(&mut self, attributes: Attributes) {
        let mut fresh: Attributes = self
            .schema
            .field_names()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        fresh.extend(attributes);
        self.attributes = fresh;
        self.reset_object();
    }

    /// Key under which `name` is persisted.
    pub fn storage_key(&self, name: &str) -> String {
        self.schema
            .lookup(name)
            .map(|f| f.storage_key().to_string())
            .unwrap_or_else(|| name.to_string())
    }

    /// Removes an attribute and marks its storage key for unset.
    ///
    /// The unset wins over any other update to the same key until the next
    /// commit.
    pub fn unset(&mut self, name: &str) {
        self.attribute_will_change(name);
        self.attributes.remove(name);
        let key = self.storage_key(name);
        tracing::trace!("Marking '{}' for unset", key);
        self.unsets.insert(key);
    }

    /// Storage keys marked for unset.
    pub fn atomic_unsets(&self) -> &BTreeSet<String> {
        &self.unsets
    }

    // Per-attribute change queries

    /// Forces `name` pending without writing it.
    pub fn attribute_will_change(&mut self, name: &str) -> bool {
        self.changes.mark_pending(name, &self.attributes)
    }

    pub fn attribute_changed(&self, name: &str, from: &Expect, to: &Expect) -> bool {
        self.changes.is_changed(name, &self.attributes, from, to)
    }

    pub fn will_save_change_to_attribute(&self, name: &str, from: &Expect, to: &Expect) -> bool {
        self.attribute_changed(name, from, to)
    }

    pub fn attribute_change(&self, name: &str) -> Option<Change> {
        self.changes.diff_for(name, &self.attributes)
    }

    /// Returns `true` if `name` is declared and its live value differs from
    /// the evaluated default.
    pub fn attribute_changed_from_default(&self, name: &str) -> bool {
        let Some(field) = self.schema.lookup(name) else {
            return false;
        };
        let live = self.attributes.get(name).cloned().unwrap_or(Value::Null);
        live != field.eval_default(self)
    }

    pub fn attribute_was(&self, name: &str) -> Option<&Value> {
        self.changes.value_before_pending_change(name, &self.attributes)
    }

    pub fn attribute_previously_was(&self, name: &str) -> Option<&Value> {
        self.changes.value_before_committed_change(name)
    }

    pub fn attribute_before_last_save(&self, name: &str) -> Option<&Value> {
        self.changes.value_before_last_save(name)
    }

    pub fn saved_change_to_attribute(&self, name: &str) -> Option<&Change> {
        self.changes.change_during_last_save(name)
    }

    pub fn saved_change_to_attribute_matches(
        &self,
        name: &str,
        from: &Expect,
        to: &Expect,
    ) -> bool {
        self.changes.changed_during_last_save(name, from, to)
    }

    pub fn attribute_previously_changed(&self, name: &str) -> bool {
        self.changes.previous_changes().contains_key(name)
    }

    pub fn attribute_previous_change(&self, name: &str) -> Option<&Change> {
        self.changes.previous_changes().get(name)
    }

    /// Restores the pending old value of `name`.
    ///
    /// # Returns
    /// The restored value, or `None` if nothing was pending.
    pub fn reset_attribute(&mut self, name: &str) -> Option<Value> {
        self.changes.revert(name, &mut self.attributes)
    }

    /// Writes the evaluated default (or `Null` for undeclared attributes)
    /// through the tracked writer.
    pub fn reset_attribute_to_default(&mut self, name: &str) {
        let value = match self.schema.lookup(name) {
            Some(field) => field.eval_default(self),
            None => Value::Null,
        };
        self.write_attribute(name, value);
    }

    // Record-level views

    /// Names of attributes with a pending change.
    pub fn changed(&self) -> Vec<String> {
        self.changes.all_changed_names(&self.attributes)
    }

    /// Pending changes keyed by attribute name.
    pub fn changes(&self) -> BTreeMap<String, Change> {
        self.changes.snapshot_all_diffs(&self.attributes)
    }

    /// Raw pending map, reverted entries included.
    pub fn changed_attributes(&self) -> &BTreeMap<String, Value> {
        self.changes.changed_attributes()
    }

    pub fn previous_changes(&self) -> &BTreeMap<String, Change> {
        self.changes.previous_changes()
    }

    /// Returns `true` if an own attribute has a pending change.
    pub fn has_attribute_changes(&self) -> bool {
        self.changes.has_changes(&self.attributes)
    }

    /// Returns `true` if an own attribute or a direct child changed.
    pub fn is_changed(&self) -> bool {
        self.has_attribute_changes() || self.children_changed()
    }

    /// Returns `true` if a direct embedded child has attribute changes of
    /// its own. Grandchildren are not consulted.
    pub fn children_changed(&self) -> bool {
        self.children()
            .any(|(_, child)| child.has_attribute_changes())
    }

    /// Embedded child records, identified by `Document` field type.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Record)> + '_ {
        self.attributes
            .iter()
            .filter(|(name, _)| self.is_document_field(name))
            .filter_map(|(name, value)| value.as_document().map(|child| (name.as_str(), child)))
    }

    pub(crate) fn children_mut(&mut self) -> impl Iterator<Item = (&str, &mut Record)> + '_ {
        let schema = Arc::clone(&self.schema);
        self.attributes
            .iter_mut()
            .filter(move |(name, _)| {
                matches!(schema.lookup(name).map(|f| f.ty()), Some(FieldType::Document))
            })
            .filter_map(|(name, value)| {
                value
                    .as_document_mut()
                    .map(|child| (name.as_str(), child))
            })
    }

    /// Mutable access to an embedded child record.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Record> {
        if !self.is_document_field(name) {
            return None;
        }
        self.attributes.get_mut(name)?.as_document_mut()
    }

    fn is_document_field(&self, name: &str) -> bool {
        matches!(
            self.schema.lookup(name).map(|f| f.ty()),
            Some(FieldType::Document)
        )
    }

    /// Partial-update payload for the pending changes.
    pub fn build_update_ops(&self) -> UpdateSet {
        build_update_ops(self)
    }

    /// Commit hook called once after a successful write.
    ///
    /// # Returns
    /// Number of changes promoted.
    pub fn changes_applied(&mut self) -> usize {
        self.unsets.clear();
        self.changes.commit(&self.attributes)
    }

    /// Commits this record and every embedded descendant.
    pub(crate) fn commit_tree(&mut self) -> usize {
        let mut promoted = self.changes_applied();
        for (_, child) in self.children_mut() {
            promoted += child.commit_tree();
        }
        promoted
    }

    /// Full-reset hook: drops pending, committed, and unset state.
    pub fn reset_object(&mut self) {
        self.changes.reset_all();
        self.unsets.clear();
    }

    /// Same as [`Record::reset_object`].
    pub fn clear_changes_information(&mut self) {
        self.reset_object();
    }

    /// Renders the stored form: a JSON object keyed by storage key.
    pub fn to_json(&self, include_id: bool) -> serde_json::Value {
        let mut object: serde_json::Map<String, serde_json::Value> = self
            .attributes
            .iter()
            .map(|(name, value)| (self.storage_key(name), value.to_json()))
            .collect();
        if include_id {
            if let Some(id) = &self.id {
                object.insert("id".to_string(), serde_json::Value::String(id.clone()));
            }
        }
        serde_json::Value::Object(object)
    }
}
