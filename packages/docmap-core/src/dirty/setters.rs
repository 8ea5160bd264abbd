//! Diff-to-update translation.

use std::collections::BTreeMap;

use crate::record::Record;
use crate::value::Value;

/// Single atomic update applied to one storage key.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Overwrite the stored value
    Replace(Value),
    /// Remove the key from the stored document
    Unset,
    /// Append members to an ordered array
    Push(Vec<Value>),
    /// Add members not already present
    AddToSet(Vec<Value>),
    /// Remove every occurrence of the members
    Pull(Vec<Value>),
}

impl UpdateOp {
    /// Operator name as sent to the store.
    pub fn operator(&self) -> &'static str {
        match self {
            UpdateOp::Replace(_) => "$set",
            UpdateOp::Unset => "$unset",
            UpdateOp::Push(_) => "$push",
            UpdateOp::AddToSet(_) => "$addToSet",
            UpdateOp::Pull(_) => "$pull",
        }
    }

    /// Returns `true` for element operations without elements.
    pub fn is_noop(&self) -> bool {
        match self {
            UpdateOp::Push(items) | UpdateOp::AddToSet(items) | UpdateOp::Pull(items) => {
                items.is_empty()
            }
            UpdateOp::Replace(_) | UpdateOp::Unset => false,
        }
    }

    /// Renders as `{"<operator>": <operand>}`.
    pub fn to_json(&self) -> serde_json::Value {
        let operand = match self {
            UpdateOp::Replace(value) => value.to_json(),
            UpdateOp::Unset => serde_json::Value::Bool(true),
            UpdateOp::Push(items) | UpdateOp::AddToSet(items) | UpdateOp::Pull(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        };
        let mut object = serde_json::Map::new();
        object.insert(self.operator().to_string(), operand);
        serde_json::Value::Object(object)
    }
}

/// Storage key to update operation.
pub type UpdateSet = BTreeMap<String, UpdateOp>;

/// Renders an update set as a JSON object keyed by storage key.
pub fn update_set_to_json(mods: &UpdateSet) -> serde_json::Value {
    serde_json::Value::Object(
        mods.iter()
            .map(|(key, op)| (key.clone(), op.to_json()))
            .collect(),
    )
}

/// Builds the partial-update payload for every pending change of `record`.
///
/// Resizable attributes delegate to their incremental diff strategy; other
/// attributes become a `Replace` of the new value. Keys marked for unset
/// always end up as `Unset` and never carry another operation. Reverted
/// attributes never appear, since only pending changes are visited.
pub fn build_update_ops(record: &Record) -> UpdateSet {
    let mut mods = UpdateSet::new();
    let unsets = record.atomic_unsets();

    for (name, change) in record.changes() {
        let field = record.schema().lookup(&name);
        let key = field
            .map(|f| f.storage_key().to_string())
            .unwrap_or_else(|| name.clone());

        match field.and_then(|f| f.incremental_diff()) {
            Some(strategy) => {
                strategy.add_atomic_changes(record, &name, &key, &mut mods, &change.new, &change.old)
            }
            None => {
                if !unsets.contains(&key) {
                    mods.insert(key, UpdateOp::Replace(change.new));
                }
            }
        }
    }

    for key in unsets {
        mods.insert(key.clone(), UpdateOp::Unset);
    }

    mods.retain(|_, op| !op.is_noop());
    tracing::trace!(
        "Built {} update operations for kind '{}'",
        mods.len(),
        record.kind()
    );
    mods
}
