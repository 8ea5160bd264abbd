use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::dirty::{UpdateOp, UpdateSet};
use crate::error::{ModelError, Result};
use crate::value::Value;

use super::{DocumentStore, ReadOptions, StoredDocument};

/// In-process document store.
///
/// Applies update sets the way a document database would, and can be told
/// to fail the next write for exercising error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
    fail_next_write: AtomicBool,
    writes: AtomicUsize,
    last_read: RwLock<Option<ReadOptions>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `write` call fail without touching the document.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Number of successful partial writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent read.
    pub fn last_read_options(&self) -> Result<Option<ReadOptions>> {
        let last = self.last_read.read().map_err(|_| ModelError::LockPoisoned)?;
        Ok(*last)
    }

    /// Raw body stored under `id`.
    pub fn body(&self, id: &str) -> Result<Option<serde_json::Value>> {
        let documents = self.documents.read().map_err(|_| ModelError::LockPoisoned)?;
        Ok(documents.get(id).map(|doc| doc.body.clone()))
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies one operation to a document body.
fn apply_op(
    body: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
    op: &UpdateOp,
) -> Result<()> {
    let items_json = |items: &[Value]| -> Vec<serde_json::Value> {
        items.iter().map(Value::to_json).collect()
    };

    match op {
        UpdateOp::Replace(value) => {
            body.insert(key.to_string(), value.to_json());
        }
        UpdateOp::Unset => {
            body.remove(key);
        }
        UpdateOp::Push(items) | UpdateOp::AddToSet(items) | UpdateOp::Pull(items) => {
            let slot = body
                .entry(key.to_string())
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            if slot.is_null() {
                *slot = serde_json::Value::Array(Vec::new());
            }
            let serde_json::Value::Array(array) = slot else {
                return Err(ModelError::Store(format!(
                    "{} on non-array key '{}'",
                    op.operator(),
                    key
                )));
            };

            let members = items_json(items);
            match op {
                UpdateOp::Push(_) => array.extend(members),
                UpdateOp::AddToSet(_) => {
                    for member in members {
                        if !array.contains(&member) {
                            array.push(member);
                        }
                    }
                }
                _ => array.retain(|existing| !members.contains(existing)),
            }
        }
    }
    Ok(())
}

impl DocumentStore for MemoryStore {
    fn insert(&self, kind: &str, id: &str, body: serde_json::Value) -> Result<()> {
        let mut documents = self.documents.write().map_err(|_| ModelError::LockPoisoned)?;
        if documents.contains_key(id) {
            return Err(ModelError::Store(format!("Document '{}' already exists", id)));
        }
        documents.insert(
            id.to_string(),
            StoredDocument {
                kind: kind.to_string(),
                body,
            },
        );
        tracing::debug!("Inserted document '{}' of kind '{}'", id, kind);
        Ok(())
    }

    fn write(&self, id: &str, mods: &UpdateSet) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            tracing::warn!("Rejecting write to '{}'", id);
            return Err(ModelError::Store(format!("write to '{}' rejected", id)));
        }

        let mut documents = self.documents.write().map_err(|_| ModelError::LockPoisoned)?;
        let document = documents
            .get_mut(id)
            .ok_or_else(|| ModelError::DocumentNotFound { id: id.to_string() })?;

        // Work on a copy so a failing operation leaves the document intact
        let mut body = match &document.body {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        for (key, op) in mods {
            apply_op(&mut body, key, op)?;
        }
        document.body = serde_json::Value::Object(body);

        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Applied {} operations to '{}'", mods.len(), id);
        Ok(())
    }

    fn hydrate(&self, id: &str, options: &ReadOptions) -> Result<StoredDocument> {
        {
            let mut last = self.last_read.write().map_err(|_| ModelError::LockPoisoned)?;
            *last = Some(*options);
        }
        tracing::trace!(
            "Reading '{}' with {:?} consistency",
            id,
            options.scan_consistency
        );

        let documents = self.documents.read().map_err(|_| ModelError::LockPoisoned)?;
        documents
            .get(id)
            .cloned()
            .ok_or_else(|| ModelError::DocumentNotFound { id: id.to_string() })
    }

    fn remove(&self, id: &str) -> Result<()> {
        let mut documents = self.documents.write().map_err(|_| ModelError::LockPoisoned)?;
        documents
            .remove(id)
            .ok_or_else(|| ModelError::DocumentNotFound { id: id.to_string() })?;
        tracing::debug!("Removed document '{}'", id);
        Ok(())
    }
}
