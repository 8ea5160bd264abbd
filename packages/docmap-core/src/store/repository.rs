use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::ModelConfig;
use crate::dirty::{UpdateOp, UpdateSet};
use crate::error::{ModelError, Result};
use crate::record::Record;
use crate::schema::Schema;
use crate::value::Value;

use super::{DocumentStore, StoredDocument};

/// Persists records through a [`DocumentStore`] and drives their commit
/// cycle.
///
/// Every save sends only the partial update built from pending changes and
/// commits the change sets only after the store accepted the write.
#[derive(Debug)]
pub struct Repository<S: DocumentStore> {
    store: S,
    config: Arc<ModelConfig>,
    next_id: AtomicU64,
}

impl<S: DocumentStore> Repository<S> {
    pub fn new(store: S, config: ModelConfig) -> Self {
        Self::with_shared_config(store, Arc::new(config))
    }

    pub fn with_shared_config(store: S, config: Arc<ModelConfig>) -> Self {
        Self {
            store,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Arc<ModelConfig> {
        &self.config
    }

    fn generate_id(&self, kind: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}::{}", kind, n)
    }

    /// Builds a record from `attributes` and saves it.
    pub fn create<I, K, V>(&self, schema: Arc<Schema>, attributes: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Record::with_attributes(schema, attributes);
        self.save(&mut record)?;
        Ok(record)
    }

    /// Persists pending changes.
    ///
    /// New records are inserted whole. Persisted records get a partial
    /// update covering their own changes and those of changed embedded
    /// children. On success the record and its children commit; on failure
    /// all pending state is left as it was.
    ///
    /// # Returns
    /// `true` if the store was written, `false` if nothing was pending.
    pub fn save(&self, record: &mut Record) -> Result<bool> {
        let promoted = if record.is_new_record() {
            let id = match record.id() {
                Some(id) => id.to_string(),
                None => self.generate_id(record.kind()),
            };
            self.store.insert(record.kind(), &id, record.to_json(false))?;
            record.mark_persisted(id);
            record.commit_tree()
        } else {
            let id = record
                .id()
                .ok_or_else(|| ModelError::MissingId {
                    kind: record.kind().to_string(),
                })?
                .to_string();

            let mods = Self::collect_updates(record);
            if mods.is_empty() {
                tracing::debug!("Nothing to save for '{}'", id);
                return Ok(false);
            }
            self.store.write(&id, &mods)?;

            // Children whose stored form went out whole commit with their
            // descendants; the rest only commit their own state.
            let written: Vec<String> = record
                .children()
                .filter(|(name, _)| mods.contains_key(&record.storage_key(name)))
                .map(|(name, _)| name.to_string())
                .collect();
            let mut promoted = record.changes_applied();
            for (name, child) in record.children_mut() {
                promoted += if written.iter().any(|w| w == name) {
                    child.commit_tree()
                } else {
                    child.changes_applied()
                };
            }
            promoted
        };

        tracing::debug!(
            "Saved {} '{}' ({} changes committed)",
            record.kind(),
            record.id().unwrap_or_default(),
            promoted
        );
        Ok(true)
    }

    /// Own update operations plus whole-value replacements for changed
    /// children not already covered.
    fn collect_updates(record: &Record) -> UpdateSet {
        let mut mods = record.build_update_ops();
        for (name, child) in record.children() {
            if !child.has_attribute_changes() {
                continue;
            }
            mods.entry(record.storage_key(name))
                .or_insert_with(|| UpdateOp::Replace(Value::Document(Box::new(child.clone()))));
        }
        mods
    }

    fn read(&self, schema: &Schema, id: &str) -> Result<StoredDocument> {
        let document = self.store.hydrate(id, &self.config.read_options())?;
        if document.kind != schema.kind() {
            return Err(ModelError::TypeMismatch {
                expected: schema.kind().to_string(),
                got: document.kind,
            });
        }
        Ok(document)
    }

    /// Loads a record with an empty change set.
    pub fn find(&self, schema: Arc<Schema>, id: &str) -> Result<Record> {
        let document = self.read(&schema, id)?;
        Record::from_json(schema, Some(id.to_string()), &document.body)
    }

    /// Like [`Repository::find`], with a missing document mapped to `None`.
    pub fn find_by_id(&self, schema: Arc<Schema>, id: &str) -> Result<Option<Record>> {
        match self.find(schema, id) {
            Ok(record) => Ok(Some(record)),
            Err(ModelError::DocumentNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replaces the record's attributes with the stored ones and clears all
    /// change information.
    pub fn reload(&self, record: &mut Record) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| ModelError::MissingId {
                kind: record.kind().to_string(),
            })?
            .to_string();
        let schema = Arc::clone(record.schema());
        let document = self.read(&schema, &id)?;

        let attributes = Record::attributes_from_json(&schema, &document.body)?;
        record.replace_attributes(attributes);
        tracing::debug!("Reloaded '{}'", id);
        Ok(())
    }

    /// Deletes the stored document and clears the record's change state.
    pub fn destroy(&self, record: &mut Record) -> Result<()> {
        let id = record.id().ok_or_else(|| ModelError::MissingId {
            kind: record.kind().to_string(),
        })?;
        self.store.remove(id)?;
        record.reset_object();
        Ok(())
    }

    /// JSON form of `record`, with the id included per configuration.
    pub fn to_json(&self, record: &Record) -> serde_json::Value {
        record.to_json(self.config.include_id_in_json)
    }
}
