//! Storage seams for persisting records.
//!
//! The change-tracking core never talks to a database directly. A
//! [`DocumentStore`] receives whole documents on insert and partial update
//! sets afterwards; [`Repository`] drives the save and commit cycle on top.

mod memory;
mod repository;

pub use memory::MemoryStore;
pub use repository::Repository;

use serde::{Deserialize, Serialize};

use crate::config::ScanConsistency;
use crate::dirty::UpdateSet;
use crate::error::Result;

/// Options applied to a single read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadOptions {
    pub scan_consistency: ScanConsistency,
}

/// Stored document as returned by a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Kind tag written on insert
    pub kind: String,
    /// Attribute object, keyed by storage key
    pub body: serde_json::Value,
}

/// Document storage client.
///
/// Implementations must apply an update set atomically: either every
/// operation lands or none does.
pub trait DocumentStore: Send + Sync {
    /// Stores a new document under `id`.
    fn insert(&self, kind: &str, id: &str, body: serde_json::Value) -> Result<()>;

    /// Applies a partial update to an existing document.
    fn write(&self, id: &str, mods: &UpdateSet) -> Result<()>;

    /// Reads a document.
    ///
    /// # Returns
    /// `Err(ModelError::DocumentNotFound)` when nothing is stored under `id`.
    fn hydrate(&self, id: &str, options: &ReadOptions) -> Result<StoredDocument>;

    /// Deletes a document.
    fn remove(&self, id: &str) -> Result<()>;
}
