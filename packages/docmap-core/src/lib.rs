//! Change tracking engine for document records.
//!
//! Provides the field descriptor registry, per-record change sets,
//! the diff-to-update translator, accessor dispatch, and the storage
//! seams used to persist partial updates.

pub mod config;
pub mod dirty;
pub mod error;
pub mod record;
pub mod schema;
pub mod store;
pub mod value;

pub use config::{ModelConfig, ScanConsistency};
pub use dirty::{build_update_ops, Change, ChangeSet, UpdateOp, UpdateSet};
pub use error::{ModelError, Result};
pub use record::{AccessorArgs, AccessorOutput, Record};
pub use schema::{FieldDescriptor, FieldType, Schema};
pub use store::{DocumentStore, MemoryStore, ReadOptions, Repository, StoredDocument};
pub use value::{Attributes, Expect, Value};
