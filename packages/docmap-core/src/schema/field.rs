//! Field descriptors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dirty::{AppendDiff, IncrementalDiff, MembershipDiff};
use crate::record::Record;
use crate::value::Value;

use super::registry::Schema;

/// Type alias for default-value evaluator signature.
///
/// The evaluator receives the owning record and may read its other
/// attributes.
pub type DefaultFn = dyn Fn(&Record) -> Value + Send + Sync;

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Untyped attribute
    #[default]
    Any,
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    /// Ordered collection
    Array,
    /// Unordered collection of unique members
    Set,
    /// Many-valued relationship stored as a list of ids
    References,
    /// Free-form nested mapping
    Map,
    /// Embedded child record
    Document,
}

impl FieldType {
    /// Incremental diff strategy attached to this type when the field does
    /// not choose one explicitly.
    pub fn default_diff(&self) -> Option<Arc<dyn IncrementalDiff>> {
        match self {
            FieldType::Array => Some(Arc::new(AppendDiff)),
            FieldType::Set | FieldType::References => Some(Arc::new(MembershipDiff)),
            _ => None,
        }
    }

    /// Returns `true` for collection types.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            FieldType::Array | FieldType::Set | FieldType::References
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Any => "any",
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "date_time",
            FieldType::Array => "array",
            FieldType::Set => "set",
            FieldType::References => "references",
            FieldType::Map => "map",
            FieldType::Document => "document",
        };
        write!(f, "{}", name)
    }
}

/// Metadata for one declared attribute.
///
/// Descriptors are immutable once built and shared by every record of the
/// owning [`Schema`].
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    storage_key: String,
    accessor: String,
    default: Option<Arc<DefaultFn>>,
    diff: Option<Arc<dyn IncrementalDiff>>,
    embedded: Option<Arc<Schema>>,
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("storage_key", &self.storage_key)
            .field("accessor", &self.accessor)
            .field("has_default", &self.default.is_some())
            .field("diff", &self.diff)
            .field("embedded", &self.embedded.as_ref().map(|s| s.kind()))
            .finish()
    }
}

impl FieldDescriptor {
    /// Creates a descriptor with no default, keyed and accessed by `name`.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self::builder(name, ty).build()
    }

    /// Starts a builder for a descriptor.
    pub fn builder(name: impl Into<String>, ty: FieldType) -> FieldBuilder {
        FieldBuilder::new(name.into(), ty)
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn ty(&self) -> FieldType {
        self.ty
    }

    /// Key under which the attribute is persisted.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Base name of the generated accessor methods.
    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    /// Returns `true` if changes are translated into incremental operations.
    pub fn is_resizable(&self) -> bool {
        self.diff.is_some()
    }

    pub fn incremental_diff(&self) -> Option<&dyn IncrementalDiff> {
        self.diff.as_deref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Evaluates the default for `record`, or `Null` without an evaluator.
    pub fn eval_default(&self, record: &Record) -> Value {
        match &self.default {
            Some(default) => default(record),
            None => Value::Null,
        }
    }

    /// Schema of the embedded record for `Document` fields.
    pub fn embedded_schema(&self) -> Option<&Arc<Schema>> {
        self.embedded.as_ref()
    }
}

/// Builder for [`FieldDescriptor`].
pub struct FieldBuilder {
    name: String,
    ty: FieldType,
    storage_key: Option<String>,
    accessor: Option<String>,
    default: Option<Arc<DefaultFn>>,
    diff: Option<Arc<dyn IncrementalDiff>>,
    embedded: Option<Arc<Schema>>,
}

impl FieldBuilder {
    /// Creates a builder; collection types start with their default
    /// incremental diff strategy.
    pub fn new(name: String, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            storage_key: None,
            accessor: None,
            default: None,
            diff: ty.default_diff(),
            embedded: None,
        }
    }

    /// Persists the attribute under a different key.
    #[must_use]
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    /// Generates accessors under an alias instead of the attribute name.
    #[must_use]
    pub fn alias(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = Some(accessor.into());
        self
    }

    /// Uses a constant default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default = Some(Arc::new(move |_: &Record| value.clone()));
        self
    }

    /// Uses a default computed from the owning record.
    #[must_use]
    pub fn default_with<F>(mut self, default: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(default));
        self
    }

    /// Uses a shared default evaluator.
    #[must_use]
    pub fn default_fn(mut self, default: Option<Arc<DefaultFn>>) -> Self {
        self.default = default;
        self
    }

    /// Attaches an incremental diff strategy, making the field resizable.
    #[must_use]
    pub fn resizable(mut self, strategy: Arc<dyn IncrementalDiff>) -> Self {
        self.diff = Some(strategy);
        self
    }

    /// Drops any incremental diff strategy; changes become full replacements.
    #[must_use]
    pub fn fixed_size(mut self) -> Self {
        self.diff = None;
        self
    }

    /// Declares the schema of the embedded record for `Document` fields.
    #[must_use]
    pub fn embeds(mut self, schema: Arc<Schema>) -> Self {
        self.embedded = Some(schema);
        self
    }

    pub fn build(self) -> FieldDescriptor {
        let storage_key = self.storage_key.unwrap_or_else(|| self.name.clone());
        let accessor = self.accessor.unwrap_or_else(|| self.name.clone());
        FieldDescriptor {
            name: self.name,
            ty: self.ty,
            storage_key,
            accessor,
            default: self.default,
            diff: self.diff,
            embedded: self.embedded,
        }
    }
}
