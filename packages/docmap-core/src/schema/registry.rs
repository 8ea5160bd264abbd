use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::record::Record;
use crate::value::{json_type_name, Value};

use super::accessors::AccessorTable;
use super::field::{DefaultFn, FieldDescriptor, FieldType};

/// Field descriptor registry for one record kind.
///
/// Built once through [`SchemaBuilder`] and shared read-only (`Arc`) by
/// every record of the kind; there is no mutation after `build`.
#[derive(Debug)]
pub struct Schema {
    kind: String,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
    accessors: AccessorTable,
}

impl Schema {
    /// Starts a schema definition for records of `kind`.
    pub fn builder(kind: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(kind.into())
    }

    /// Kind tag stored with every document of this schema.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Retrieves a descriptor by attribute name.
    ///
    /// # Returns
    /// `None` for unknown attributes: no special diff strategy, no default.
    pub fn lookup(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Checks if an attribute is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDescriptor::name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Generated accessor table.
    pub fn accessors(&self) -> &AccessorTable {
        &self.accessors
    }

    /// Attribute persisted under storage key `key`; undeclared keys map to
    /// themselves.
    pub fn attribute_for_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|f| f.storage_key() == key)
            .map(FieldDescriptor::name)
            .unwrap_or(key)
    }

    /// Finds a descriptor by attribute name or accessor alias.
    pub fn resolve_accessor(&self, meth: &str) -> Option<&FieldDescriptor> {
        self.lookup(meth)
            .or_else(|| self.fields.iter().find(|f| f.accessor() == meth))
    }

    /// Converts a stored JSON value into an attribute value for `name`.
    ///
    /// `Document` fields with an embedded schema become child records with
    /// empty change sets; everything else converts structurally.
    pub fn hydrate_value(&self, name: &str, json: &serde_json::Value) -> Result<Value> {
        let Some(field) = self.lookup(name) else {
            return Ok(Value::from_json(json));
        };

        match (field.ty(), field.embedded_schema()) {
            (FieldType::Document, Some(schema)) => match json {
                serde_json::Value::Null => Ok(Value::Null),
                serde_json::Value::Object(_) => {
                    let child = Record::from_json(schema.clone(), None, json)?;
                    Ok(Value::Document(Box::new(child)))
                }
                other => Err(ModelError::TypeMismatch {
                    expected: format!("document '{}'", schema.kind()),
                    got: json_type_name(other).to_string(),
                }),
            },
            _ => Ok(Value::from_json(json)),
        }
    }
}

/// Builder collecting field declarations for a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    kind: String,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    pub fn new(kind: String) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Adds a descriptor. Returns self for method chaining.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares an attribute from its four defining properties.
    ///
    /// # Arguments
    /// * `name` - Attribute name
    /// * `ty` - Declared type
    /// * `resizable` - Whether changes become incremental operations; types
    ///   without a strategy of their own use membership diffs
    /// * `default` - Default-value evaluator
    #[must_use]
    pub fn register(
        self,
        name: impl Into<String>,
        ty: FieldType,
        resizable: bool,
        default: Option<Arc<DefaultFn>>,
    ) -> Self {
        let builder = FieldDescriptor::builder(name, ty).default_fn(default);
        let builder = match (resizable, ty.default_diff()) {
            (false, _) => builder.fixed_size(),
            (true, Some(strategy)) => builder.resizable(strategy),
            (true, None) => builder.resizable(Arc::new(crate::dirty::MembershipDiff)),
        };
        self.field(builder.build())
    }

    /// Returns the number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Freezes the declarations into a shared schema.
    ///
    /// # Returns
    /// `Err(ModelError::DuplicateField)` if an attribute name is declared
    /// twice, two fields share a storage key, or two fields generate the
    /// same accessor name.
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut storage_keys = HashSet::with_capacity(self.fields.len());
        let mut accessors = AccessorTable::new();

        for (i, field) in self.fields.iter().enumerate() {
            if index.insert(field.name().to_string(), i).is_some() {
                return Err(ModelError::DuplicateField {
                    kind: self.kind.clone(),
                    field: field.name().to_string(),
                });
            }
            if !storage_keys.insert(field.storage_key()) {
                return Err(ModelError::DuplicateField {
                    kind: self.kind.clone(),
                    field: field.storage_key().to_string(),
                });
            }
            accessors
                .insert_field(field.name(), field.accessor())
                .map_err(|method| ModelError::DuplicateField {
                    kind: self.kind.clone(),
                    field: method,
                })?;
        }

        tracing::debug!(
            "Built schema '{}' with {} fields and {} accessors",
            self.kind,
            self.fields.len(),
            accessors.len()
        );

        Ok(Arc::new(Schema {
            kind: self.kind,
            fields: self.fields,
            index,
            accessors,
        }))
    }
}
