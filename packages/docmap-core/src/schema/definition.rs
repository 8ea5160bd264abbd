//! Schema file format.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dirty::MembershipDiff;
use crate::error::Result;
use crate::value::Value;

use super::field::{FieldDescriptor, FieldType};
use super::registry::Schema;

/// Serialized schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Kind tag of the records
    pub kind: String,
    /// Field definitions in declaration order
    pub fields: Vec<FieldDefinition>,
}

/// Serialized field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Attribute name
    pub name: String,
    /// Declared type
    #[serde(default)]
    pub r#type: FieldType,
    /// Persisted key, when different from the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    /// Accessor base name, when different from the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Constant default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Overrides the type's resizable behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resizable: Option<bool>,
    /// Embedded schema for `document` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Box<SchemaDefinition>>,
}

impl SchemaDefinition {
    /// Parses a definition from JSON.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Builds the registry described by this definition.
    pub fn build(&self) -> Result<Arc<Schema>> {
        let mut builder = Schema::builder(self.kind.clone());
        for field in &self.fields {
            builder = builder.field(field.descriptor()?);
        }
        builder.build()
    }
}

impl FieldDefinition {
    fn descriptor(&self) -> Result<FieldDescriptor> {
        let mut builder = FieldDescriptor::builder(self.name.clone(), self.r#type);
        if let Some(key) = &self.storage_key {
            builder = builder.storage_key(key.clone());
        }
        if let Some(alias) = &self.alias {
            builder = builder.alias(alias.clone());
        }
        if let Some(default) = &self.default {
            builder = builder.default_value(Value::from_json(default));
        }
        builder = match self.resizable {
            Some(false) => builder.fixed_size(),
            Some(true) if !self.r#type.is_collection() => {
                builder.resizable(Arc::new(MembershipDiff))
            }
            _ => builder,
        };
        if let Some(embedded) = &self.embeds {
            builder = builder.embeds(embedded.build()?);
        }
        Ok(builder.build())
    }
}
