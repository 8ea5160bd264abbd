//! Shared schemas for integration tests.

use std::sync::Arc;

use docmap_core::schema::{FieldDescriptor, FieldType, Schema, SchemaDefinition};
use docmap_core::{MemoryStore, ModelConfig, Repository};

pub const ARTICLE_SCHEMA: &str = r#"{
    "kind": "article",
    "fields": [
        {"name": "title", "type": "string", "storage_key": "ttl"},
        {"name": "tags", "type": "array"},
        {"name": "readers", "type": "references"},
        {"name": "status", "type": "string", "default": "draft"},
        {"name": "author", "type": "document", "embeds": {
            "kind": "author",
            "fields": [{"name": "name", "type": "string"}]
        }}
    ]
}"#;

pub fn article_schema() -> Arc<Schema> {
    SchemaDefinition::from_json_str(ARTICLE_SCHEMA)
        .and_then(|definition| definition.build())
        .unwrap()
}

pub fn author_schema() -> Arc<Schema> {
    Schema::builder("author")
        .field(FieldDescriptor::new("name", FieldType::String))
        .build()
        .unwrap()
}

pub fn repository() -> Repository<MemoryStore> {
    Repository::new(MemoryStore::new(), ModelConfig::default())
}
