//! Schema inspection and update preview commands.

pub mod cli;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};

use docmap_core::record::{AccessorArgs, AccessorOutput};
use docmap_core::schema::{Schema, SchemaDefinition};
use docmap_core::{dirty::update_set_to_json, ModelConfig, Record, Value};

/// Loads a model configuration, falling back to defaults without a file.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ModelConfig> {
    let Some(path) = path else {
        return Ok(ModelConfig::default());
    };
    let input = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    Ok(ModelConfig::from_json_str(&input)?)
}

pub fn load_schema(path: &Path) -> anyhow::Result<Arc<Schema>> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let definition = SchemaDefinition::from_json_str(&input)?;
    Ok(definition.build()?)
}

fn load_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    Ok(serde_json::from_str(&input)?)
}

fn document_id(json: &serde_json::Value) -> Option<String> {
    json.get("id").and_then(|id| id.as_str()).map(str::to_string)
}

/// Attribute names present in a stored document.
fn stored_attribute_names(schema: &Schema, json: &serde_json::Value) -> BTreeSet<String> {
    json.as_object()
        .map(|object| {
            object
                .keys()
                .filter(|key| key.as_str() != "id")
                .map(|key| schema.attribute_for_key(key).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Builds the update that turns `before` into `after`.
///
/// `before` is hydrated as a persisted record, then every attribute stored
/// in `after` goes through the tracked writer. Attributes stored in
/// `before` but not in `after` are unset.
pub fn diff_documents(
    schema: Arc<Schema>,
    config: &ModelConfig,
    before: &serde_json::Value,
    after: &serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let mut record = Record::from_json(Arc::clone(&schema), document_id(before), before)?;
    let target = Record::from_json(Arc::clone(&schema), None, after)?;

    let before_names = stored_attribute_names(&schema, before);
    let after_names = stored_attribute_names(&schema, after);

    for name in &after_names {
        let value = target.read_attribute(name).cloned().unwrap_or_default();
        record.write_attribute(name, value);
    }
    for name in before_names.difference(&after_names) {
        record.unset(name);
    }

    let changes: serde_json::Map<String, serde_json::Value> = record
        .changes()
        .into_iter()
        .map(|(name, change)| (name, change.to_json()))
        .collect();
    tracing::debug!("Diff produced {} changes", changes.len());

    Ok(serde_json::json!({
        "changes": changes,
        "update": update_set_to_json(&record.build_update_ops()),
        "document": record.to_json(config.include_id_in_json),
    }))
}

/// Lists generated accessor names, optionally for one attribute only.
pub fn list_accessors(schema: &Schema, attribute: Option<&str>) -> anyhow::Result<Vec<String>> {
    if let Some(attribute) = attribute {
        if !schema.contains(attribute) {
            bail!("Unknown attribute '{}' for kind '{}'", attribute, schema.kind());
        }
    }

    let table = schema.accessors();
    Ok(table
        .method_names()
        .into_iter()
        .filter(|method| match attribute {
            Some(attribute) => table
                .resolve(method)
                .map(|accessor| accessor.attribute == attribute)
                .unwrap_or(false),
            None => true,
        })
        .map(str::to_string)
        .collect())
}

/// Invokes an accessor on a hydrated document.
pub fn call_accessor(
    schema: Arc<Schema>,
    document: &serde_json::Value,
    method: &str,
    value: Option<&str>,
) -> anyhow::Result<serde_json::Value> {
    let mut record = Record::from_json(schema, document_id(document), document)?;
    let args = match value {
        Some(raw) => {
            let json: serde_json::Value = serde_json::from_str(raw)
                .with_context(|| format!("Invalid JSON value '{}'", raw))?;
            AccessorArgs::value(Value::from_json(&json))
        }
        None => AccessorArgs::default(),
    };

    let output = record.call(method, args)?;
    if matches!(output, AccessorOutput::Unit) {
        return Ok(serde_json::json!({
            "changes": record
                .changes()
                .into_iter()
                .map(|(name, change)| (name, change.to_json()))
                .collect::<serde_json::Map<_, _>>(),
        }));
    }
    Ok(output.to_json())
}

/// Runs a parsed command and returns its JSON output.
pub fn run(cli: &cli::Cli) -> anyhow::Result<serde_json::Value> {
    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        cli::Commands::Diff {
            schema,
            before,
            after,
        } => diff_documents(
            load_schema(schema)?,
            &config,
            &load_json(before)?,
            &load_json(after)?,
        ),
        cli::Commands::Accessors { schema, attribute } => {
            let names = list_accessors(&*load_schema(schema)?, attribute.as_deref())?;
            Ok(serde_json::json!(names))
        }
        cli::Commands::Call {
            schema,
            document,
            method,
            value,
        } => call_accessor(
            load_schema(schema)?,
            &load_json(document)?,
            method,
            value.as_deref(),
        ),
    }
}
