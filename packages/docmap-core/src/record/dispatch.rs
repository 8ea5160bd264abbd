//! Name-based accessor dispatch.

use crate::dirty::Change;
use crate::error::{ModelError, Result};
use crate::schema::AccessorKind;
use crate::value::{Expect, Value};

use super::Record;

/// Arguments for a dispatched accessor call.
///
/// `value` is required by `M=` and ignored elsewhere; `from`/`to` only
/// constrain the query accessors that take bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessorArgs {
    pub value: Option<Value>,
    pub from: Expect,
    pub to: Expect,
}

impl AccessorArgs {
    /// Arguments carrying a value for a writer.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Arguments carrying `from`/`to` bounds.
    pub fn bounds(from: Expect, to: Expect) -> Self {
        Self {
            value: None,
            from,
            to,
        }
    }
}

/// Result of a dispatched accessor call.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorOutput {
    Value(Option<Value>),
    Change(Option<Change>),
    Flag(bool),
    Unit,
}

impl AccessorOutput {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AccessorOutput::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AccessorOutput::Value(value) => value
                .as_ref()
                .map(Value::to_json)
                .unwrap_or(serde_json::Value::Null),
            AccessorOutput::Change(change) => change
                .as_ref()
                .map(Change::to_json)
                .unwrap_or(serde_json::Value::Null),
            AccessorOutput::Flag(flag) => serde_json::Value::Bool(*flag),
            AccessorOutput::Unit => serde_json::Value::Null,
        }
    }
}

impl Record {
    /// Invokes a generated accessor by method name.
    ///
    /// # Arguments
    /// * `method` - Generated name, e.g. `name_was` or `saved_change_to_name?`
    /// * `args` - Writer value and query bounds
    ///
    /// # Returns
    /// `Err(ModelError::UnknownAccessor)` if the schema generated no such
    /// method; `Err(ModelError::InvalidArgument)` for a writer without a value.
    pub fn call(&mut self, method: &str, args: AccessorArgs) -> Result<AccessorOutput> {
        let accessor = self
            .schema()
            .accessors()
            .resolve(method)
            .cloned()
            .ok_or_else(|| ModelError::UnknownAccessor {
                kind: self.kind().to_string(),
                method: method.to_string(),
            })?;
        let name = accessor.attribute.as_str();

        tracing::trace!("Dispatching '{}' to attribute '{}'", method, name);

        let output = match accessor.kind {
            AccessorKind::Read => AccessorOutput::Value(self.read_attribute(name).cloned()),
            AccessorKind::Write => {
                let value = args.value.ok_or_else(|| {
                    ModelError::InvalidArgument(format!("'{}' requires a value", method))
                })?;
                self.write_attribute(name, value);
                AccessorOutput::Unit
            }
            AccessorKind::Change => AccessorOutput::Change(self.attribute_change(name)),
            AccessorKind::Changed => {
                AccessorOutput::Flag(self.attribute_changed(name, &args.from, &args.to))
            }
            AccessorKind::WillSaveChange => AccessorOutput::Flag(
                self.will_save_change_to_attribute(name, &args.from, &args.to),
            ),
            AccessorKind::ChangedFromDefault => {
                AccessorOutput::Flag(self.attribute_changed_from_default(name))
            }
            AccessorKind::Was => AccessorOutput::Value(self.attribute_was(name).cloned()),
            AccessorKind::PreviouslyWas => {
                AccessorOutput::Value(self.attribute_previously_was(name).cloned())
            }
            AccessorKind::BeforeLastSave => {
                AccessorOutput::Value(self.attribute_before_last_save(name).cloned())
            }
            AccessorKind::SavedChange => {
                AccessorOutput::Change(self.saved_change_to_attribute(name).cloned())
            }
            AccessorKind::SavedChangeQuery => AccessorOutput::Flag(
                self.saved_change_to_attribute_matches(name, &args.from, &args.to),
            ),
            AccessorKind::WillChange => {
                self.attribute_will_change(name);
                AccessorOutput::Unit
            }
            AccessorKind::Reset => AccessorOutput::Value(self.reset_attribute(name)),
            AccessorKind::ResetToDefault => {
                self.reset_attribute_to_default(name);
                AccessorOutput::Unit
            }
            AccessorKind::PreviouslyChanged => {
                AccessorOutput::Flag(self.attribute_previously_changed(name))
            }
            AccessorKind::PreviousChange => {
                AccessorOutput::Change(self.attribute_previous_change(name).cloned())
            }
        };
        Ok(output)
    }
}
