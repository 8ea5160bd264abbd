//! Typed accessor handles.
//!
//! A handle binds one attribute of one record and exposes the generated
//! accessor family as methods. Handles are resolved by attribute name or
//! accessor alias through the record's schema.

use crate::dirty::Change;
use crate::value::{Expect, Value};

use super::Record;

/// Read-only accessor handle for one attribute.
#[derive(Debug, Clone, Copy)]
pub struct AttributeRef<'a> {
    record: &'a Record,
    name: &'a str,
}

impl<'a> AttributeRef<'a> {
    /// Attribute name the handle targets (never the alias).
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Live value.
    pub fn value(&self) -> Option<&'a Value> {
        self.record.read_attribute(self.name)
    }

    pub fn change(&self) -> Option<Change> {
        self.record.attribute_change(self.name)
    }

    pub fn is_changed(&self, from: &Expect, to: &Expect) -> bool {
        self.record.attribute_changed(self.name, from, to)
    }

    pub fn will_save_change(&self, from: &Expect, to: &Expect) -> bool {
        self.record.will_save_change_to_attribute(self.name, from, to)
    }

    pub fn changed_from_default(&self) -> bool {
        self.record.attribute_changed_from_default(self.name)
    }

    pub fn was(&self) -> Option<&'a Value> {
        self.record.attribute_was(self.name)
    }

    pub fn previously_was(&self) -> Option<&'a Value> {
        self.record.attribute_previously_was(self.name)
    }

    pub fn before_last_save(&self) -> Option<&'a Value> {
        self.record.attribute_before_last_save(self.name)
    }

    pub fn saved_change(&self) -> Option<&'a Change> {
        self.record.saved_change_to_attribute(self.name)
    }

    pub fn saved_change_matches(&self, from: &Expect, to: &Expect) -> bool {
        self.record
            .saved_change_to_attribute_matches(self.name, from, to)
    }

    pub fn previously_changed(&self) -> bool {
        self.record.attribute_previously_changed(self.name)
    }

    pub fn previous_change(&self) -> Option<&'a Change> {
        self.record.attribute_previous_change(self.name)
    }
}

/// Mutable accessor handle for one attribute.
#[derive(Debug)]
pub struct AttributeMut<'a> {
    record: &'a mut Record,
    name: String,
}

impl<'a> AttributeMut<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only view of the same attribute.
    pub fn view(&self) -> AttributeRef<'_> {
        AttributeRef {
            record: &*self.record,
            name: &self.name,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        self.record.read_attribute(&self.name)
    }

    /// Writes through the tracked writer.
    pub fn set(&mut self, value: impl Into<Value>) {
        self.record.write_attribute(&self.name, value);
    }

    /// Marks the attribute pending ahead of an in-place mutation.
    pub fn will_change(&mut self) -> bool {
        self.record.attribute_will_change(&self.name)
    }

    pub fn reset(&mut self) -> Option<Value> {
        self.record.reset_attribute(&self.name)
    }

    pub fn reset_to_default(&mut self) {
        self.record.reset_attribute_to_default(&self.name);
    }
}

impl Record {
    /// Resolves a read-only handle by attribute name or accessor alias.
    pub fn attribute(&self, meth: &str) -> Option<AttributeRef<'_>> {
        let field = self.schema().resolve_accessor(meth)?;
        Some(AttributeRef {
            record: self,
            name: field.name(),
        })
    }

    /// Resolves a mutable handle by attribute name or accessor alias.
    pub fn attribute_mut(&mut self, meth: &str) -> Option<AttributeMut<'_>> {
        let name = self.schema().resolve_accessor(meth)?.name().to_string();
        Some(AttributeMut { record: self, name })
    }
}
