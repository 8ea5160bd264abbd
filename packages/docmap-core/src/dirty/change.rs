use crate::value::{Expect, Value};

/// Old and new value of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Value at the start of the change cycle
    pub old: Value,
    /// Value after the change
    pub new: Value,
}

impl Change {
    pub fn new(old: Value, new: Value) -> Self {
        Self { old, new }
    }

    /// Checks both ends of the change against optional bounds.
    pub fn matches(&self, from: &Expect, to: &Expect) -> bool {
        from.matches(&self.old) && to.matches(&self.new)
    }

    /// Renders as a two-element `[old, new]` JSON array.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(vec![self.old.to_json(), self.new.to_json()])
    }
}
