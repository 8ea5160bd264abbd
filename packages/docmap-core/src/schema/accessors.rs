//! Accessor dispatch table.
//!
//! Every declared attribute yields a family of accessor names
//! (`name_was`, `saved_change_to_name?`, ...). The table is built once per
//! schema and maps each generated name back to its attribute and behavior.

use std::collections::HashMap;
use std::fmt;

/// Behavior of one generated accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// `M`
    Read,
    /// `M=`
    Write,
    /// `M_change`
    Change,
    /// `M_changed?`
    Changed,
    /// `will_save_change_to_M?`
    WillSaveChange,
    /// `M_changed_from_default?`
    ChangedFromDefault,
    /// `M_was`
    Was,
    /// `M_previously_was`
    PreviouslyWas,
    /// `M_before_last_save`
    BeforeLastSave,
    /// `saved_change_to_M`
    SavedChange,
    /// `saved_change_to_M?`
    SavedChangeQuery,
    /// `M_will_change!`
    WillChange,
    /// `reset_M!`
    Reset,
    /// `reset_M_to_default!`
    ResetToDefault,
    /// `M_previously_changed?`
    PreviouslyChanged,
    /// `M_previous_change`
    PreviousChange,
}

impl AccessorKind {
    /// Every accessor generated for an attribute.
    pub const ALL: [AccessorKind; 16] = [
        AccessorKind::Read,
        AccessorKind::Write,
        AccessorKind::Change,
        AccessorKind::Changed,
        AccessorKind::WillSaveChange,
        AccessorKind::ChangedFromDefault,
        AccessorKind::Was,
        AccessorKind::PreviouslyWas,
        AccessorKind::BeforeLastSave,
        AccessorKind::SavedChange,
        AccessorKind::SavedChangeQuery,
        AccessorKind::WillChange,
        AccessorKind::Reset,
        AccessorKind::ResetToDefault,
        AccessorKind::PreviouslyChanged,
        AccessorKind::PreviousChange,
    ];

    /// Method name generated for accessor base name `meth`.
    pub fn method_name(self, meth: &str) -> String {
        match self {
            AccessorKind::Read => meth.to_string(),
            AccessorKind::Write => format!("{}=", meth),
            AccessorKind::Change => format!("{}_change", meth),
            AccessorKind::Changed => format!("{}_changed?", meth),
            AccessorKind::WillSaveChange => format!("will_save_change_to_{}?", meth),
            AccessorKind::ChangedFromDefault => format!("{}_changed_from_default?", meth),
            AccessorKind::Was => format!("{}_was", meth),
            AccessorKind::PreviouslyWas => format!("{}_previously_was", meth),
            AccessorKind::BeforeLastSave => format!("{}_before_last_save", meth),
            AccessorKind::SavedChange => format!("saved_change_to_{}", meth),
            AccessorKind::SavedChangeQuery => format!("saved_change_to_{}?", meth),
            AccessorKind::WillChange => format!("{}_will_change!", meth),
            AccessorKind::Reset => format!("reset_{}!", meth),
            AccessorKind::ResetToDefault => format!("reset_{}_to_default!", meth),
            AccessorKind::PreviouslyChanged => format!("{}_previously_changed?", meth),
            AccessorKind::PreviousChange => format!("{}_previous_change", meth),
        }
    }
}

impl fmt::Display for AccessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method_name("M"))
    }
}

/// Resolved accessor: the attribute it targets and what it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    /// Attribute name (not the alias)
    pub attribute: String,
    /// Accessor behavior
    pub kind: AccessorKind,
}

/// Generated method name to accessor lookup.
#[derive(Debug, Clone, Default)]
pub struct AccessorTable {
    methods: HashMap<String, Accessor>,
}

impl AccessorTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Generates the accessor family for `attribute` under base name `meth`.
    ///
    /// # Returns
    /// `Err(method)` with the first generated name already taken; the table
    /// is left unchanged in that case.
    pub(crate) fn insert_field(&mut self, attribute: &str, meth: &str) -> Result<(), String> {
        let names: Vec<(String, AccessorKind)> = AccessorKind::ALL
            .iter()
            .map(|kind| (kind.method_name(meth), *kind))
            .collect();

        if let Some((taken, _)) = names.iter().find(|(name, _)| self.methods.contains_key(name)) {
            return Err(taken.clone());
        }

        for (name, kind) in names {
            self.methods.insert(
                name,
                Accessor {
                    attribute: attribute.to_string(),
                    kind,
                },
            );
        }
        Ok(())
    }

    /// Resolves a generated method name.
    pub fn resolve(&self, method: &str) -> Option<&Accessor> {
        self.methods.get(method)
    }

    /// Returns all generated method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
