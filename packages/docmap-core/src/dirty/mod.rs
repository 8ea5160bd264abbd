//! Change sets, incremental diffs, and update payload building.

mod change;
mod change_set;
mod resizable;
mod setters;

pub use change::Change;
pub use change_set::ChangeSet;
pub use resizable::{AppendDiff, IncrementalDiff, MembershipDiff};
pub use setters::{build_update_ops, update_set_to_json, UpdateOp, UpdateSet};
