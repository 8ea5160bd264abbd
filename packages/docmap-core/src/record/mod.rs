//! Records: live attributes bound to a schema and a change set.

mod attribute;
mod dispatch;
#[allow(clippy::module_inception)]
mod record;

pub use attribute::{AttributeMut, AttributeRef};
pub use dispatch::{AccessorArgs, AccessorOutput};
pub use record::Record;
