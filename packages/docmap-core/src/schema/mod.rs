//! Field descriptor registry, accessor generation, and schema files.

mod accessors;
mod definition;
mod field;
mod registry;

pub use accessors::{Accessor, AccessorKind, AccessorTable};
pub use definition::{FieldDefinition, SchemaDefinition};
pub use field::{DefaultFn, FieldBuilder, FieldDescriptor, FieldType};
pub use registry::{Schema, SchemaBuilder};
