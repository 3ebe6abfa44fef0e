//! AFP/MO:DCA structured-field splitter (component C5, spec §4.3).

pub mod fields;
pub mod splitter;

pub use fields::StructuredField;
pub use splitter::{AfpDocument, ExtractMode};
