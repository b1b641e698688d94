//! Single field slot within a schema.

use serde::{Deserialize, Serialize};

/// One framed field slot.
///
/// A skip member occupies a frame on the wire but has no live field behind
/// it; its payload is read and discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaMember {
    /// Member name, used to look up the field accessor
    pub name: String,
    /// Declared field type identifier (e.g., "i32", "string", "Point")
    pub type_id: String,
    /// Slot exists in the wire layout but is discarded on read
    #[serde(default)]
    pub is_skip: bool,
}

impl SchemaMember {
    /// Creates a live member.
    pub fn new(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            is_skip: false,
        }
    }

    /// Creates a skip member.
    pub fn skip(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            is_skip: true,
        }
    }
}
