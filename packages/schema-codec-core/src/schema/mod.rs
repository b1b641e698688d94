//! Schema model: the ordered field set of one type.

mod member;

pub use member::SchemaMember;

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Ordered field set of one logical type.
///
/// Two schemas are the same cache key when they belong to the same type and
/// list the same members, in the same order, with the same skip flags. The
/// primary flag does not take part in equality: a historical schema with the
/// exact primary layout reads and writes the same bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    type_id: String,
    #[serde(default)]
    is_primary: bool,
    members: Vec<SchemaMember>,
}

impl Schema {
    /// Creates the primary (authoritative, writable) schema of a type.
    pub fn primary(type_id: impl Into<String>, members: Vec<SchemaMember>) -> Self {
        Self {
            type_id: type_id.into(),
            is_primary: true,
            members,
        }
    }

    /// Creates a historical schema, reconstructed from data written by an
    /// older version of the type. Historical schemas are read-only.
    pub fn historical(type_id: impl Into<String>, members: Vec<SchemaMember>) -> Self {
        Self {
            type_id: type_id.into(),
            is_primary: false,
            members,
        }
    }

    /// Parses a schema descriptor from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CodecError::InvalidData(format!("schema: {}", e)))
    }

    /// Serializes the schema descriptor to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CodecError::InvalidData(format!("schema: {}", e)))
    }

    /// Identifier of the owning type.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Members in wire order.
    pub fn members(&self) -> impl ExactSizeIterator<Item = &SchemaMember> {
        self.members.iter()
    }

    pub fn member(&self, index: usize) -> Option<&SchemaMember> {
        self.members.get(index)
    }

    /// Number of framed slots.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of skip members.
    pub fn skip_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_skip).count()
    }

    /// CRC32 over the structural identity.
    ///
    /// Equal schemas always share a fingerprint. Used to name schemas in logs
    /// and error messages.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hash_str(&mut hasher, &self.type_id);
        hasher.update(&(self.members.len() as u32).to_be_bytes());
        for member in &self.members {
            hash_str(&mut hasher, &member.name);
            hash_str(&mut hasher, &member.type_id);
            hasher.update(&[member.is_skip as u8]);
        }
        hasher.finalize()
    }
}

fn hash_str(hasher: &mut crc32fast::Hasher, s: &str) {
    hasher.update(&(s.len() as u32).to_be_bytes());
    hasher.update(s.as_bytes());
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.members == other.members
    }
}

impl Eq for Schema {}

impl Hash for Schema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.members.hash(state);
    }
}
