use std::collections::HashMap;
use std::sync::RwLock;

use super::FieldFormatter;
use crate::error::{CodecError, Result};

/// Registry for field formatters.
///
/// Resolves a field's declared type to its dedicated procedures. Codecs
/// consult it once per member when generating procedures, never per call.
#[derive(Debug, Default)]
pub struct FormatterRegistry {
    formatters: RwLock<HashMap<String, FieldFormatter>>,
}

impl FormatterRegistry {
    /// Creates a new empty formatter registry.
    pub fn new() -> Self {
        Self {
            formatters: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry pre-populated with the builtin formatters.
    pub fn with_builtins() -> Result<Self> {
        let registry = Self::new();
        super::register_builtin_formatters(&registry)?;
        Ok(registry)
    }

    /// Registers a formatter.
    ///
    /// # Returns
    /// `Err(CodecError::AlreadyRegistered)` if the type already has one.
    pub fn register(&self, formatter: FieldFormatter) -> Result<()> {
        let mut formatters = self
            .formatters
            .write()
            .map_err(|_| CodecError::LockPoisoned)?;

        if formatters.contains_key(&formatter.type_id) {
            return Err(CodecError::AlreadyRegistered {
                type_id: formatter.type_id.clone(),
            });
        }

        formatters.insert(formatter.type_id.clone(), formatter);
        Ok(())
    }

    /// Resolves the formatter for a type.
    ///
    /// # Returns
    /// `Some(FieldFormatter)` if found, `None` otherwise.
    pub fn resolve(&self, type_id: &str) -> Option<FieldFormatter> {
        let formatters = self.formatters.read().ok()?;
        formatters.get(type_id).cloned()
    }

    /// Checks if a type has a formatter.
    pub fn contains(&self, type_id: &str) -> bool {
        let formatters = match self.formatters.read() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        formatters.contains_key(type_id)
    }

    /// Returns all type identifiers with a formatter.
    pub fn type_ids(&self) -> Vec<String> {
        let formatters = match self.formatters.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };
        formatters.keys().cloned().collect()
    }
}
