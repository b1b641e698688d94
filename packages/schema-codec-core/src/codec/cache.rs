//! Schema → procedure pair cache with the active pair of one codec.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::generator::{ProcedureGenerator, ProcedurePair};
use crate::error::Result;
use crate::schema::Schema;

/// Outcome of an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Schema was already active
    Unchanged,
    /// Installed a previously generated pair
    Cached,
    /// Generated, cached and installed a new pair
    Generated,
    /// Installed a no-op pair for a schema without members
    Empty,
}

/// Specialization cache of one codec.
///
/// Entries are never evicted. The active pair is published through
/// `ArcSwap`, so calls load it without locking and keep their snapshot for
/// their whole duration. Activations are serialized by the entry lock.
pub(crate) struct SpecializationCache<T> {
    generator: ProcedureGenerator<T>,
    entries: Mutex<HashMap<Schema, Arc<ProcedurePair<T>>>>,
    active: ArcSwap<ProcedurePair<T>>,
}

impl<T: 'static> SpecializationCache<T> {
    /// Creates the cache with `initial` already generated and active.
    pub(crate) fn new(generator: ProcedureGenerator<T>, initial: &Schema) -> Result<Self> {
        let pair = Arc::new(generator.generate(initial)?);
        let mut entries = HashMap::new();
        entries.insert(initial.clone(), pair.clone());
        Ok(Self {
            generator,
            entries: Mutex::new(entries),
            active: ArcSwap::new(pair),
        })
    }

    /// Loads the active pair.
    pub(crate) fn active(&self) -> Arc<ProcedurePair<T>> {
        self.active.load_full()
    }

    /// Makes `schema` active, generating its procedures on a miss.
    pub(crate) fn activate(&self, schema: &Schema) -> Result<Activation> {
        let mut entries = self.entries.lock();

        if self.active.load().schema() == schema {
            return Ok(Activation::Unchanged);
        }

        if let Some(pair) = entries.get(schema) {
            self.active.store(pair.clone());
            tracing::debug!(
                "Activated cached schema {:08x} for '{}'",
                schema.fingerprint(),
                schema.type_id()
            );
            return Ok(Activation::Cached);
        }

        let pair = Arc::new(self.generator.generate(schema)?);
        entries.insert(schema.clone(), pair.clone());
        self.active.store(pair);

        let outcome = if schema.is_empty() {
            Activation::Empty
        } else {
            Activation::Generated
        };
        tracing::debug!(
            "Activated schema {:08x} for '{}' ({:?}, {} cached)",
            schema.fingerprint(),
            schema.type_id(),
            outcome,
            entries.len()
        );
        Ok(outcome)
    }

    pub(crate) fn generations(&self) -> u64 {
        self.generator.generations()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
