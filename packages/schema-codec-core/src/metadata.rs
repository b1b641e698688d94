//! Per-type metadata service with explicit schema-change subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::{CodecError, Result};
use crate::schema::Schema;

/// How a type is embedded in its parent's byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Copied by value; serialization is inlined into the parent
    Value,
    /// Shared by reference; serialization goes through the reference layer
    Reference,
}

/// Holds an observer still while an accepted schema change is applied.
#[must_use]
pub struct MigrationGuard<'a> {
    exclusive: Option<RwLockWriteGuard<'a, ()>>,
}

impl<'a> MigrationGuard<'a> {
    /// Guard that holds nothing.
    pub fn unlocked() -> Self {
        Self { exclusive: None }
    }

    /// Takes `gate` exclusively until the guard is dropped.
    pub fn exclusive(gate: &'a RwLock<()>) -> Self {
        Self {
            exclusive: Some(gate.write()),
        }
    }
}

impl std::fmt::Debug for MigrationGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationGuard")
            .field("exclusive", &self.exclusive.is_some())
            .finish()
    }
}

/// Receives schema-change notifications for subscribed types.
///
/// A change is delivered in two passes. Every observer is asked to
/// [`prepare`](Self::prepare) first; if any refuses, nothing is applied.
/// Otherwise the current schema is updated and
/// [`on_schema_changed`](Self::on_schema_changed) runs on every observer
/// while all prepare guards are still held.
pub trait SchemaObserver: Send + Sync {
    /// Checks that the change can be applied now.
    ///
    /// An error vetoes the change for every observer and is returned to the
    /// publisher.
    fn prepare(&self, _type_id: &str, _schema: &Schema) -> Result<MigrationGuard<'_>> {
        Ok(MigrationGuard::unlocked())
    }

    /// Applies a change every observer accepted.
    fn on_schema_changed(&self, type_id: &str, schema: &Schema) -> Result<()>;
}

struct TypeEntry {
    kind: TypeKind,
    primary: Schema,
    current: Schema,
    observers: Vec<Weak<dyn SchemaObserver>>,
}

/// Type metadata service.
///
/// Holds the primary and current schema of every registered type and the
/// observers subscribed to each. Observers are held weakly; a dropped codec
/// simply stops receiving notifications.
#[derive(Default)]
pub struct TypeMetadataService {
    types: RwLock<HashMap<String, TypeEntry>>,
}

impl std::fmt::Debug for TypeMetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self.types.read();
        f.debug_struct("TypeMetadataService")
            .field("types", &types.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type with its primary schema.
    ///
    /// # Arguments
    /// * `kind` - Value or reference semantics
    /// * `primary` - Primary schema; its owner becomes the type id
    pub fn register_type(&self, kind: TypeKind, primary: Schema) -> Result<()> {
        if !primary.is_primary() {
            return Err(CodecError::InvalidData(format!(
                "schema {:08x} registered for '{}' is not primary",
                primary.fingerprint(),
                primary.type_id()
            )));
        }

        let mut types = self.types.write();
        let type_id = primary.type_id().to_string();
        if types.contains_key(&type_id) {
            return Err(CodecError::AlreadyRegistered { type_id });
        }
        types.insert(
            type_id,
            TypeEntry {
                kind,
                current: primary.clone(),
                primary,
                observers: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.read().contains_key(type_id)
    }

    /// Returns the kind of a registered type.
    pub fn type_kind(&self, type_id: &str) -> Option<TypeKind> {
        self.types.read().get(type_id).map(|entry| entry.kind)
    }

    /// Returns the primary schema of a registered type.
    pub fn primary_schema(&self, type_id: &str) -> Result<Schema> {
        self.types
            .read()
            .get(type_id)
            .map(|entry| entry.primary.clone())
            .ok_or_else(|| CodecError::TypeNotRegistered {
                type_id: type_id.to_string(),
            })
    }

    /// Returns the schema most recently published for a type.
    pub fn current_schema(&self, type_id: &str) -> Result<Schema> {
        self.types
            .read()
            .get(type_id)
            .map(|entry| entry.current.clone())
            .ok_or_else(|| CodecError::TypeNotRegistered {
                type_id: type_id.to_string(),
            })
    }

    /// Subscribes an observer to schema changes of `type_id`.
    pub fn subscribe(&self, type_id: &str, observer: Weak<dyn SchemaObserver>) -> Result<()> {
        let mut types = self.types.write();
        let entry = types
            .get_mut(type_id)
            .ok_or_else(|| CodecError::TypeNotRegistered {
                type_id: type_id.to_string(),
            })?;
        entry.observers.push(observer);
        Ok(())
    }

    /// Number of live observers of a type.
    pub fn observer_count(&self, type_id: &str) -> usize {
        self.types
            .read()
            .get(type_id)
            .map(|entry| entry.observers.iter().filter(|o| o.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Makes `schema` the current schema of its type and notifies observers.
    ///
    /// Observers run synchronously on the calling thread, outside the
    /// service's lock. They are prepared newest subscription first: a parent
    /// codec subscribes after the member codecs it inlines, so parents are
    /// held before their members. A refusal in the prepare pass leaves the
    /// current schema and every observer untouched. In the apply pass every
    /// observer is notified and the first error is returned.
    pub fn publish(&self, schema: Schema) -> Result<()> {
        let type_id = schema.type_id().to_string();
        let observers: Vec<Arc<dyn SchemaObserver>> = {
            let mut types = self.types.write();
            let entry = types
                .get_mut(&type_id)
                .ok_or_else(|| CodecError::TypeNotRegistered {
                    type_id: type_id.clone(),
                })?;

            if schema.is_primary() && schema != entry.primary {
                return Err(CodecError::InvalidData(format!(
                    "schema {:08x} claims to be primary for '{}' but differs from {:08x}",
                    schema.fingerprint(),
                    type_id,
                    entry.primary.fingerprint()
                )));
            }

            entry.observers.retain(|o| o.strong_count() > 0);
            entry.observers.iter().filter_map(Weak::upgrade).collect()
        };

        let mut guards = Vec::with_capacity(observers.len());
        for observer in observers.iter().rev() {
            guards.push(observer.prepare(&type_id, &schema)?);
        }

        if let Some(entry) = self.types.write().get_mut(&type_id) {
            entry.current = schema.clone();
        }

        tracing::debug!(
            "Publishing schema {:08x} for '{}' to {} observers",
            schema.fingerprint(),
            type_id,
            observers.len()
        );

        let mut first_error = None;
        for observer in &observers {
            if let Err(e) = observer.on_schema_changed(&type_id, &schema) {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::warn!("Additional observer of '{}' failed: {}", type_id, e);
                }
            }
        }
        drop(guards);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Publishes the primary schema of a type again.
    pub fn restore_primary(&self, type_id: &str) -> Result<()> {
        let primary = self.primary_schema(type_id)?;
        self.publish(primary)
    }
}
