//! Schema-tolerant codec of one concrete type.
//!
//! A [`SchemaCodec`] owns the specialization cache of its type, installs the
//! primary schema at construction and follows schema changes published by the
//! [`TypeMetadataService`]. Each encode/decode call runs the currently active
//! procedure pair; no schema is interpreted per call.

mod cache;
mod generator;
mod guard;

pub use cache::Activation;
pub use generator::{DecodeProc, EncodeProc, ProcedurePair};

use std::any::Any;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::accessor::FieldAccessors;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::formatter::{FieldFormatter, FormatterRegistry};
use crate::metadata::{MigrationGuard, SchemaObserver, TypeKind, TypeMetadataService};
use crate::schema::Schema;
use crate::validation::validate_target;
use crate::wire::{WireReader, WireWriter};

use cache::SpecializationCache;
use generator::ProcedureGenerator;
use guard::ReentrancyGuard;

/// Codec of one concrete type `T`.
pub struct SchemaCodec<T> {
    type_id: String,
    cache: SpecializationCache<T>,
    guard: ReentrancyGuard,
    /// Held shared by every decode, exclusively by activation and by a
    /// prepared schema change of this type or of a tracked member type
    gate: RwLock<()>,
    max_frame_len: u32,
    /// Inlined value-type member types this codec subscribed to
    tracked_types: Vec<String>,
}

impl<T> std::fmt::Debug for SchemaCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCodec")
            .field("type_id", &self.type_id)
            .field("tracked_types", &self.tracked_types)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> SchemaCodec<T> {
    /// Builds the codec for a registered type and activates its primary schema.
    ///
    /// # Arguments
    /// * `type_id` - Type identifier registered with `metadata`
    /// * `accessors` - Field accessors of `T`, keyed by member name
    /// * `formatters` - Resolver for member field types
    /// * `metadata` - Source of the primary schema and of change notifications
    /// * `config` - Version-tolerance policy and validation settings
    ///
    /// # Returns
    /// `Err(CodecError::UnsupportedType)` if the type fails validation.
    pub fn new(
        type_id: &str,
        accessors: FieldAccessors<T>,
        formatters: Arc<FormatterRegistry>,
        metadata: &TypeMetadataService,
        config: &CodecConfig,
    ) -> Result<Arc<Self>> {
        let primary = metadata
            .primary_schema(type_id)
            .map_err(|_| CodecError::UnsupportedType {
                type_id: type_id.to_string(),
                reason: "type is not registered with the metadata service".to_string(),
            })?;
        validate_target(type_id, &primary, &accessors, &formatters, config)?;

        let generator =
            ProcedureGenerator::new(type_id, accessors, formatters, config.max_frame_len);
        let cache = SpecializationCache::new(generator, &primary)?;

        let tracked_types = if config.tolerates_versions() {
            inlined_value_types(&primary, metadata)
        } else {
            Vec::new()
        };

        let codec = Arc::new(Self {
            type_id: type_id.to_string(),
            cache,
            guard: ReentrancyGuard::new(),
            gate: RwLock::new(()),
            max_frame_len: config.max_frame_len,
            tracked_types,
        });

        if config.tolerates_versions() {
            let observer: Arc<dyn SchemaObserver> = codec.clone();
            let observer = Arc::downgrade(&observer);
            metadata.subscribe(type_id, observer.clone())?;
            for member_type in &codec.tracked_types {
                metadata.subscribe(member_type, observer.clone())?;
                tracing::debug!(
                    "'{}' tracks schema changes of inlined '{}'",
                    type_id,
                    member_type
                );
            }
        }

        Ok(codec)
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Encodes `value` at `cursor`, advancing it past the written frames.
    pub fn encode(&self, buf: &mut Vec<u8>, cursor: &mut usize, value: &T) -> Result<()> {
        let mut writer = WireWriter::at(buf, *cursor)?;
        self.encode_to(&mut writer, value)?;
        *cursor = writer.position();
        Ok(())
    }

    /// Decodes into `value` from `cursor`, advancing it past the read frames.
    ///
    /// Fields present in the active schema are overwritten in place; fields
    /// it does not mention keep their previous values.
    pub fn decode(&self, buf: &[u8], cursor: &mut usize, value: &mut T) -> Result<()> {
        let mut reader = WireReader::at(buf, *cursor)?;
        self.decode_from(&mut reader, value)?;
        *cursor = reader.position();
        Ok(())
    }

    /// Encodes `value` into a new buffer.
    pub fn to_vec(&self, value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_to(&mut WireWriter::new(&mut buf), value)?;
        Ok(buf)
    }

    /// Encodes with the active schema through an existing writer.
    pub fn encode_to(&self, writer: &mut WireWriter<'_>, value: &T) -> Result<()> {
        let pair = self.cache.active();
        let encode = pair
            .encoder()
            .ok_or_else(|| CodecError::WriteAgainstHistoricalSchema {
                type_id: self.type_id.clone(),
                fingerprint: pair.schema().fingerprint(),
            })?;
        encode(writer, value)
    }

    /// Decodes with the active schema through an existing reader.
    pub fn decode_from(&self, reader: &mut WireReader<'_>, value: &mut T) -> Result<()> {
        let _shared = if self.guard.depth() == 0 {
            self.gate.read()
        } else {
            self.gate.read_recursive()
        };
        let _scope = self.guard.enter();
        let pair = self.cache.active();
        (pair.decoder())(reader, value)
    }

    /// Makes `schema` the active schema.
    ///
    /// Used by notifications and by an owning serializer that is about to
    /// read data written with a historical schema. While a decode of this
    /// codec is in progress on the current thread only the already active
    /// schema is accepted.
    pub fn activate(&self, schema: &Schema) -> Result<Activation> {
        if schema.type_id() != self.type_id {
            return Err(CodecError::InvalidData(format!(
                "schema {:08x} of '{}' cannot be activated for '{}'",
                schema.fingerprint(),
                schema.type_id(),
                self.type_id
            )));
        }

        if self.vet(&self.type_id, schema)? > 0 {
            return Ok(Activation::Unchanged);
        }

        let _exclusive = self.gate.write();
        self.cache.activate(schema)
    }

    /// Schema of the active procedure pair.
    pub fn active_schema(&self) -> Schema {
        self.cache.active().schema().clone()
    }

    /// Returns `true` while the primary schema is active (encoding allowed).
    pub fn is_writable(&self) -> bool {
        self.cache.active().encoder().is_some()
    }

    /// Number of schemas procedures were generated for.
    pub fn generation_count(&self) -> u64 {
        self.cache.generations()
    }

    /// Number of cached procedure pairs.
    pub fn cached_schemas(&self) -> usize {
        self.cache.len()
    }

    /// Decode depth of this codec on the current thread.
    pub fn decode_depth(&self) -> usize {
        self.guard.depth()
    }

    /// Inlined value-type member types whose schema changes are tracked.
    pub fn tracked_types(&self) -> &[String] {
        &self.tracked_types
    }

    /// Largest frame payload this codec writes or reads.
    pub fn max_frame_len(&self) -> u32 {
        self.max_frame_len
    }

    /// Refuses a change of `changed_type` while a decode of this codec is on
    /// the current thread's stack; only re-activating the active schema of
    /// the own type passes. Returns the decode depth.
    fn vet(&self, changed_type: &str, schema: &Schema) -> Result<usize> {
        let depth = self.guard.depth();
        if depth > 0 && (changed_type != self.type_id || self.cache.active().schema() != schema) {
            return Err(self.guard.refuse(&self.type_id, changed_type, depth));
        }
        Ok(depth)
    }

    fn tracks(&self, type_id: &str) -> bool {
        self.tracked_types.iter().any(|t| t == type_id)
    }
}

impl<T: Any> SchemaCodec<T> {
    /// Exposes this codec as the field formatter of its own type, so a parent
    /// type can inline it as a value-type member.
    ///
    /// The formatter holds the codec weakly.
    pub fn formatter(self: &Arc<Self>) -> FieldFormatter {
        let encode_codec = Arc::downgrade(self);
        let decode_codec: Weak<Self> = encode_codec.clone();
        let type_id = self.type_id.clone();
        let encode_type = type_id.clone();
        let decode_type = type_id.clone();
        FieldFormatter::typed::<T>(
            type_id,
            move |writer: &mut WireWriter<'_>, value: &T| {
                upgrade(&encode_codec, &encode_type)?.encode_to(writer, value)
            },
            move |reader: &mut WireReader<'_>, value: &mut T| {
                upgrade(&decode_codec, &decode_type)?.decode_from(reader, value)
            },
        )
    }
}

fn upgrade<T>(codec: &Weak<SchemaCodec<T>>, type_id: &str) -> Result<Arc<SchemaCodec<T>>> {
    codec.upgrade().ok_or_else(|| CodecError::UnsupportedType {
        type_id: type_id.to_string(),
        reason: "codec has been dropped".to_string(),
    })
}

impl<T: 'static> SchemaObserver for SchemaCodec<T> {
    /// Vetoes the change during a decode on this thread, otherwise holds the
    /// decode gate until the change is applied, so no decode of this codec
    /// (on any thread) runs across it.
    fn prepare(&self, type_id: &str, schema: &Schema) -> Result<MigrationGuard<'_>> {
        if type_id != self.type_id && !self.tracks(type_id) {
            return Ok(MigrationGuard::unlocked());
        }
        if self.vet(type_id, schema)? > 0 {
            return Ok(MigrationGuard::unlocked());
        }
        Ok(MigrationGuard::exclusive(&self.gate))
    }

    fn on_schema_changed(&self, type_id: &str, schema: &Schema) -> Result<()> {
        if type_id == self.type_id {
            // Gate already held by the prepare guard
            self.cache.activate(schema).map(|_| ())
        } else if self.tracks(type_id) {
            tracing::debug!(
                "Inlined '{}' of '{}' moved to schema {:08x}",
                type_id,
                self.type_id,
                schema.fingerprint()
            );
            Ok(())
        } else {
            Ok(())
        }
    }
}

/// Member types of `primary` registered as value types, in member order.
fn inlined_value_types(primary: &Schema, metadata: &TypeMetadataService) -> Vec<String> {
    let mut tracked: Vec<String> = Vec::new();
    for member in primary.members() {
        if metadata.type_kind(&member.type_id) == Some(TypeKind::Value)
            && !tracked.contains(&member.type_id)
        {
            tracked.push(member.type_id.clone());
        }
    }
    tracked
}
