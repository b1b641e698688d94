//! Builds specialized encode/decode procedures from a schema.
//!
//! All lookups (accessor by member name, formatter by declared type) happen
//! here, once per schema. The produced closures only walk pre-resolved steps.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::accessor::{FieldAccessor, FieldAccessors, GetFn, GetMutFn};
use crate::error::{CodecError, Result};
use crate::formatter::{DecodeFieldFn, EncodeFieldFn, FieldFormatter, FormatterRegistry};
use crate::schema::{Schema, SchemaMember};
use crate::wire::{WireReader, WireWriter};

/// Specialized encode procedure of one schema.
pub type EncodeProc<T> = Box<dyn Fn(&mut WireWriter<'_>, &T) -> Result<()> + Send + Sync>;

/// Specialized decode procedure of one schema.
pub type DecodeProc<T> = Box<dyn Fn(&mut WireReader<'_>, &mut T) -> Result<()> + Send + Sync>;

/// Encode/decode procedures bound to exactly one schema.
///
/// Historical schemas get no encoder.
pub struct ProcedurePair<T> {
    schema: Schema,
    encode: Option<EncodeProc<T>>,
    decode: DecodeProc<T>,
}

impl<T> ProcedurePair<T> {
    /// Schema these procedures were generated for.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encoder(&self) -> Option<&EncodeProc<T>> {
        self.encode.as_ref()
    }

    pub fn decoder(&self) -> &DecodeProc<T> {
        &self.decode
    }
}

impl<T: 'static> ProcedurePair<T> {
    /// No-op pair for a schema without members.
    fn empty(schema: &Schema) -> Self {
        let encode: Option<EncodeProc<T>> = if schema.is_primary() {
            Some(Box::new(|_: &mut WireWriter<'_>, _: &T| -> Result<()> { Ok(()) }))
        } else {
            None
        };
        let decode: DecodeProc<T> =
            Box::new(|_: &mut WireReader<'_>, _: &mut T| -> Result<()> { Ok(()) });
        Self {
            schema: schema.clone(),
            encode,
            decode,
        }
    }
}

impl<T> fmt::Debug for ProcedurePair<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedurePair")
            .field("type_id", &self.schema.type_id())
            .field("fingerprint", &format_args!("{:08x}", self.schema.fingerprint()))
            .field("writable", &self.encode.is_some())
            .finish_non_exhaustive()
    }
}

struct EncodeStep<T> {
    get: GetFn<T>,
    encode: Arc<EncodeFieldFn>,
}

enum DecodeStep<T> {
    Skip,
    Field {
        name: String,
        get_mut: GetMutFn<T>,
        decode: Arc<DecodeFieldFn>,
    },
}

/// Procedure generator of one codec.
pub(crate) struct ProcedureGenerator<T> {
    type_id: String,
    accessors: FieldAccessors<T>,
    formatters: Arc<FormatterRegistry>,
    max_frame_len: u32,
    generations: AtomicU64,
}

impl<T: 'static> ProcedureGenerator<T> {
    pub(crate) fn new(
        type_id: impl Into<String>,
        accessors: FieldAccessors<T>,
        formatters: Arc<FormatterRegistry>,
        max_frame_len: u32,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            accessors,
            formatters,
            max_frame_len,
            generations: AtomicU64::new(0),
        }
    }

    /// Number of schemas procedures were generated for. The empty-schema
    /// fast path does not count.
    pub(crate) fn generations(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    /// Builds the procedure pair for `schema`.
    pub(crate) fn generate(&self, schema: &Schema) -> Result<ProcedurePair<T>> {
        if schema.is_empty() {
            return Ok(ProcedurePair::empty(schema));
        }

        let encode = if schema.is_primary() {
            Some(self.generate_encoder(schema)?)
        } else {
            None
        };
        let decode = self.generate_decoder(schema)?;

        self.generations.fetch_add(1, Ordering::Relaxed);
        Ok(ProcedurePair {
            schema: schema.clone(),
            encode,
            decode,
        })
    }

    /// Builds the encode procedure of a writable schema.
    pub(crate) fn generate_encoder(&self, schema: &Schema) -> Result<EncodeProc<T>> {
        if !schema.is_primary() {
            return Err(CodecError::WriteAgainstHistoricalSchema {
                type_id: self.type_id.clone(),
                fingerprint: schema.fingerprint(),
            });
        }

        let mut steps = Vec::with_capacity(schema.len());
        for member in schema.members() {
            if member.is_skip {
                return Err(CodecError::UnsupportedType {
                    type_id: self.type_id.clone(),
                    reason: format!("primary schema contains skip member '{}'", member.name),
                });
            }
            let accessor = self.accessor(member)?;
            let formatter = self.formatter(member)?;
            steps.push(EncodeStep {
                get: accessor.get,
                encode: formatter.encode,
            });
        }

        let max_frame_len = self.max_frame_len as usize;
        let encode: EncodeProc<T> = Box::new(
            move |writer: &mut WireWriter<'_>, value: &T| -> Result<()> {
                for step in &steps {
                    let len = writer.write_frame(|w| (step.encode)(w, (step.get)(value)))?;
                    if len > max_frame_len {
                        return Err(CodecError::FrameTooLarge {
                            len,
                            limit: max_frame_len,
                        });
                    }
                }
                Ok(())
            },
        );
        Ok(encode)
    }

    /// Builds the decode procedure of any schema.
    pub(crate) fn generate_decoder(&self, schema: &Schema) -> Result<DecodeProc<T>> {
        let mut steps = Vec::with_capacity(schema.len());
        for member in schema.members() {
            if member.is_skip {
                steps.push(DecodeStep::Skip);
                continue;
            }
            let accessor = self.accessor(member)?;
            let formatter = self.formatter(member)?;
            steps.push(DecodeStep::Field {
                name: member.name.clone(),
                get_mut: accessor.get_mut,
                decode: formatter.decode,
            });
        }

        let max_frame_len = self.max_frame_len;
        let decode: DecodeProc<T> = Box::new(
            move |reader: &mut WireReader<'_>, value: &mut T| -> Result<()> {
                for step in &steps {
                    // The length is read for every slot; skip slots stop here.
                    let mut frame = reader.read_frame(max_frame_len)?;
                    if let DecodeStep::Field {
                        name,
                        get_mut,
                        decode,
                    } = step
                    {
                        decode(&mut frame, get_mut(&mut *value))?;
                        if !frame.is_eof() {
                            tracing::trace!(
                                "Member '{}' left {} unread bytes in its frame",
                                name,
                                frame.remaining()
                            );
                        }
                    }
                }
                Ok(())
            },
        );
        Ok(decode)
    }

    fn accessor(&self, member: &SchemaMember) -> Result<FieldAccessor<T>> {
        self.accessors
            .get(&member.name)
            .ok_or_else(|| CodecError::AccessorNotFound {
                type_id: self.type_id.clone(),
                member: member.name.clone(),
            })
    }

    fn formatter(&self, member: &SchemaMember) -> Result<FieldFormatter> {
        self.formatters
            .resolve(&member.type_id)
            .ok_or_else(|| CodecError::FormatterNotFound {
                type_id: self.type_id.clone(),
                member: member.name.clone(),
                field_type: member.type_id.clone(),
            })
    }
}
