//! Field formatters: the dedicated encode/decode procedure of one field type.

mod builtin;
mod registry;

pub use builtin::register_builtin_formatters;
pub use registry::FormatterRegistry;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{CodecError, Result};
use crate::wire::{WireReader, WireWriter};

/// Type alias for field encoder signature.
pub type EncodeFieldFn = dyn Fn(&mut WireWriter<'_>, &dyn Any) -> Result<()> + Send + Sync;

/// Type alias for field decoder signature.
///
/// The reader is bounded to the field's frame.
pub type DecodeFieldFn = dyn Fn(&mut WireReader<'_>, &mut dyn Any) -> Result<()> + Send + Sync;

/// Encode/decode procedure pair for one field type.
#[derive(Clone)]
pub struct FieldFormatter {
    /// Type identifier (e.g., "i32", "string", "Point")
    pub type_id: String,
    /// Writes the payload of a field
    pub encode: Arc<EncodeFieldFn>,
    /// Reads a field payload into an existing value
    pub decode: Arc<DecodeFieldFn>,
}

impl fmt::Debug for FieldFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFormatter")
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

impl FieldFormatter {
    /// Creates a formatter from type-erased procedures.
    pub fn new(
        type_id: impl Into<String>,
        encode: impl Fn(&mut WireWriter<'_>, &dyn Any) -> Result<()> + Send + Sync + 'static,
        decode: impl Fn(&mut WireReader<'_>, &mut dyn Any) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// Creates a formatter for the Rust type `F`.
    ///
    /// The erased value is downcast to `F` before the typed procedures run; a
    /// value of any other type fails with `FieldTypeMismatch`.
    pub fn typed<F: Any>(
        type_id: impl Into<String>,
        encode: impl Fn(&mut WireWriter<'_>, &F) -> Result<()> + Send + Sync + 'static,
        decode: impl Fn(&mut WireReader<'_>, &mut F) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        let type_id = type_id.into();
        let encode_type = type_id.clone();
        let decode_type = type_id.clone();
        Self::new(
            type_id,
            move |writer, value| {
                let value = value
                    .downcast_ref::<F>()
                    .ok_or_else(|| CodecError::FieldTypeMismatch {
                        expected: encode_type.clone(),
                    })?;
                encode(writer, value)
            },
            move |reader, slot| {
                let slot = slot
                    .downcast_mut::<F>()
                    .ok_or_else(|| CodecError::FieldTypeMismatch {
                        expected: decode_type.clone(),
                    })?;
                decode(reader, slot)
            },
        )
    }
}
