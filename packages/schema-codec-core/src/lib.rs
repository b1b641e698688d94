//! Schema-tolerant binary codec core.
//!
//! Builds specialized encode/decode procedures per schema, frames every
//! field with a length prefix so unknown fields can be skipped, caches one
//! procedure pair per schema, and migrates live codecs when a type's schema
//! changes at runtime.

pub mod accessor;
pub mod codec;
pub mod config;
pub mod error;
pub mod formatter;
pub mod metadata;
pub mod schema;
pub(crate) mod validation;
pub mod wire;

pub use accessor::{FieldAccessor, FieldAccessors};
pub use codec::{Activation, SchemaCodec};
pub use config::{CodecConfig, VersionTolerance};
pub use error::CodecError;
pub use formatter::{register_builtin_formatters, FieldFormatter, FormatterRegistry};
pub use metadata::{MigrationGuard, SchemaObserver, TypeKind, TypeMetadataService};
pub use schema::{Schema, SchemaMember};
pub use wire::{WireReader, WireWriter};
