//! Shared fixtures for integration tests.

use std::sync::Arc;

use schema_codec_core::{
    accessor, CodecConfig, FieldAccessors, FormatterRegistry, Schema, SchemaCodec, SchemaMember,
    TypeKind, TypeMetadataService,
};

/// Three-field record used by the evolution tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triple {
    pub f1: u64,
    pub f2: Vec<u8>,
    pub f3: String,
}

pub fn triple_primary() -> Schema {
    Schema::primary(
        "Triple",
        vec![
            SchemaMember::new("f1", "u64"),
            SchemaMember::new("f2", "bytes"),
            SchemaMember::new("f3", "string"),
        ],
    )
}

pub fn triple_skipping_f2() -> Schema {
    Schema::historical(
        "Triple",
        vec![
            SchemaMember::new("f1", "u64"),
            SchemaMember::skip("f2", "bytes"),
            SchemaMember::new("f3", "string"),
        ],
    )
}

pub fn triple_accessors() -> FieldAccessors<Triple> {
    FieldAccessors::new()
        .with("f1", accessor!(Triple, f1))
        .with("f2", accessor!(Triple, f2))
        .with("f3", accessor!(Triple, f3))
}

pub fn builtin_formatters() -> Arc<FormatterRegistry> {
    Arc::new(FormatterRegistry::with_builtins().expect("builtin formatters"))
}

/// Metadata service with `Triple` registered and a codec built for it.
pub fn triple_codec() -> (Arc<TypeMetadataService>, Arc<SchemaCodec<Triple>>) {
    let metadata = Arc::new(TypeMetadataService::new());
    metadata
        .register_type(TypeKind::Reference, triple_primary())
        .expect("register Triple");
    let codec = SchemaCodec::new(
        "Triple",
        triple_accessors(),
        builtin_formatters(),
        &metadata,
        &CodecConfig::default(),
    )
    .expect("Triple codec");
    (metadata, codec)
}
