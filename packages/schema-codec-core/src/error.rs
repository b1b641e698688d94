//! Codec error types.

use thiserror::Error;

/// Codec operation errors.
///
/// The first three variants are the fatal conditions of the engine itself;
/// the rest come from the wire layer and the bundled collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Construction refused by the type validator
    #[error("Type '{type_id}' is not supported: {reason}")]
    UnsupportedType { type_id: String, reason: String },

    /// Encode called while a historical schema is active
    #[error(
        "Cannot encode '{type_id}': active schema {fingerprint:08x} is historical and has no write procedure"
    )]
    WriteAgainstHistoricalSchema { type_id: String, fingerprint: u32 },

    /// Schema swap requested while a decode of the same codec is on the call stack
    #[error(
        "Unsafe migration of '{type_id}': schema of '{changed_type}' changed while a decode is in progress (depth {depth})"
    )]
    UnsafeMigration {
        type_id: String,
        changed_type: String,
        depth: usize,
    },

    /// Type not known to the metadata service
    #[error("Type '{type_id}' not registered")]
    TypeNotRegistered { type_id: String },

    /// Type registered twice
    #[error("Type '{type_id}' already registered")]
    AlreadyRegistered { type_id: String },

    /// No formatter for a member's declared type
    #[error("No formatter for type '{field_type}' (member '{member}' of '{type_id}')")]
    FormatterNotFound {
        type_id: String,
        member: String,
        field_type: String,
    },

    /// No accessor for a live member
    #[error("No accessor for member '{member}' of '{type_id}'")]
    AccessorNotFound { type_id: String, member: String },

    /// A formatter was handed a field of the wrong Rust type
    #[error("Field type mismatch: formatter for '{expected}' received another type")]
    FieldTypeMismatch { expected: String },

    /// Read past the end of the buffer or the current frame
    #[error("Unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Caller-supplied cursor outside the buffer
    #[error("Cursor {cursor} out of bounds for buffer of {len} bytes")]
    CursorOutOfBounds { cursor: usize, len: usize },

    /// Frame length does not fit the prefix or exceeds the configured limit
    #[error("Frame of {len} bytes exceeds limit {limit}")]
    FrameTooLarge { len: usize, limit: usize },

    /// Payload content is not valid for its type
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;
